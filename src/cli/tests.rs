#[cfg(test)]
mod tests {
    use crate::cli::{Args, CacheAction, Command};
    use crate::config::{EmbeddingBackend, LLMProvider, LoadMode};
    use clap::Parser;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    /// 写一个空配置文件，避免读到工作目录下的 echocheck.toml
    fn empty_config(dir: &TempDir) -> String {
        let path = dir.path().join("echocheck.toml");
        std::fs::write(&path, "").unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_ask_collects_question_words() {
        let args = Args::try_parse_from([
            "echocheck",
            "ask",
            "How",
            "do",
            "I",
            "use",
            "React's",
            "use",
            "hook?",
            "--json",
        ])
        .unwrap();

        match args.command {
            Command::Ask { question, json } => {
                assert!(json);
                assert_eq!(
                    Command::question_text(&question),
                    "How do I use React's use hook?"
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(!args.verbose);
        assert!(!args.no_cache);
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Args::try_parse_from(["echocheck", "ask"]).is_err());
        assert!(Args::try_parse_from(["echocheck"]).is_err());
    }

    #[test]
    fn test_subcommands() {
        let args = Args::try_parse_from(["echocheck", "ingest", "--mode", "live_only", "--rebuild"])
            .unwrap();
        assert_eq!(
            args.command,
            Command::Ingest {
                mode: Some("live_only".to_string()),
                rebuild: true
            }
        );

        let args = Args::try_parse_from(["echocheck", "cache", "clear"]).unwrap();
        assert_eq!(
            args.command,
            Command::Cache {
                action: CacheAction::Clear
            }
        );

        for (name, expected) in [
            ("chat", Command::Chat),
            ("stats", Command::Stats),
            ("check", Command::Check),
            ("config", Command::Config),
        ] {
            let args = Args::try_parse_from(["echocheck", name]).unwrap();
            assert_eq!(args.command, expected);
        }
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(Command::parse_mode(None).unwrap(), None);
        assert_eq!(
            Command::parse_mode(Some("cache")).unwrap(),
            Some(LoadMode::CacheOnly)
        );
        assert!(Command::parse_mode(Some("sometimes")).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "echocheck",
            "stats",
            "-v",
            "--top-k",
            "3",
            "--index-path",
            "/tmp/index.json",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.top_k, Some(3));
        assert_eq!(args.index_path, Some(PathBuf::from("/tmp/index.json")));
    }

    #[test]
    fn test_into_config_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = empty_config(&temp_dir);
        let args = Args::try_parse_from([
            "echocheck",
            "ask",
            "question",
            "--config",
            config_path.as_str(),
            "--llm-provider",
            "anthropic",
            "--model",
            "claude-test",
            "--max-iterations",
            "4",
            "--top-k",
            "7",
            "--temperature",
            "0.4",
            "--embedding-backend",
            "hashing",
            "--no-cache",
            "--verbose",
        ])
        .unwrap();

        let config = args
            .into_config_with_env(env_of(&[("ANTHROPIC_API_KEY", "ak-env")]))
            .unwrap();

        assert_eq!(config.llm.primary.provider, LLMProvider::Anthropic);
        assert_eq!(config.llm.primary.model, "claude-test");
        assert_eq!(config.llm.primary.api_key, "ak-env");
        assert_eq!(config.reflection.max_iterations, 4);
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.llm.temperature, 0.4);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Hashing);
        assert!(!config.cache.enabled);
        assert!(config.verbose);
    }

    #[test]
    fn test_cli_key_beats_env() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = empty_config(&temp_dir);
        let args = Args::try_parse_from([
            "echocheck",
            "check",
            "-c",
            config_path.as_str(),
            "--llm-api-key",
            "gsk-cli",
        ])
        .unwrap();

        let config = args
            .into_config_with_env(env_of(&[("GROQ_API_KEY", "gsk-env")]))
            .unwrap();
        assert_eq!(config.llm.primary.api_key, "gsk-cli");
    }

    #[test]
    fn test_fallback_flags() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = empty_config(&temp_dir);
        let args = Args::try_parse_from([
            "echocheck",
            "check",
            "-c",
            config_path.as_str(),
            "--fallback-provider",
            "ollama",
            "--fallback-model",
            "qwen2.5",
        ])
        .unwrap();
        let config = args.into_config_with_env(no_env).unwrap();
        let fallback = config.llm.fallback.unwrap();
        assert_eq!(fallback.provider, LLMProvider::Ollama);
        assert_eq!(fallback.model, "qwen2.5");

        let args = Args::try_parse_from([
            "echocheck",
            "check",
            "-c",
            config_path.as_str(),
            "--fallback-provider",
            "none",
        ])
        .unwrap();
        let config = args.into_config_with_env(no_env).unwrap();
        assert!(config.llm.fallback.is_none());
    }

    #[test]
    fn test_into_config_rejects_unknown_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = empty_config(&temp_dir);
        let args = Args::try_parse_from([
            "echocheck",
            "check",
            "-c",
            config_path.as_str(),
            "--llm-provider",
            "mystery",
        ])
        .unwrap();
        assert!(args.into_config_with_env(no_env).is_err());
    }

    #[test]
    fn test_into_config_missing_file() {
        let args = Args::try_parse_from([
            "echocheck",
            "config",
            "--config",
            "/definitely/not/here.toml",
        ])
        .unwrap();
        assert!(args.into_config_with_env(no_env).is_err());
    }

    #[test]
    fn test_file_values_survive_without_flags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[reflection]\nmax_iterations = 5\n").unwrap();
        let args = Args::try_parse_from([
            "echocheck",
            "config",
            "-c",
            path.to_str().unwrap(),
        ])
        .unwrap();

        let config = args.into_config_with_env(no_env).unwrap();
        assert_eq!(config.reflection.max_iterations, 5);
        assert_eq!(config.llm.primary.provider, LLMProvider::Groq);
    }
}
