#[cfg(test)]
mod tests {
    use crate::config::{CacheConfig, Config, LoadMode};
    use crate::ingest::{
        DocumentCache, DocumentLoader, DocumentOrigin, SourcesUsed, TextSplitter,
        extract_page_text, load_local_documents, sample_documents,
    };
    use crate::types::{DocumentMetadata, SourceDocument};
    use tempfile::TempDir;

    fn offline_config(root: &TempDir) -> Config {
        let mut config = Config::default();
        config.documents.enable_react_docs = false;
        config.documents.enable_nextjs_docs = false;
        config.documents.sources_dir = root.path().join("sources");
        config.cache.cache_dir = root.path().join("cache");
        config
    }

    #[test]
    fn test_splitter_respects_chunk_size() {
        let splitter = TextSplitter::new(100, 20);
        let text = sample_documents()
            .iter()
            .map(|d| d.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");

        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn test_splitter_keeps_short_text_whole() {
        let splitter = TextSplitter::new(1000, 200);
        assert_eq!(splitter.split_text("one paragraph"), vec!["one paragraph"]);
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn test_splitter_overlaps_words() {
        let splitter = TextSplitter::new(10, 4);
        let chunks = splitter.split_text("aaa bbb ccc ddd");

        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd"]);
    }

    #[test]
    fn test_splitter_breaks_long_words() {
        let splitter = TextSplitter::new(4, 0);
        let chunks = splitter.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_sample_documents() {
        let samples = sample_documents();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].metadata.source, "React 18 Official Docs");
        assert_eq!(samples[3].metadata.doc_type, "best_practices");
        assert!(samples[2].content.contains("stream: true"));
    }

    #[test]
    fn test_extract_page_text_thresholds() {
        let short = "<main><p>tiny</p></main>";
        assert!(extract_page_text(short, 100, 10_000).is_none());

        let long = format!("<main><p>{}</p></main>", "word ".repeat(100));
        let text = extract_page_text(&long, 100, 50).unwrap();
        assert_eq!(text.chars().count(), 50);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_load_local_documents() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        std::fs::create_dir_all(dir.join("guides")).unwrap();
        std::fs::write(
            dir.join("guides").join("hooks.md"),
            "# Hooks\n\nUse **useEffect** for side effects.",
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "plain notes").unwrap();
        std::fs::write(
            dir.join("docs.json"),
            r#"[{"content": "json doc", "metadata": {"source": "custom", "type": "documentation"}},
                {"content": "anonymous", "metadata": {"source": ""}}]"#,
        )
        .unwrap();
        std::fs::write(dir.join("ignored.rs"), "fn main() {}").unwrap();

        let patterns = vec!["*.md".to_string(), "*.txt".to_string(), "*.json".to_string()];
        let docs = load_local_documents(dir, &patterns).unwrap();

        assert_eq!(docs.len(), 4);
        let markdown = docs
            .iter()
            .find(|d| d.metadata.source == "guides/hooks.md")
            .unwrap();
        assert_eq!(markdown.metadata.doc_type, "markdown");
        assert!(markdown.content.contains("Use useEffect for side effects."));
        assert!(docs.iter().any(|d| d.metadata.source == "custom"));
        assert!(docs.iter().any(|d| d.metadata.source == "docs.json"));
        assert!(docs.iter().any(|d| d.content == "plain notes"));
    }

    #[test]
    fn test_load_local_documents_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let docs = load_local_documents(&temp_dir.path().join("nope"), &["*.md".to_string()]);
        assert!(docs.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_cache_roundtrip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DocumentCache::new(
            CacheConfig::default(),
            temp_dir.path().join("cached_docs.json"),
        );

        let info = cache.info().await.unwrap();
        assert!(!info.exists);

        let docs = vec![SourceDocument::new(
            "cached body",
            DocumentMetadata::new("react-official", "documentation"),
        )];
        let used = SourcesUsed {
            react: true,
            ..SourcesUsed::default()
        };
        cache.write(&docs, used).await.unwrap();

        let (fresh, age) = cache.read_fresh().await.unwrap().unwrap();
        assert_eq!(fresh, docs);
        assert!(age < 1.0);

        let info = cache.info().await.unwrap();
        assert!(info.exists);
        assert_eq!(info.document_count, 1);
        assert!(!info.is_expired);
        assert!(info.sources_used.react);

        assert!(cache.clear().await.unwrap());
        assert!(!cache.clear().await.unwrap());
    }

    #[test]
    fn test_document_cache_expiry() {
        let cache = DocumentCache::new(
            CacheConfig {
                expire_hours: 24,
                ..CacheConfig::default()
            },
            "unused.json".into(),
        );
        let now = 100 * 3600;
        assert!(!cache.is_expired_at(now - 23 * 3600, now));
        assert!(cache.is_expired_at(now - 24 * 3600, now));
    }

    #[tokio::test]
    async fn test_cache_only_without_cache_uses_samples() {
        let temp_dir = TempDir::new().unwrap();
        let loader = DocumentLoader::new(&offline_config(&temp_dir));

        let loaded = loader.load_all(LoadMode::CacheOnly).await.unwrap();
        assert_eq!(loaded.origin, DocumentOrigin::Samples);
        assert_eq!(loaded.documents.len(), 4);
    }

    #[tokio::test]
    async fn test_hybrid_prefers_fresh_cache() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        let loader = DocumentLoader::new(&config);

        // 第一次：本地目录为空，回退到示例文档且不写缓存
        let first = loader.load_all(LoadMode::Hybrid).await.unwrap();
        assert_eq!(first.origin, DocumentOrigin::Samples);
        assert!(!config.document_cache_file().exists());

        loader
            .save_document("# Local\n\nA local guide about Suspense.", "guide.md")
            .await
            .unwrap();

        let second = loader.load_all(LoadMode::Hybrid).await.unwrap();
        assert_eq!(second.origin, DocumentOrigin::Fresh);
        assert_eq!(second.documents.len(), 1);
        assert!(config.document_cache_file().exists());

        let third = loader.load_all(LoadMode::Hybrid).await.unwrap();
        assert_eq!(third.origin, DocumentOrigin::Cache);
        assert_eq!(third.documents, second.documents);
    }

    #[tokio::test]
    async fn test_save_document_rejects_paths() {
        let temp_dir = TempDir::new().unwrap();
        let loader = DocumentLoader::new(&offline_config(&temp_dir));

        assert!(loader.save_document("x", "../escape.md").await.is_err());
        assert!(loader.save_document("x", "  ").await.is_err());
    }

    #[test]
    fn test_chunk_documents_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = offline_config(&temp_dir);
        config.retrieval.chunk_size = 200;
        config.retrieval.chunk_overlap = 40;
        let loader = DocumentLoader::new(&config);

        let docs = sample_documents();
        let chunks = loader.chunk_documents(&docs);

        assert!(chunks.len() > docs.len());
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 200));
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].source, "React 18 Official Docs");

        let again = loader.chunk_documents(&docs);
        assert_eq!(chunks[0].id, again[0].id);

        let stats = DocumentLoader::stats(&docs);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.sources.len(), 4);
        assert_eq!(stats.average_chars, stats.total_chars / 4);
    }
}
