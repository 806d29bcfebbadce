use crate::config::{Config, EmbeddingBackend, LLMProvider, LoadMode, ProviderProfile};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 默认配置文件名，位于当前目录
pub const DEFAULT_CONFIG_FILE: &str = "echocheck.toml";

/// EchoCheck - 会自我审查的文档问答助手
#[derive(Parser, Debug)]
#[command(name = "echocheck")]
#[command(
    about = "Reflective RAG coding assistant. Retrieves documentation, drafts an answer, critiques it against the sources and retries with a refined query when the critique fails."
)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 主线路 LLM Provider (groq, openai, anthropic, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// 主线路 API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// 主线路 API 基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// 主线路模型
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// 备用线路 Provider，填 none 表示不使用备用线路
    #[arg(long, global = true)]
    pub fallback_provider: Option<String>,

    /// 备用线路模型
    #[arg(long, global = true)]
    pub fallback_model: Option<String>,

    /// 备用线路 API KEY
    #[arg(long, global = true)]
    pub fallback_api_key: Option<String>,

    /// 反思轮数上限
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// 每轮检索的块数
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// 生成温度
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// 向量索引文件路径
    #[arg(long, global = true)]
    pub index_path: Option<PathBuf>,

    /// 向量化后端 (auto, openai, hashing)
    #[arg(long, global = true)]
    pub embedding_backend: Option<String>,

    /// 是否禁用文档缓存
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 提问一次并输出经过审查的回答
    Ask {
        /// 问题内容
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// 以 JSON 输出完整结果
        #[arg(long)]
        json: bool,
    },

    /// 交互式问答
    Chat,

    /// 加载文档并重建索引
    Ingest {
        /// 文档加载模式 (hybrid, cache_only, live_only)
        #[arg(long)]
        mode: Option<String>,

        /// 清空已有索引后重建
        #[arg(long)]
        rebuild: bool,
    },

    /// 文档缓存管理
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// 查看索引统计
    Stats,

    /// 检查 LLM 连接
    Check,

    /// 输出生效的配置（隐藏 API KEY）
    Config,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum CacheAction {
    /// 查看缓存状态
    Info,
    /// 删除缓存文件
    Clear,
}

impl Command {
    /// ask 的问题文本
    pub fn question_text(question: &[String]) -> String {
        question.join(" ").trim().to_string()
    }

    /// ingest 的加载模式，未指定时为 None
    pub fn parse_mode(mode: Option<&str>) -> Result<Option<LoadMode>> {
        mode.map(|m| m.parse::<LoadMode>().map_err(|e| anyhow!(e)))
            .transpose()
    }
}

impl Args {
    /// 将CLI参数转换为配置，环境变量取自当前进程
    pub fn into_config(self) -> Result<Config> {
        self.into_config_with_env(|key| std::env::var(key).ok())
    }

    /// 配置优先级：默认值 < 配置文件 < 环境变量 < 命令行参数
    pub fn into_config_with_env<F>(self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)
                .with_context(|| format!("无法读取配置文件 {:?}", config_path))?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_CONFIG_FILE);

            if default_config_path.exists() {
                Config::from_file(&default_config_path).with_context(|| {
                    format!("无法读取默认配置文件 {:?}", default_config_path)
                })?
            } else {
                Config::default()
            }
        };

        config.apply_env(&lookup);

        // 主线路
        if let Some(provider_str) = &self.llm_provider {
            let provider = provider_str
                .parse::<LLMProvider>()
                .map_err(|e| anyhow!(e))?;
            if provider != config.llm.primary.provider {
                config.llm.primary = ProviderProfile::new(provider);
            }
        }
        if let Some(key) = self.llm_api_key {
            config.llm.primary.api_key = key;
        }
        if let Some(base_url) = self.llm_api_base_url {
            config.llm.primary.api_base_url = base_url;
        }
        if let Some(model) = self.model {
            config.llm.primary.model = model;
        }

        // 备用线路
        if let Some(provider_str) = &self.fallback_provider {
            if provider_str.eq_ignore_ascii_case("none") {
                config.llm.fallback = None;
            } else {
                let provider = provider_str
                    .parse::<LLMProvider>()
                    .map_err(|e| anyhow!(e))?;
                if config.llm.fallback.as_ref().map(|f| f.provider) != Some(provider) {
                    config.llm.fallback = Some(ProviderProfile::new(provider));
                }
            }
        }
        if let Some(fallback) = config.llm.fallback.as_mut() {
            if let Some(model) = self.fallback_model {
                fallback.model = model;
            }
            if let Some(key) = self.fallback_api_key {
                fallback.api_key = key;
            }
        }
        config.fill_api_keys(&lookup);

        if let Some(max_iterations) = self.max_iterations {
            config.reflection.max_iterations = max_iterations;
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(index_path) = self.index_path {
            config.retrieval.index_path = index_path;
        }
        if let Some(backend) = &self.embedding_backend {
            config.embedding.backend = backend
                .parse::<EmbeddingBackend>()
                .map_err(|e| anyhow!(e))?;
        }

        if self.no_cache {
            config.cache.enabled = false;
        }
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}

#[cfg(test)]
mod tests;
