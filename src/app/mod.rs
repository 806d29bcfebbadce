//! 应用上下文与命令分发

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cli::{Args, CacheAction, Command};
use crate::config::{Config, LoadMode};
use crate::dashboard::{self, render_cache_info, render_index_stats, render_outcome};
use crate::embedding::{Embedder, build_embedder};
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::ingest::{DocumentLoader, DocumentOrigin, DocumentStats};
use crate::llm::{CallParams, LLMClient, LanguageModel, ProviderRoute};
use crate::logging;
use crate::reflection::{
    CancelFlag, IndexRetriever, LlmCritic, LlmGenerator, ReflectionController, RequestContext,
};
use crate::types::ReflectionOutcome;

/// 一次导入的结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestReport {
    pub origin: DocumentOrigin,
    pub documents: DocumentStats,
    pub chunks: usize,
    pub added: usize,
    pub total_chunks: usize,
}

/// 各命令共享的运行时组件
pub struct AppContext {
    pub config: Config,
    pub model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    /// 请求路径只取读锁，导入时取写锁
    pub index: Arc<RwLock<VectorIndex>>,
    pub loader: DocumentLoader,
}

impl AppContext {
    /// 使用配置中的 LLM 线路创建上下文
    pub async fn new(config: Config, fresh_index: bool) -> Result<Self> {
        let llm_client = LLMClient::new(&config.llm)?;
        Self::with_model(config, Arc::new(llm_client), fresh_index).await
    }

    /// fresh_index 为 true 时不读取磁盘上的索引
    pub async fn with_model(
        config: Config,
        model: Arc<dyn LanguageModel>,
        fresh_index: bool,
    ) -> Result<Self> {
        let embedder = build_embedder(&config.embedding, &config.llm)?;
        let profile = embedder.profile();

        let loaded = if fresh_index {
            None
        } else {
            VectorIndex::load(&config.retrieval.index_path, &profile).await?
        };
        let index = loaded.unwrap_or_else(|| {
            VectorIndex::new(config.retrieval.collection_name.clone(), profile)
        });

        let loader = DocumentLoader::new(&config);
        Ok(Self {
            config,
            model,
            embedder,
            index: Arc::new(RwLock::new(index)),
            loader,
        })
    }

    /// 索引为空时按配置的模式导入一次
    pub async fn ensure_index(&self) -> Result<usize> {
        let existing = self.index.read().await.len();
        if existing > 0 {
            return Ok(existing);
        }
        info!("🗂️ 索引为空，开始导入文档");
        let report = self.refresh(self.config.documents.mode, false).await?;
        Ok(report.total_chunks)
    }

    /// 加载文档、切分、写入索引并保存
    pub async fn refresh(&self, mode: LoadMode, rebuild: bool) -> Result<IngestReport> {
        let loaded = self.loader.load_all(mode).await?;
        let documents = DocumentLoader::stats(&loaded.documents);
        let chunks = self.loader.chunk_documents(&loaded.documents);
        let chunk_count = chunks.len();

        // 向量化期间只短暂持有读锁，失败时索引保持原样
        let pending = {
            let index = self.index.read().await;
            index.ensure_compatible(&self.embedder.profile())?;
            if rebuild {
                VectorIndex::unique_chunks(chunks)
            } else {
                index.pending_chunks(chunks)
            }
        };
        let embedded = VectorIndex::embed_chunks(pending, self.embedder.as_ref()).await?;

        let mut index = self.index.write().await;
        if rebuild {
            index.clear();
        }
        let added = index.insert_embedded(embedded)?;
        index.save(&self.config.retrieval.index_path).await?;

        Ok(IngestReport {
            origin: loaded.origin,
            documents,
            chunks: chunk_count,
            added,
            total_chunks: index.len(),
        })
    }

    pub fn controller(&self) -> ReflectionController {
        let llm = &self.config.llm;
        let retriever = IndexRetriever::new(
            self.index.clone(),
            self.embedder.clone(),
            self.config.retrieval.min_score,
        );
        let generator = LlmGenerator::new(
            self.model.clone(),
            CallParams {
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
            },
            self.config.retrieval.max_context_tokens,
        );
        let critic = LlmCritic::new(
            self.model.clone(),
            CallParams {
                temperature: llm.critic_temperature,
                max_tokens: llm.critic_max_tokens,
            },
        );
        ReflectionController::new(
            Arc::new(retriever),
            Arc::new(generator),
            Arc::new(critic),
            self.config.retrieval.top_k,
        )
    }

    /// 回答一个问题，线路在请求开始时选定
    pub async fn ask(
        &self,
        question: &str,
        max_iterations: usize,
        cancel: CancelFlag,
    ) -> Result<ReflectionOutcome, RagError> {
        let route = self.model.select_route();
        let ctx = RequestContext::new(route, self.model.model_label(route), cancel);
        self.controller()
            .answer(question, max_iterations, &ctx)
            .await
    }

    /// 回答一个问题，Ctrl-C 时在下一次调用前取消
    pub async fn ask_interruptible(
        &self,
        question: &str,
        max_iterations: usize,
    ) -> Result<ReflectionOutcome, RagError> {
        let cancel = CancelFlag::new();
        let request = self.ask(question, max_iterations, cancel.clone());
        tokio::pin!(request);

        tokio::select! {
            result = &mut request => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n⏹️ 正在取消，等待当前调用结束...");
                cancel.cancel();
                request.await
            }
        }
    }
}

/// 解析配置、初始化日志并执行命令
pub async fn launch(args: Args) -> Result<()> {
    let command = args.command.clone();
    let config = args.into_config()?;
    logging::init(config.verbose);

    match command {
        Command::Config => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        Command::Cache { action } => {
            let loader = DocumentLoader::new(&config);
            match action {
                CacheAction::Info => {
                    let info = loader.cache().info().await?;
                    print!("{}", render_cache_info(&info));
                }
                CacheAction::Clear => {
                    if loader.cache().clear().await? {
                        println!("🗑️ 文档缓存已清除");
                    } else {
                        println!("ℹ️ 没有需要清除的文档缓存");
                    }
                }
            }
        }
        Command::Stats => {
            let app = AppContext::new(config, false).await?;
            let stats = app.index.read().await.stats();
            print!("{}", render_index_stats(&stats));
        }
        Command::Ingest { mode, rebuild } => {
            let mode = Command::parse_mode(mode.as_deref())?.unwrap_or(config.documents.mode);
            let app = AppContext::new(config, rebuild).await?;
            println!("📥 开始导入文档 (模式 {})", mode);
            let report = app.refresh(mode, rebuild).await?;
            println!(
                "✅ 导入完成: 来源 {}，{} 篇文档 (平均 {} 字符)，新增 {} 个块，索引共 {} 个块",
                report.origin,
                report.documents.count,
                report.documents.average_chars,
                report.added,
                report.total_chunks
            );
        }
        Command::Check => {
            config.validate()?;
            let client = LLMClient::new(&config.llm)?;
            client.check_connection(ProviderRoute::Primary).await?;
            if client.has_fallback()
                && let Err(e) = client.check_connection(ProviderRoute::Fallback).await
            {
                warn!("备线路不可用: {}", e);
            }
        }
        Command::Ask { question, json } => {
            config.validate()?;
            let max_iterations = config.reflection.max_iterations;
            let app = AppContext::new(config, false).await?;
            app.ensure_index().await?;

            let question = Command::question_text(&question);
            let outcome = app.ask_interruptible(&question, max_iterations).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", render_outcome(&outcome));
            }
        }
        Command::Chat => {
            config.validate()?;
            let max_iterations = config.reflection.max_iterations;
            let app = AppContext::new(config, false).await?;
            app.ensure_index().await?;
            dashboard::chat::run(&app, max_iterations).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
