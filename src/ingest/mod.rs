//! 文档导入：加载、缓存、切分

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, DocumentConfig, LoadMode};
use crate::types::{DocumentChunk, SourceDocument};

mod cache;
mod samples;
mod sources;
mod splitter;

pub use cache::{CacheInfo, CachedDocuments, DocumentCache, SourcesUsed};
pub use samples::sample_documents;
pub use sources::{DocSite, WebFetcher, extract_page_text, load_local_documents};
pub use splitter::TextSplitter;

/// 文档从哪里来
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOrigin {
    Cache,
    Fresh,
    Samples,
}

impl std::fmt::Display for DocumentOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentOrigin::Cache => write!(f, "cache"),
            DocumentOrigin::Fresh => write!(f, "fresh"),
            DocumentOrigin::Samples => write!(f, "samples"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDocuments {
    pub documents: Vec<SourceDocument>,
    pub origin: DocumentOrigin,
}

/// 文档统计
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentStats {
    pub count: usize,
    pub total_chars: usize,
    pub average_chars: usize,
    pub sources: Vec<String>,
}

/// 文档加载器
pub struct DocumentLoader {
    config: DocumentConfig,
    cache: DocumentCache,
    splitter: TextSplitter,
}

impl DocumentLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.documents.clone(),
            cache: DocumentCache::new(config.cache.clone(), config.document_cache_file()),
            splitter: TextSplitter::new(
                config.retrieval.chunk_size,
                config.retrieval.chunk_overlap,
            ),
        }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// 按加载模式读取文档
    pub async fn load_all(&self, mode: LoadMode) -> Result<LoadedDocuments> {
        match mode {
            LoadMode::CacheOnly => match self.cache.read().await? {
                Some(cached) => {
                    info!("📁 仅从缓存加载 {} 篇文档", cached.documents.len());
                    Ok(LoadedDocuments {
                        documents: cached.documents,
                        origin: DocumentOrigin::Cache,
                    })
                }
                None => {
                    info!("❌ 没有找到文档缓存，使用示例文档");
                    Ok(self.samples())
                }
            },
            LoadMode::LiveOnly => {
                info!("🌐 忽略缓存，抓取最新文档...");
                self.fetch_fresh().await
            }
            LoadMode::Hybrid => {
                if let Some((documents, age)) = self.cache.read_fresh().await? {
                    info!("📁 使用缓存文档 ({:.1}h)", age);
                    return Ok(LoadedDocuments {
                        documents,
                        origin: DocumentOrigin::Cache,
                    });
                }
                self.fetch_fresh().await
            }
        }
    }

    fn samples(&self) -> LoadedDocuments {
        let documents = sample_documents();
        info!("📝 加载 {} 篇示例文档", documents.len());
        LoadedDocuments {
            documents,
            origin: DocumentOrigin::Samples,
        }
    }

    async fn fetch_fresh(&self) -> Result<LoadedDocuments> {
        let mut documents = Vec::new();

        let mut sites = Vec::new();
        if self.config.enable_react_docs {
            sites.push(DocSite::react(self.config.react_urls.clone()));
        }
        if self.config.enable_nextjs_docs {
            sites.push(DocSite::nextjs(self.config.nextjs_urls.clone()));
        }
        if !sites.is_empty() {
            let fetcher = WebFetcher::new(&self.config)?;
            // 站点之间并发，站内按间隔顺序抓取
            let fetched =
                futures::future::join_all(sites.iter().map(|site| fetcher.fetch_site(site))).await;
            for (site, docs) in sites.iter().zip(fetched) {
                info!("✅ {} 加载 {} 篇文档", site.framework, docs.len());
                documents.extend(docs);
            }
        }

        if self.config.enable_local_docs {
            let local =
                load_local_documents(&self.config.sources_dir, &self.config.local_patterns)?;
            info!("✅ 本地目录加载 {} 篇文档", local.len());
            documents.extend(local);
        }

        if documents.is_empty() {
            if self.config.enable_sample_docs {
                return Ok(self.samples());
            }
            return Ok(LoadedDocuments {
                documents,
                origin: DocumentOrigin::Fresh,
            });
        }

        if self.cache.is_enabled() {
            let used = SourcesUsed {
                react: self.config.enable_react_docs,
                nextjs: self.config.enable_nextjs_docs,
                local: self.config.enable_local_docs,
                sample: self.config.enable_sample_docs,
            };
            self.cache.write(&documents, used).await?;
        }

        Ok(LoadedDocuments {
            documents,
            origin: DocumentOrigin::Fresh,
        })
    }

    /// 切分为索引块，ordinal 在每篇文档内从0开始
    pub fn chunk_documents(&self, documents: &[SourceDocument]) -> Vec<DocumentChunk> {
        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| {
                self.splitter
                    .split_text(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(|(ordinal, text)| DocumentChunk::new(text, ordinal, doc.metadata.clone()))
            })
            .collect();
        info!("✂️ {} 篇文档切分为 {} 个块", documents.len(), chunks.len());
        chunks
    }

    /// 保存一篇文档到本地来源目录
    pub async fn save_document(&self, content: &str, filename: &str) -> Result<PathBuf> {
        let name = filename.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(anyhow!("Invalid document file name: {:?}", filename));
        }
        tokio::fs::create_dir_all(&self.config.sources_dir)
            .await
            .context(format!(
                "Failed to create sources directory: {:?}",
                self.config.sources_dir
            ))?;
        let path = self.config.sources_dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .context(format!("Failed to write document: {:?}", path))?;
        info!("💾 文档已保存 {:?}", path);
        Ok(path)
    }

    pub fn stats(documents: &[SourceDocument]) -> DocumentStats {
        let total_chars: usize = documents.iter().map(|d| d.content.chars().count()).sum();
        let sources: BTreeSet<String> = documents
            .iter()
            .map(|d| d.metadata.source.clone())
            .collect();
        DocumentStats {
            count: documents.len(),
            total_chars,
            average_chars: if documents.is_empty() {
                0
            } else {
                total_chars / documents.len()
            },
            sources: sources.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests;
