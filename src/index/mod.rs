//! 进程内向量索引，持久化为JSON

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::embedding::{Embedder, Embedding, EmbeddingProfile, cosine_similarity};
use crate::types::{DocumentChunk, RetrievedChunk};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: DocumentChunk,
    vector: Embedding,
}

/// 已向量化、等待写入索引的块
#[derive(Debug, Clone)]
pub struct EmbeddedChunks {
    profile: EmbeddingProfile,
    entries: Vec<IndexEntry>,
}

impl EmbeddedChunks {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 索引统计
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    pub collection: String,
    pub chunks: usize,
    pub sources: Vec<String>,
    pub profile: EmbeddingProfile,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 余弦相似度向量索引
///
/// 请求路径只读，写入只发生在导入阶段。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    collection: String,
    profile: EmbeddingProfile,
    entries: Vec<IndexEntry>,
    #[serde(skip)]
    known_ids: HashSet<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl VectorIndex {
    pub fn new(collection: impl Into<String>, profile: EmbeddingProfile) -> Self {
        Self {
            collection: collection.into(),
            profile,
            entries: Vec::new(),
            known_ids: HashSet::new(),
            updated_at: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn profile(&self) -> &EmbeddingProfile {
        &self.profile
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.known_ids.contains(chunk_id)
    }

    /// 向量化并写入新块，已存在的块ID跳过，返回新写入的数量
    pub async fn add_chunks(
        &mut self,
        chunks: Vec<DocumentChunk>,
        embedder: &dyn Embedder,
    ) -> Result<usize> {
        self.ensure_compatible(&embedder.profile())?;
        let pending = self.pending_chunks(chunks);
        let embedded = Self::embed_chunks(pending, embedder).await?;
        self.insert_embedded(embedded)
    }

    /// 去掉索引中已有的块和批内重复的块
    pub fn pending_chunks(&self, chunks: Vec<DocumentChunk>) -> Vec<DocumentChunk> {
        Self::unique_chunks(chunks)
            .into_iter()
            .filter(|chunk| !self.known_ids.contains(&chunk.id))
            .collect()
    }

    /// 批内按块ID去重，保持原顺序
    pub fn unique_chunks(chunks: Vec<DocumentChunk>) -> Vec<DocumentChunk> {
        let mut seen = HashSet::new();
        chunks
            .into_iter()
            .filter(|chunk| seen.insert(chunk.id.clone()))
            .collect()
    }

    /// 向量化一批块，不访问索引，调用方无需持有锁
    pub async fn embed_chunks(
        chunks: Vec<DocumentChunk>,
        embedder: &dyn Embedder,
    ) -> Result<EmbeddedChunks> {
        let profile = embedder.profile();
        if chunks.is_empty() {
            return Ok(EmbeddedChunks {
                profile,
                entries: Vec::new(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embedder
            .embed_documents(&texts)
            .await
            .context("向量化文档块失败")?;
        if vectors.len() != chunks.len() {
            return Err(anyhow!(
                "向量数量 {} 与块数量 {} 不一致",
                vectors.len(),
                chunks.len()
            ));
        }

        Ok(EmbeddedChunks {
            profile,
            entries: chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry { chunk, vector })
                .collect(),
        })
    }

    /// 写入已向量化的块，已存在的块ID跳过，返回新写入的数量
    pub fn insert_embedded(&mut self, embedded: EmbeddedChunks) -> Result<usize> {
        self.ensure_compatible(&embedded.profile)?;

        let mut added = 0;
        for entry in embedded.entries {
            if self.known_ids.insert(entry.chunk.id.clone()) {
                self.entries.push(entry);
                added += 1;
            }
        }
        if added == 0 {
            debug!("没有需要写入的新块");
            return Ok(0);
        }
        self.updated_at = Some(Utc::now());
        info!("📥 索引新增 {} 个块，共 {} 个", added, self.entries.len());
        Ok(added)
    }

    /// 向量空间不一致时报错
    pub fn ensure_compatible(&self, profile: &EmbeddingProfile) -> Result<()> {
        if !self.profile.is_compatible(profile) {
            return Err(anyhow!(
                "索引使用 {} 构建，当前向量化后端为 {}",
                self.profile,
                profile
            ));
        }
        Ok(())
    }

    /// 按相似度降序返回前k个结果，分数相同时保持写入顺序
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.vector.len() == query.len())
            .map(|(pos, entry)| (pos, cosine_similarity(query, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(pos, score)| RetrievedChunk {
                chunk: self.entries[pos].chunk.clone(),
                score,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.known_ids.clear();
        self.updated_at = Some(Utc::now());
    }

    pub fn stats(&self) -> IndexStats {
        let sources: BTreeSet<String> = self
            .entries
            .iter()
            .map(|entry| entry.chunk.source.clone())
            .collect();
        IndexStats {
            collection: self.collection.clone(),
            chunks: self.entries.len(),
            sources: sources.into_iter().collect(),
            profile: self.profile.clone(),
            updated_at: self.updated_at,
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create index directory: {:?}", parent))?;
        }
        let content = serde_json::to_string(self).context("Failed to serialize index")?;
        fs::write(path, content)
            .await
            .context(format!("Failed to write index file: {:?}", path))?;
        debug!("索引已保存到 {:?}", path);
        Ok(())
    }

    /// 读取索引；文件不存在时返回 None，向量空间不一致时报错
    pub async fn load(path: &Path, expected: &EmbeddingProfile) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read index file: {:?}", path))?;
        let mut index: VectorIndex =
            serde_json::from_str(&content).context("Failed to parse index file")?;

        if !index.profile.is_compatible(expected) {
            return Err(anyhow!(
                "索引 {:?} 使用 {} 构建，当前向量化后端为 {}，请运行 `echocheck ingest --rebuild` 重新导入",
                path,
                index.profile,
                expected
            ));
        }

        index.known_ids = index
            .entries
            .iter()
            .map(|entry| entry.chunk.id.clone())
            .collect();
        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests;
