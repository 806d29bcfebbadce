use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::Retriever;
use crate::embedding::Embedder;
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::types::RetrievedChunk;

/// 基于向量索引的检索器，只持有读锁
pub struct IndexRetriever {
    index: Arc<RwLock<VectorIndex>>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl IndexRetriever {
    pub fn new(index: Arc<RwLock<VectorIndex>>, embedder: Arc<dyn Embedder>, min_score: f32) -> Self {
        Self {
            index,
            embedder,
            min_score,
        }
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, RagError> {
        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| RagError::Retrieval(format!("查询向量化失败: {:#}", e)))?;

        let index = self.index.read().await;
        let mut results = index.search(&vector, k);
        results.retain(|r| r.score > self.min_score);
        debug!(
            "检索 \"{}\" 命中 {} 个块 (索引共 {} 个)",
            query,
            results.len(),
            index.len()
        );
        Ok(results)
    }
}
