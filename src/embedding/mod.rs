//! 文本向量化

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::{EmbeddingBackend, EmbeddingConfig, LLMConfig};

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

pub type Embedding = Vec<f32>;

/// 向量空间的标识，索引只能用同一空间的查询向量检索
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingProfile {
    pub backend: String,
    pub model: String,
    /// 0 表示由远端模型决定
    pub dimensions: usize,
}

impl std::fmt::Display for EmbeddingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dimensions > 0 {
            write!(f, "{}:{} ({}d)", self.backend, self.model, self.dimensions)
        } else {
            write!(f, "{}:{}", self.backend, self.model)
        }
    }
}

impl EmbeddingProfile {
    /// 是否与另一份profile处在同一向量空间
    pub fn is_compatible(&self, other: &EmbeddingProfile) -> bool {
        self.backend == other.backend
            && self.model == other.model
            && (self.dimensions == 0 || other.dimensions == 0 || self.dimensions == other.dimensions)
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn profile(&self) -> EmbeddingProfile;

    /// 返回的向量与输入一一对应
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("向量化服务没有返回结果"))
    }
}

/// 根据配置选择向量化后端
pub fn build_embedder(config: &EmbeddingConfig, llm: &LLMConfig) -> Result<Arc<dyn Embedder>> {
    let has_key = !config.api_key.trim().is_empty();
    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::OpenAI => Arc::new(OpenAiEmbedder::new(config, llm)?),
        EmbeddingBackend::Auto if has_key => Arc::new(OpenAiEmbedder::new(config, llm)?),
        EmbeddingBackend::Auto | EmbeddingBackend::Hashing => {
            Arc::new(HashingEmbedder::new(config.dimensions))
        }
    };
    info!("🧮 向量化后端: {}", embedder.profile());
    Ok(embedder)
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// 余弦相似度，任一向量为零时返回0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product(a, b) / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests;
