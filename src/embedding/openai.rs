use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Embedder, Embedding, EmbeddingProfile};
use crate::config::{EmbeddingConfig, LLMConfig};
use crate::llm::client::RetryPolicy;

/// OpenAI兼容的 /embeddings 接口
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, llm: &LLMConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is required for the openai embedding backend"));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_seconds.max(1)))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            retry: RetryPolicy::from_config(llm),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "input": texts,
            "model": self.model,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Embedding API 请求失败")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Embedding API 错误 {}: {}", status, error_text));
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.context("解析Embedding响应失败")?;
        if parsed.data.len() != texts.len() {
            return Err(anyhow!(
                "Embedding API 返回 {} 条向量，期望 {} 条",
                parsed.data.len(),
                texts.len()
            ));
        }
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn profile(&self) -> EmbeddingProfile {
        EmbeddingProfile {
            backend: "openai".to_string(),
            model: self.model.clone(),
            dimensions: 0,
        }
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("向量化 {} 条文本", batch.len());
            let embedded = self
                .retry
                .run("embeddings", || self.embed_batch(batch))
                .await?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
