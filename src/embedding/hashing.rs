use anyhow::Result;
use async_trait::async_trait;
use md5::{Digest, Md5};
use regex::Regex;
use std::sync::LazyLock;

use super::{Embedder, Embedding, EmbeddingProfile, magnitude};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}_]+").expect("valid token pattern"));

/// 本地特征哈希向量，不需要网络和API KEY
///
/// 每个小写词元经MD5映射到一个桶和一个符号，结果做L2归一化。
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for token in TOKEN_PATTERN.find_iter(&lowered) {
            let digest = Md5::digest(token.as_str().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = magnitude(&vector);
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn profile(&self) -> EmbeddingProfile {
        EmbeddingProfile {
            backend: "hashing".to_string(),
            model: "md5-feature-hashing".to_string(),
            dimensions: self.dimensions,
        }
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
