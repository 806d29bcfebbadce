use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use super::prompts;
use super::{GenerationRequest, Generator};
use crate::error::RagError;
use crate::llm::{CallParams, LanguageModel};
use crate::types::{Answer, CritiqueVerdict, RetrievedChunk};
use crate::utils::{TokenEstimator, clean_code_snippet};

static SOURCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[Source\s+(\d+)").expect("valid regex"));

/// 调用模型生成回答
pub struct LlmGenerator {
    model: Arc<dyn LanguageModel>,
    params: CallParams,
    max_context_tokens: usize,
    estimator: TokenEstimator,
}

impl LlmGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, params: CallParams, max_context_tokens: usize) -> Self {
        Self {
            model,
            params,
            max_context_tokens,
            estimator: TokenEstimator::new(),
        }
    }

    /// 按token预算挑选块，至少保留一个
    pub fn pack_context<'a>(&self, chunks: &'a [RetrievedChunk]) -> Vec<&'a RetrievedChunk> {
        let mut used = 0usize;
        let mut packed = Vec::new();
        for retrieved in chunks {
            let cost = self.estimator.estimate(&retrieved.chunk.text)
                + self.estimator.estimate(&retrieved.chunk.source)
                + 8;
            if !packed.is_empty() && used + cost > self.max_context_tokens {
                break;
            }
            used += cost;
            packed.push(retrieved);
        }
        packed
    }

    fn format_context(packed: &[&RetrievedChunk]) -> String {
        packed
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[Source {}: {}]\n{}", i + 1, r.chunk.source, r.chunk.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_critique(verdict: &CritiqueVerdict) -> String {
        let mut feedback = verdict.rationale.trim().to_string();
        for flaw in &verdict.flaws {
            feedback.push_str(&format!("\nFLAW: {}", flaw));
        }
        for suggestion in &verdict.suggestions {
            feedback.push_str(&format!("\nSUGGESTION: {}", suggestion));
        }
        feedback.trim().to_string()
    }
}

/// 按 [Source N] 标记找出被引用的块；没有任何标记时视为全部引用
pub fn cited_chunks(text: &str, packed: &[&RetrievedChunk]) -> Vec<String> {
    let mut positions = BTreeSet::new();
    for caps in SOURCE_MARKER.captures_iter(text) {
        if let Ok(n) = caps[1].parse::<usize>()
            && n >= 1
            && n <= packed.len()
        {
            positions.insert(n - 1);
        }
    }

    if positions.is_empty() {
        packed.iter().map(|r| r.chunk.id.clone()).collect()
    } else {
        positions
            .into_iter()
            .map(|pos| packed[pos].chunk.id.clone())
            .collect()
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Answer, RagError> {
        let packed = self.pack_context(request.chunks);
        let context = Self::format_context(&packed);

        let (system_prompt, user_prompt) = match request.previous {
            Some((previous, verdict)) => (
                prompts::REPAIR_SYSTEM,
                prompts::repair_user(
                    request.question,
                    &previous.text,
                    &Self::format_critique(verdict),
                    &context,
                ),
            ),
            None => (
                prompts::GENERATOR_SYSTEM,
                prompts::generator_user(request.question, request.query, &context),
            ),
        };
        debug!(
            "生成回答：{} 个块入选，上下文约 {} tokens",
            packed.len(),
            self.estimator.estimate(&context)
        );

        let raw = self
            .model
            .complete(request.route, system_prompt, &user_prompt, &self.params)
            .await
            .map_err(|e| RagError::Generation(format!("{:#}", e)))?;

        let text = clean_code_snippet(&raw);
        if text.is_empty() {
            return Err(RagError::Generation("模型返回了空内容".to_string()));
        }

        let cited = cited_chunks(&text, &packed);
        let mut sources: Vec<String> = Vec::new();
        for id in &cited {
            if let Some(r) = packed.iter().find(|r| &r.chunk.id == id)
                && !sources.contains(&r.chunk.source)
            {
                sources.push(r.chunk.source.clone());
            }
        }

        Ok(Answer {
            text,
            cited_chunks: cited,
            sources,
        })
    }
}
