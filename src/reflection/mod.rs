//! 反思回路：检索 → 生成 → 评审，未通过时改写检索语句重试

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::RagError;
use crate::llm::ProviderRoute;
use crate::types::{
    Answer, Confidence, ConfidenceLevel, CritiqueVerdict, ReflectionOutcome, ReflectionStep,
    RetrievedChunk, Termination,
};

mod critic;
mod generator;
pub mod prompts;
mod retriever;
mod timing;

pub use critic::{CritiqueReport, LlmCritic};
pub use generator::{LlmGenerator, cited_chunks};
pub use retriever::IndexRetriever;
pub use timing::{TimingKeys, TimingScope};

#[async_trait]
pub trait Retriever: Send + Sync {
    /// 按相关度降序返回最多k个块
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, RagError>;
}

/// 生成一轮回答所需的输入
pub struct GenerationRequest<'a> {
    /// 用户原始问题，不随迭代改变
    pub question: &'a str,
    /// 本轮检索语句
    pub query: &'a str,
    pub chunks: &'a [RetrievedChunk],
    /// 上一轮的回答及其评审，第一轮为 None
    pub previous: Option<(&'a Answer, &'a CritiqueVerdict)>,
    pub route: ProviderRoute,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Answer, RagError>;
}

/// 评审一轮回答所需的输入
pub struct CritiqueRequest<'a> {
    pub question: &'a str,
    pub query: &'a str,
    pub answer: &'a Answer,
    pub chunks: &'a [RetrievedChunk],
    pub route: ProviderRoute,
}

#[async_trait]
pub trait Critic: Send + Sync {
    async fn critique(&self, request: CritiqueRequest<'_>) -> Result<CritiqueVerdict, RagError>;
}

/// 取消标记，在每次外部调用之前检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 单次请求的上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub route: ProviderRoute,
    pub model: String,
    pub cancel: CancelFlag,
}

impl RequestContext {
    pub fn new(route: ProviderRoute, model: impl Into<String>, cancel: CancelFlag) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            route,
            model: model.into(),
            cancel,
        }
    }

    fn ensure_active(&self) -> Result<(), RagError> {
        if self.cancel.is_cancelled() {
            Err(RagError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// 反思回路控制器
///
/// 每轮依次检索、生成、评审；评审通过或达到轮数上限时返回。
/// 任一步骤失败都直接返回对应的错误，不会在出错后重启回路。
pub struct ReflectionController {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    critic: Arc<dyn Critic>,
    top_k: usize,
}

impl ReflectionController {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        critic: Arc<dyn Critic>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            critic,
            top_k: top_k.max(1),
        }
    }

    pub async fn answer(
        &self,
        question: &str,
        max_iterations: usize,
        ctx: &RequestContext,
    ) -> Result<ReflectionOutcome, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidRequest("question is empty".to_string()));
        }
        if max_iterations == 0 {
            return Err(RagError::InvalidRequest(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        info!(
            "🤔 [{}] 开始回答 (最多 {} 轮, 线路 {})",
            ctx.request_id, max_iterations, ctx.route
        );

        let mut timing = TimingScope::new();
        let mut steps: Vec<ReflectionStep> = Vec::with_capacity(max_iterations);
        let mut query = question.to_string();
        let mut iteration = 0;

        loop {
            ctx.ensure_active()?;
            timing.start_phase(TimingKeys::RETRIEVE);
            let retrieved = self.retriever.retrieve(&query, self.top_k).await?;
            timing.end_phase(TimingKeys::RETRIEVE);
            if retrieved.is_empty() {
                return Err(RagError::Retrieval(format!(
                    "no relevant documents found for \"{}\"",
                    query
                )));
            }

            ctx.ensure_active()?;
            timing.start_phase(TimingKeys::GENERATE);
            let answer = self
                .generator
                .generate(GenerationRequest {
                    question,
                    query: &query,
                    chunks: &retrieved,
                    previous: steps.last().map(|s| (&s.answer, &s.verdict)),
                    route: ctx.route,
                })
                .await?;
            timing.end_phase(TimingKeys::GENERATE);

            ctx.ensure_active()?;
            timing.start_phase(TimingKeys::CRITIQUE);
            let verdict = self
                .critic
                .critique(CritiqueRequest {
                    question,
                    query: &query,
                    answer: &answer,
                    chunks: &retrieved,
                    route: ctx.route,
                })
                .await?;
            timing.end_phase(TimingKeys::CRITIQUE);

            let passed = verdict.is_pass();
            let exhausted = iteration + 1 >= max_iterations;
            info!(
                "🪞 第 {} 轮: {} (置信度 {:.0}%)",
                iteration + 1,
                if passed { "通过" } else { "未通过" },
                verdict.confidence * 100.0
            );

            let next_query = verdict
                .revised_query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string);

            steps.push(ReflectionStep {
                iteration,
                query: query.clone(),
                retrieved,
                answer,
                verdict,
                timings: timing.take_step_timings(),
            });

            if passed || exhausted {
                if !passed {
                    warn!("⚠️ 反思轮数用尽，返回未验证的回答");
                }
                return Ok(Self::finish(question, steps, passed, ctx, &timing));
            }

            if let Some(next) = next_query {
                query = next;
            }
            iteration += 1;
        }
    }

    fn finish(
        question: &str,
        steps: Vec<ReflectionStep>,
        passed: bool,
        ctx: &RequestContext,
        timing: &TimingScope,
    ) -> ReflectionOutcome {
        // steps 至少有一轮
        let last = &steps[steps.len() - 1];
        let confidence = Confidence {
            score: last.verdict.confidence,
            level: if passed {
                ConfidenceLevel::Verified
            } else {
                ConfidenceLevel::Unverified
            },
        };

        ReflectionOutcome {
            request_id: ctx.request_id,
            question: question.to_string(),
            answer: last.answer.clone(),
            confidence,
            iterations_used: steps.len(),
            termination: if passed {
                Termination::Passed
            } else {
                Termination::BudgetExceeded
            },
            route: ctx.route,
            model: ctx.model.clone(),
            elapsed_ms: timing.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
            steps,
        }
    }
}
