use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::client::ProviderRoute;
use crate::types::chunk::RetrievedChunk;

/// 单轮生成的回答
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// 回答中引用到的块ID
    pub cited_chunks: Vec<String>,
    /// 去重后的来源名称，按首次出现排序
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// 评审结论，只在当前轮内使用
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CritiqueVerdict {
    pub verdict: Verdict,
    pub rationale: String,
    #[serde(default)]
    pub flaws: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// 0..=1
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_query: Option<String>,
}

impl CritiqueVerdict {
    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// 评审通过
    Verified,
    /// 反思轮数用尽仍未通过
    Unverified,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Confidence {
    pub score: f32,
    pub level: ConfidenceLevel,
}

/// 回路结束的原因
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Passed,
    BudgetExceeded,
}

/// 各阶段耗时（毫秒）
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepTimings {
    pub retrieve_ms: u64,
    pub generate_ms: u64,
    pub critique_ms: u64,
}

impl StepTimings {
    pub fn total_ms(&self) -> u64 {
        self.retrieve_ms + self.generate_ms + self.critique_ms
    }
}

/// 一轮 检索 → 生成 → 评审 的完整记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReflectionStep {
    /// 从0开始
    pub iteration: usize,
    pub query: String,
    pub retrieved: Vec<RetrievedChunk>,
    pub answer: Answer,
    pub verdict: CritiqueVerdict,
    pub timings: StepTimings,
}

/// 一次请求的最终结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReflectionOutcome {
    pub request_id: Uuid,
    pub question: String,
    pub answer: Answer,
    pub confidence: Confidence,
    pub iterations_used: usize,
    pub termination: Termination,
    pub steps: Vec<ReflectionStep>,
    pub route: ProviderRoute,
    pub model: String,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl ReflectionOutcome {
    pub fn is_verified(&self) -> bool {
        self.confidence.level == ConfidenceLevel::Verified
    }

    /// 最后一轮的评审结论
    pub fn final_verdict(&self) -> Option<&CritiqueVerdict> {
        self.steps.last().map(|step| &step.verdict)
    }
}
