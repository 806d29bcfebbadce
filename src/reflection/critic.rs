use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use super::prompts;
use super::{Critic, CritiqueRequest};
use crate::error::RagError;
use crate::llm::{CallParams, LanguageModel};
use crate::types::{CritiqueVerdict, Verdict};
use crate::utils::truncate_chars;

static FLAW_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)flaw:\s*([^\n]+)").expect("valid regex"));
static SUGGESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)suggest[^:\n]*:\s*([^\n]+)").expect("valid regex"));
static APPROVED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)["']approved["']\s*:"#).expect("valid regex"));
static APPROVED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bapproved\b").expect("valid regex"));
static NEGATED_APPROVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:disapproved|unapproved|(?:not|isn't|wasn't|never)\s+(?:been\s+|yet\s+)?approved|approved\s*[?:]\s*(?:no|false)\b)",
    )
    .expect("valid regex")
});

/// 评审模型需要返回的结构
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CritiqueReport {
    /// 回答是否可以直接交给用户
    pub approved: bool,
    /// 具体问题，每条一个
    #[serde(default)]
    pub flaws: Vec<String>,
    /// 改进建议
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// 总体评价
    #[serde(default)]
    pub rationale: String,
    /// 0到1之间的置信度
    #[serde(default)]
    pub confidence: Option<f32>,
    /// 未通过时更好的文档检索语句
    #[serde(default)]
    pub revised_query: Option<String>,
}

impl CritiqueReport {
    /// 从模型回复中解析评审结果
    ///
    /// 回复里带有 "approved" 键却无法读取时按未通过处理，不再走纯文本解析。
    pub fn parse(raw: &str) -> Self {
        if let Some(report) = Self::parse_json(raw) {
            return report;
        }
        if APPROVED_KEY.is_match(raw) {
            return Self::unreadable(raw);
        }
        Self::parse_text(raw)
    }

    /// 宽松读取第一个JSON对象，approved 必须能读成布尔值
    fn parse_json(raw: &str) -> Option<Self> {
        let start = raw.find('{')?;
        let value = serde_json::Deserializer::from_str(&raw[start..])
            .into_iter::<Value>()
            .next()?
            .ok()?;
        let object = value.as_object()?;
        let approved = read_bool(object.get("approved")?)?;

        Some(Self {
            approved,
            flaws: read_list(object.get("flaws")),
            suggestions: read_list(object.get("suggestions")),
            rationale: object
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            confidence: object.get("confidence").and_then(read_confidence),
            revised_query: object
                .get("revised_query")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        })
    }

    fn unreadable(raw: &str) -> Self {
        Self {
            approved: false,
            flaws: vec!["critique reply could not be parsed".to_string()],
            suggestions: vec![],
            rationale: truncate_chars(raw.trim(), 1000),
            confidence: None,
            revised_query: None,
        }
    }

    fn parse_text(raw: &str) -> Self {
        let flaws: Vec<String> = FLAW_LINE
            .captures_iter(raw)
            .map(|c| c[1].trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        let suggestions: Vec<String> = SUGGESTION_LINE
            .captures_iter(raw)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let approved =
            APPROVED_WORD.is_match(raw) && !NEGATED_APPROVAL.is_match(raw) && flaws.is_empty();

        Self {
            approved,
            flaws,
            suggestions,
            rationale: truncate_chars(raw.trim(), 1000),
            confidence: None,
            revised_query: None,
        }
    }

    /// 模型没有给出置信度时按缺陷数量估算
    pub fn confidence_score(&self) -> f32 {
        let score = match self.confidence {
            Some(c) if c.is_finite() => c,
            _ if self.approved => 0.9,
            _ if self.flaws.is_empty() => 0.7,
            _ if self.flaws.len() <= 2 => 0.5,
            _ => 0.3,
        };
        score.clamp(0.0, 1.0)
    }
}

fn read_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "pass" | "approved" => Some(true),
            "false" | "no" | "fail" | "rejected" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// 字符串数组或单个字符串
fn read_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.trim().to_string()],
        _ => Vec::new(),
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

/// 数字或数字字符串，其余写法视为未给出
fn read_confidence(value: &Value) -> Option<f32> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    let score = if score > 1.0 && score <= 100.0 {
        score / 100.0
    } else {
        score
    };
    score.is_finite().then_some(score as f32)
}

/// 调用模型评审回答
pub struct LlmCritic {
    model: Arc<dyn LanguageModel>,
    params: CallParams,
    schema: String,
}

impl LlmCritic {
    pub fn new(model: Arc<dyn LanguageModel>, params: CallParams) -> Self {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(CritiqueReport))
            .unwrap_or_else(|_| "{}".to_string());
        Self {
            model,
            params,
            schema,
        }
    }

    fn format_sources(request: &CritiqueRequest<'_>) -> String {
        if request.chunks.is_empty() {
            return "None provided".to_string();
        }
        request
            .chunks
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "[Source {}: {}]\n{}",
                    i + 1,
                    r.chunk.source,
                    truncate_chars(r.chunk.text.trim(), 600)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// 让模型改写检索语句
    async fn refine_query(
        &self,
        request: &CritiqueRequest<'_>,
        report: &CritiqueReport,
    ) -> Result<String, RagError> {
        let user_prompt = prompts::query_refiner_user(
            request.query,
            &report.flaws,
            &report.suggestions,
            &report.rationale,
        );
        let raw = self
            .model
            .complete(
                request.route,
                prompts::QUERY_REFINER_SYSTEM,
                &user_prompt,
                &self.params,
            )
            .await
            .map_err(|e| RagError::Critique(format!("改写检索语句失败: {:#}", e)))?;

        clean_query(&raw)
            .ok_or_else(|| RagError::Critique("改写检索语句时模型返回了空内容".to_string()))
    }
}

/// 取第一行非空内容，去掉引号和前缀
fn clean_query(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .strip_prefix("Improved query:")
        .or_else(|| line.strip_prefix("Query:"))
        .unwrap_or(line)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

#[async_trait]
impl Critic for LlmCritic {
    async fn critique(&self, request: CritiqueRequest<'_>) -> Result<CritiqueVerdict, RagError> {
        let user_prompt = prompts::critic_user(
            request.question,
            &request.answer.text,
            &Self::format_sources(&request),
            &self.schema,
        );
        let raw = self
            .model
            .complete(request.route, prompts::CRITIC_SYSTEM, &user_prompt, &self.params)
            .await
            .map_err(|e| RagError::Critique(format!("{:#}", e)))?;
        if raw.trim().is_empty() {
            return Err(RagError::Critique("模型返回了空内容".to_string()));
        }

        let report = CritiqueReport::parse(&raw);
        debug!(
            "评审结果: approved={}, flaws={}",
            report.approved,
            report.flaws.len()
        );

        let mut revised_query = report
            .revised_query
            .as_deref()
            .and_then(clean_query);
        if !report.approved && revised_query.is_none() {
            let refined = self.refine_query(&request, &report).await?;
            info!("🔎 改写检索语句: {}", refined);
            revised_query = Some(refined);
        }

        Ok(CritiqueVerdict {
            verdict: if report.approved {
                Verdict::Pass
            } else {
                Verdict::Fail
            },
            rationale: report.rationale.clone(),
            flaws: report.flaws.clone(),
            suggestions: report.suggestions.clone(),
            confidence: report.confidence_score(),
            revised_query: if report.approved { None } else { revised_query },
        })
    }
}
