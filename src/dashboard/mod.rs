//! 终端展示：反思过程、最终回答、索引统计

use std::fmt::Write;

use crate::index::IndexStats;
use crate::ingest::CacheInfo;
use crate::types::{ConfidenceLevel, ReflectionOutcome, ReflectionStep, Verdict};
use crate::utils::truncate_chars;

pub mod chat;

/// 每轮最多展示的来源数
pub const MAX_SOURCES_PER_STEP: usize = 3;

/// 交互模式下 /samples 给出的示例问题
pub const SAMPLE_QUESTIONS: [&str; 4] = [
    "How do I use React's new `use` hook in a Client Component?",
    "What's the best way to handle state in Next.js 15?",
    "How do I implement streaming with the new OpenAI SDK?",
    "How to fetch data in a Next.js Client Component?",
];

/// 置信度徽标：90%及以上为高，70%及以上为中，其余为低
///
/// 百分比向下取整，0.895 显示为 89%。
pub fn format_confidence(score: f32) -> String {
    // f32 的 0.9 略小于 0.9，加一点余量再取整
    let percentage = ((score.clamp(0.0, 1.0) as f64) * 100.0 + 1e-4).floor() as u32;
    if percentage >= 90 {
        format!("🟢 {}% (High Confidence)", percentage)
    } else if percentage >= 70 {
        format!("🟡 {}% (Medium Confidence)", percentage)
    } else {
        format!("🔴 {}% (Low Confidence)", percentage)
    }
}

fn format_level(level: ConfidenceLevel) -> &'static str {
    match level {
        ConfidenceLevel::Verified => "✅ verified",
        ConfidenceLevel::Unverified => "⚠️ unverified",
    }
}

/// 单轮的思考过程
pub fn render_step(step: &ReflectionStep) -> String {
    let mut out = String::new();
    let verdict = match step.verdict.verdict {
        Verdict::Pass => "✅ 通过",
        Verdict::Fail => "❌ 未通过",
    };

    let _ = writeln!(out, "🔄 第 {} 轮", step.iteration + 1);
    let _ = writeln!(out, "   🔍 检索语句: {}", step.query);

    let shown: Vec<String> = step
        .retrieved
        .iter()
        .take(MAX_SOURCES_PER_STEP)
        .map(|r| format!("{} ({:.2})", r.chunk.source, r.score))
        .collect();
    let _ = write!(out, "   📚 来源: {}", shown.join(", "));
    if step.retrieved.len() > MAX_SOURCES_PER_STEP {
        let _ = write!(
            out,
            " 等 {} 个",
            step.retrieved.len()
        );
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "   🧐 评审: {} {}",
        verdict,
        format_confidence(step.verdict.confidence)
    );
    if !step.verdict.rationale.trim().is_empty() {
        let _ = writeln!(
            out,
            "   💬 {}",
            truncate_chars(step.verdict.rationale.trim(), 300)
        );
    }
    for flaw in &step.verdict.flaws {
        let _ = writeln!(out, "   • {}", flaw);
    }
    if let Some(revised) = &step.verdict.revised_query {
        let _ = writeln!(out, "   ✏️ 新检索语句: {}", revised);
    }
    let _ = writeln!(
        out,
        "   ⏱️ 检索 {}ms / 生成 {}ms / 评审 {}ms",
        step.timings.retrieve_ms, step.timings.generate_ms, step.timings.critique_ms
    );
    out
}

/// 完整结果：思考过程 + 最终回答
pub fn render_outcome(outcome: &ReflectionOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🧠 思考过程");
    for step in &outcome.steps {
        out.push_str(&render_step(step));
    }
    out.push('\n');

    let _ = writeln!(out, "💡 最终回答");
    let _ = writeln!(out, "{}", outcome.answer.text.trim());
    out.push('\n');

    let _ = writeln!(
        out,
        "📊 置信度: {} {}",
        format_confidence(outcome.confidence.score),
        format_level(outcome.confidence.level)
    );
    if !outcome.answer.sources.is_empty() {
        let _ = writeln!(out, "📚 引用来源:");
        for source in &outcome.answer.sources {
            let _ = writeln!(out, "   - {}", source);
        }
    }
    let _ = writeln!(
        out,
        "⏱️ 共 {} 轮，耗时 {:.2}s，线路 {} ({})",
        outcome.iterations_used,
        outcome.elapsed_ms as f64 / 1000.0,
        outcome.route,
        outcome.model
    );
    out
}

pub fn render_index_stats(stats: &IndexStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🗂️ 集合: {}", stats.collection);
    let _ = writeln!(out, "   块数量: {}", stats.chunks);
    let _ = writeln!(out, "   来源数量: {}", stats.sources.len());
    let _ = writeln!(out, "   向量化: {}", stats.profile);
    if let Some(updated_at) = stats.updated_at {
        let _ = writeln!(out, "   更新时间: {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    for source in &stats.sources {
        let _ = writeln!(out, "   - {}", source);
    }
    out
}

pub fn render_cache_info(info: &CacheInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "💾 文档缓存: {}", info.path.display());
    if !info.exists {
        let _ = writeln!(out, "   状态: ⚪ 不存在");
        return out;
    }
    let status = if info.is_expired {
        "🟡 已过期"
    } else {
        "🟢 有效"
    };
    let _ = writeln!(out, "   状态: {}", status);
    let _ = writeln!(out, "   文档数量: {}", info.document_count);
    let _ = writeln!(out, "   缓存时长: {:.1} 小时", info.age_hours);
    let used = &info.sources_used;
    let _ = writeln!(
        out,
        "   来源: react={} nextjs={} local={} sample={}",
        used.react, used.nextjs, used.local, used.sample
    );
    out
}
