//! 文本清洗工具

use regex::Regex;
use std::sync::LazyLock;

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[\w+-]*[ \t]*\n").expect("valid regex"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n```[ \t]*$").expect("valid regex"));

static ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article>").expect("valid regex"));
static MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main>").expect("valid regex"));
static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)</body>").expect("valid regex"));
static NON_CONTENT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "noscript", "svg", "template"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}>")).expect("valid regex")
        })
        .collect()
});
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|br|h[1-6]|li|ul|ol|pre|section|article|main|header|footer|blockquote|table|tr|td|th|dt|dd|hr)\b[^>]*>",
    )
    .expect("valid regex")
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static INLINE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// 整理模型返回的代码片段：压缩多余空行，去掉包裹整段的代码围栏
pub fn clean_code_snippet(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let trimmed = text.trim();
    let collapsed = EXCESS_BLANK_LINES.replace_all(trimmed, "\n\n");

    // 只有开头和结尾都是围栏时才认为整段被包裹
    if OPENING_FENCE.is_match(&collapsed) && CLOSING_FENCE.is_match(&collapsed) {
        let inner = OPENING_FENCE.replace(&collapsed, "");
        let inner = CLOSING_FENCE.replace(&inner, "");
        if !inner.contains("```") {
            return inner.trim().to_string();
        }
    }
    collapsed.trim().to_string()
}

/// 按字符截断，超长时以 ... 结尾
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut truncated: String = text.chars().take(max_chars - 3).collect();
    truncated.push_str("...");
    truncated
}

/// 行内空白压缩成一个空格，去掉首尾空行，连续空行最多保留一个
pub fn collapse_whitespace(text: &str) -> String {
    let mut lines = Vec::new();
    let mut blank_run = 0;
    for line in text.lines() {
        let line = INLINE_SPACES.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !lines.is_empty() {
                lines.push(String::new());
            }
        } else {
            blank_run = 0;
            lines.push(line.to_string());
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// 从HTML中提取正文：优先 article，其次 main，再次 body
pub fn html_to_text(html: &str) -> String {
    let region = [&*ARTICLE, &*MAIN, &*BODY]
        .iter()
        .find_map(|pattern| pattern.captures(html).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
        .unwrap_or(html);

    let mut text = COMMENT.replace_all(region, "").into_owned();
    for pattern in NON_CONTENT.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    collapse_whitespace(&decode_entities(&text))
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    // &amp; 最后处理，避免二次解码
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
