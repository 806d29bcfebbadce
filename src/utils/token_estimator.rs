use serde::{Deserialize, Serialize};

/// Token估算器，用于拼装上下文时控制token预算
pub struct TokenEstimator {
    rules: TokenCalculationRules,
}

/// Token计算规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCalculationRules {
    /// ASCII字符的平均比例（字符数/token数）
    pub ascii_char_per_token: f64,
    /// 中日韩字符的平均比例
    pub cjk_char_per_token: f64,
    /// 其余字符
    pub other_char_per_token: f64,
}

impl Default for TokenCalculationRules {
    fn default() -> Self {
        Self {
            // 基于GPT系列模型的经验值
            ascii_char_per_token: 4.0,
            cjk_char_per_token: 1.5,
            other_char_per_token: 2.0,
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            rules: TokenCalculationRules::default(),
        }
    }

    pub fn with_rules(rules: TokenCalculationRules) -> Self {
        Self { rules }
    }

    /// 估算文本的token数量
    pub fn estimate(&self, text: &str) -> usize {
        let (mut ascii, mut cjk, mut other) = (0usize, 0usize, 0usize);
        for c in text.chars() {
            if c.is_ascii() {
                ascii += 1;
            } else if is_cjk_char(c) {
                cjk += 1;
            } else {
                other += 1;
            }
        }

        let part = |count: usize, ratio: f64| (count as f64 / ratio).ceil() as usize;
        part(ascii, self.rules.ascii_char_per_token)
            + part(cjk, self.rules.cjk_char_per_token)
            + part(other, self.rules.other_char_per_token)
    }

    /// 估算多个文本片段的总token数量
    pub fn estimate_total(&self, texts: &[&str]) -> usize {
        texts.iter().map(|text| self.estimate(text)).sum()
    }
}

/// 判断是否为中日韩字符
fn is_cjk_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF |   // CJK统一汉字
        0x3400..=0x4DBF |   // CJK扩展A
        0x3040..=0x30FF |   // 平假名、片假名
        0xAC00..=0xD7AF |   // 韩文音节
        0x20000..=0x2A6DF   // CJK扩展B
    )
}
