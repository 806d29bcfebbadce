use anyhow::{Result, anyhow};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::LLMConfig;

/// 重试策略：单次超时 + 指数退避 + 随机抖动
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LLMConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay_ms: config.retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms.max(config.retry_delay_ms),
            timeout: Duration::from_secs(config.timeout_seconds.max(1)),
        }
    }

    /// 第 attempt 次失败后的基础等待时间（不含抖动），attempt 从1开始
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms)
    }

    fn jitter_ms(&self) -> u64 {
        let spread = self.base_delay_ms / 4;
        if spread == 0 {
            0
        } else {
            rand::rng().random_range(0..=spread)
        }
    }

    /// 通用重试逻辑，超时也视为一次失败
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match tokio::time::timeout(self.timeout, operation()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(err)) => err,
                Err(_) => anyhow!("{} 超时 ({}s)", label, self.timeout.as_secs()),
            };

            if attempt >= self.max_attempts {
                return Err(err.context(format!(
                    "{} 尝试 {} 次均失败",
                    label, self.max_attempts
                )));
            }

            let delay = self.backoff_delay_ms(attempt) + self.jitter_ms();
            warn!(
                "❌ 调用 {} 出错，{}ms 后重试 (第 {} / {} 次尝试): {}",
                label, delay, attempt, self.max_attempts, err
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}
