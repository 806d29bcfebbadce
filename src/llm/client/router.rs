use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 一次请求使用的Provider线路，请求开始时选定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRoute {
    #[default]
    Primary,
    Fallback,
}

impl std::fmt::Display for ProviderRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderRoute::Primary => write!(f, "primary"),
            ProviderRoute::Fallback => write!(f, "fallback"),
        }
    }
}

/// 单条线路的健康状态
#[derive(Debug, Clone, Default)]
pub struct RouteStatus {
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub failed_calls: u64,
    pub last_error: Option<String>,
    /// 熔断结束时间，None 表示未熔断
    pub circuit_retry_at: Option<DateTime<Utc>>,
}

impl RouteStatus {
    pub fn record_success(&mut self) {
        self.total_calls += 1;
        self.consecutive_failures = 0;
        self.circuit_retry_at = None;
    }

    /// 重试耗尽后调用，线路进入冷却
    pub fn record_failure(&mut self, error: String, cooldown_seconds: u64, now: DateTime<Utc>) {
        self.total_calls += 1;
        self.failed_calls += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error);
        // 冷却时间超出时间范围时一直熔断到最大时间
        let retry_at = i64::try_from(cooldown_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|cooldown| now.checked_add_signed(cooldown))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.circuit_retry_at = Some(retry_at);
    }

    pub fn should_try(&self, now: DateTime<Utc>) -> bool {
        match self.circuit_retry_at {
            Some(retry_at) => now >= retry_at,
            None => true,
        }
    }
}

/// 主备线路的健康记录
#[derive(Debug, Clone)]
pub struct RouteHealth {
    pub primary: RouteStatus,
    pub fallback: RouteStatus,
    cooldown_seconds: u64,
}

impl RouteHealth {
    pub fn new(cooldown_seconds: u64) -> Self {
        Self {
            primary: RouteStatus::default(),
            fallback: RouteStatus::default(),
            cooldown_seconds,
        }
    }

    /// 主线路熔断且备线路可用时走备线路
    pub fn select(&self, has_fallback: bool, now: DateTime<Utc>) -> ProviderRoute {
        if self.primary.should_try(now) || !has_fallback {
            ProviderRoute::Primary
        } else {
            ProviderRoute::Fallback
        }
    }

    pub fn record_success(&mut self, route: ProviderRoute) {
        self.status_mut(route).record_success();
    }

    pub fn record_failure(&mut self, route: ProviderRoute, error: String, now: DateTime<Utc>) {
        let cooldown = self.cooldown_seconds;
        warn!("线路 {} 调用失败，冷却 {} 秒: {}", route, cooldown, error);
        self.status_mut(route).record_failure(error, cooldown, now);
    }

    pub fn status(&self, route: ProviderRoute) -> &RouteStatus {
        match route {
            ProviderRoute::Primary => &self.primary,
            ProviderRoute::Fallback => &self.fallback,
        }
    }

    fn status_mut(&mut self, route: ProviderRoute) -> &mut RouteStatus {
        match route {
            ProviderRoute::Primary => &mut self.primary,
            ProviderRoute::Fallback => &mut self.fallback,
        }
    }
}
