//! LLM客户端 - 主备线路、重试与超时

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::config::{LLMConfig, ProviderProfile};
use crate::llm::{CallParams, LanguageModel};

mod providers;
mod retry;
mod router;

pub use retry::RetryPolicy;
pub use router::{ProviderRoute, RouteHealth, RouteStatus};

use providers::ProviderClient;

/// LLM客户端，Clone 后共享同一份线路健康记录
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    primary: ProviderClient,
    fallback: Option<ProviderClient>,
    retry: RetryPolicy,
    health: Arc<Mutex<RouteHealth>>,
}

impl LLMClient {
    /// 创建新的LLM客户端，备线路缺少API KEY时不启用
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let primary = ProviderClient::new(&config.primary)
            .context(format!("无法创建主线路客户端 {}", config.primary.label()))?;

        let fallback = match config.fallback.as_ref() {
            Some(profile) if profile.is_usable() => Some(
                ProviderClient::new(profile)
                    .context(format!("无法创建备线路客户端 {}", profile.label()))?,
            ),
            Some(profile) => {
                debug!("备线路 {} 缺少API KEY，未启用", profile.label());
                None
            }
            None => None,
        };

        Ok(Self {
            config: config.clone(),
            primary,
            fallback,
            retry: RetryPolicy::from_config(config),
            health: Arc::new(Mutex::new(RouteHealth::new(config.failover_cooldown_seconds))),
        })
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// 为一次请求选定线路
    pub fn select_route(&self) -> ProviderRoute {
        let health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        let route = health.select(self.has_fallback(), Utc::now());
        if route == ProviderRoute::Fallback {
            info!("主线路冷却中，本次请求使用备线路 {}", self.describe_route(route));
        }
        route
    }

    pub fn profile(&self, route: ProviderRoute) -> &ProviderProfile {
        match (route, self.config.fallback.as_ref()) {
            (ProviderRoute::Fallback, Some(profile)) if self.fallback.is_some() => profile,
            _ => &self.config.primary,
        }
    }

    /// 形如 groq:llama-3.1-8b-instant 的线路描述
    pub fn describe_route(&self, route: ProviderRoute) -> String {
        self.profile(route).label()
    }

    /// 线路健康快照
    pub fn route_status(&self, route: ProviderRoute) -> RouteStatus {
        let health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        health.status(route).clone()
    }

    /// 单轮对话，失败按重试策略重试，重试耗尽后线路进入冷却
    pub async fn prompt(
        &self,
        route: ProviderRoute,
        system_prompt: &str,
        user_prompt: &str,
        params: &CallParams,
    ) -> Result<String> {
        let client = match route {
            ProviderRoute::Fallback => self
                .fallback
                .as_ref()
                .ok_or_else(|| anyhow!("未配置可用的备线路"))?,
            ProviderRoute::Primary => &self.primary,
        };
        let profile = self.profile(route);
        let agent = client.create_agent(profile.model_name(), system_prompt, params);
        let label = profile.label();

        debug!(
            "调用 {} (system {} 字符, user {} 字符)",
            label,
            system_prompt.len(),
            user_prompt.len()
        );

        let result = self
            .retry
            .run(&label, || async { agent.prompt(user_prompt).await })
            .await;

        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        match &result {
            Ok(_) => health.record_success(route),
            Err(err) => health.record_failure(route, err.to_string(), Utc::now()),
        }
        result
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self, route: ProviderRoute) -> Result<()> {
        let label = self.describe_route(route);
        println!("🔄 正在检查模型连接 {}...", label);
        let params = CallParams {
            temperature: 0.0,
            max_tokens: 16,
        };
        match self
            .prompt(route, "You are a helpful assistant.", "Reply with OK.", &params)
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常 {}", label);
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败 {}: {}", label, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl LanguageModel for LLMClient {
    async fn complete(
        &self,
        route: ProviderRoute,
        system_prompt: &str,
        user_prompt: &str,
        params: &CallParams,
    ) -> Result<String> {
        self.prompt(route, system_prompt, user_prompt, params).await
    }

    fn model_label(&self, route: ProviderRoute) -> String {
        self.describe_route(route)
    }

    fn select_route(&self) -> ProviderRoute {
        LLMClient::select_route(self)
    }
}

#[cfg(test)]
mod tests;
