//! LLM调用层

use anyhow::Result;
use async_trait::async_trait;

pub mod client;

pub use client::{LLMClient, ProviderRoute};

/// 单次调用的采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

/// 反思回路依赖的模型接口
///
/// 生成器和评审器只通过这个trait访问模型，测试里可以换成脚本化的实现。
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        route: ProviderRoute,
        system_prompt: &str,
        user_prompt: &str,
        params: &CallParams,
    ) -> Result<String>;

    /// route 对应的模型标签，用于展示
    fn model_label(&self, route: ProviderRoute) -> String;

    /// 为一次请求选定线路，只有主线路时总是 Primary
    fn select_route(&self) -> ProviderRoute {
        ProviderRoute::Primary
    }
}
