use thiserror::Error;

/// 反思回路的错误分类
///
/// 预算耗尽不属于错误：回路仍返回最佳答案，并标记为未验证。
#[derive(Debug, Error)]
pub enum RagError {
    /// 向量库不可达，或者检索结果为空
    #[error("检索失败: {0}")]
    Retrieval(String),

    /// 模型调用失败，或者返回了空内容
    #[error("生成失败: {0}")]
    Generation(String),

    /// 评审调用失败
    #[error("评审失败: {0}")]
    Critique(String),

    #[error("无效请求: {0}")]
    InvalidRequest(String),

    /// 用户在调用边界处取消了请求
    #[error("请求已取消")]
    Cancelled,

    #[error("配置错误: {0}")]
    Config(String),
}

impl RagError {
    /// 便于仪表盘展示的简短类别名
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Retrieval(_) => "retrieval",
            RagError::Generation(_) => "generation",
            RagError::Critique(_) => "critique",
            RagError::InvalidRequest(_) => "invalid_request",
            RagError::Cancelled => "cancelled",
            RagError::Config(_) => "config",
        }
    }
}
