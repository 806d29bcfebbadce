use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::RagError;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "groq")]
    #[default]
    Groq,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Groq => write!(f, "groq"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "groq" => Ok(LLMProvider::Groq),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl LLMProvider {
    /// 各Provider的默认API基地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Groq => "https://api.groq.com/openai/v1",
            LLMProvider::Anthropic => "https://api.anthropic.com",
            LLMProvider::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "gpt-4o-mini",
            LLMProvider::Groq => "llama-3.1-8b-instant",
            LLMProvider::Anthropic => "claude-3-5-haiku-latest",
            LLMProvider::Ollama => "llama3.1",
        }
    }

    /// 读取API KEY的环境变量名
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
            LLMProvider::Groq => Some("GROQ_API_KEY"),
            LLMProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMProvider::Ollama => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Ollama)
    }
}

/// 文档加载模式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// 缓存新鲜时用缓存，否则重新抓取
    #[default]
    Hybrid,
    /// 只读缓存，缓存不存在时回退到示例文档
    CacheOnly,
    /// 忽略缓存，总是重新抓取
    LiveOnly,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Hybrid => write!(f, "hybrid"),
            LoadMode::CacheOnly => write!(f, "cache_only"),
            LoadMode::LiveOnly => write!(f, "live_only"),
        }
    }
}

impl std::str::FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" | "auto" => Ok(LoadMode::Hybrid),
            "cache_only" | "cache" => Ok(LoadMode::CacheOnly),
            "live_only" | "live" | "remote" => Ok(LoadMode::LiveOnly),
            _ => Err(format!("Unknown load mode: {}", s)),
        }
    }
}

/// 向量化后端
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// 有API KEY时走OpenAI兼容接口，否则使用本地哈希向量
    #[default]
    Auto,
    #[serde(rename = "openai")]
    OpenAI,
    Hashing,
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(EmbeddingBackend::Auto),
            "openai" => Ok(EmbeddingBackend::OpenAI),
            "hashing" | "local" => Ok(EmbeddingBackend::Hashing),
            _ => Err(format!("Unknown embedding backend: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// LLM模型配置
    pub llm: LLMConfig,

    /// 向量化配置
    pub embedding: EmbeddingConfig,

    /// 检索配置
    pub retrieval: RetrievalConfig,

    /// 反思回路配置
    pub reflection: ReflectionConfig,

    /// 文档来源配置
    pub documents: DocumentConfig,

    /// 文档缓存配置
    pub cache: CacheConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// 单个Provider的连接信息
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderProfile {
    pub provider: LLMProvider,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_base_url: String,

    #[serde(default)]
    pub model: String,
}

impl ProviderProfile {
    pub fn new(provider: LLMProvider) -> Self {
        Self {
            provider,
            api_key: String::new(),
            api_base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
        }
    }

    /// 是否具备发起调用的条件
    pub fn is_usable(&self) -> bool {
        !self.provider.requires_api_key() || !self.api_key.trim().is_empty()
    }

    /// 基地址为空时使用Provider默认值
    pub fn base_url(&self) -> &str {
        if self.api_base_url.trim().is_empty() {
            self.provider.default_base_url()
        } else {
            &self.api_base_url
        }
    }

    pub fn model_name(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// 形如 groq:llama-3.1-8b-instant 的标签
    pub fn label(&self) -> String {
        format!("{}:{}", self.provider, self.model_name())
    }
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// 主Provider
    pub primary: ProviderProfile,

    /// 备选Provider，主Provider熔断期间使用
    pub fallback: Option<ProviderProfile>,

    /// 生成回答时的温度
    pub temperature: f64,

    /// 生成回答时的最大tokens
    pub max_tokens: u32,

    /// 评审时的温度，低一些以保持判断稳定
    pub critic_temperature: f64,

    /// 评审时的最大tokens
    pub critic_max_tokens: u32,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒），按指数退避增长
    pub retry_delay_ms: u64,

    /// 重试间隔上限（毫秒）
    pub max_retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 某个Provider重试耗尽后的冷却时间（秒）
    pub failover_cooldown_seconds: u64,
}

/// 向量化配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,

    /// OpenAI兼容接口的模型名
    pub model: String,

    pub api_key: String,

    pub api_base_url: String,

    /// 本地哈希向量的维度
    pub dimensions: usize,

    /// 单次请求的文本条数
    pub batch_size: usize,
}

/// 检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// 分块大小（字符）
    pub chunk_size: usize,

    /// 分块重叠（字符）
    pub chunk_overlap: usize,

    /// 每次检索返回的块数
    pub top_k: usize,

    /// 相似度必须超过该值才会被采用
    pub min_score: f32,

    /// 拼装上下文时的token预算
    pub max_context_tokens: usize,

    /// 向量索引文件
    pub index_path: PathBuf,

    pub collection_name: String,
}

/// 反思回路配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ReflectionConfig {
    /// 最大反思轮数（至少为1）
    pub max_iterations: usize,
}

/// 文档来源配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DocumentConfig {
    pub mode: LoadMode,

    /// 本地文档目录
    pub sources_dir: PathBuf,

    pub enable_react_docs: bool,

    pub enable_nextjs_docs: bool,

    pub enable_local_docs: bool,

    pub enable_sample_docs: bool,

    /// 本地文档的文件名匹配规则
    pub local_patterns: Vec<String>,

    pub react_urls: Vec<String>,

    pub nextjs_urls: Vec<String>,

    /// 抓取网页的超时时间（秒）
    pub fetch_timeout_seconds: u64,

    /// 同一站点两次抓取之间的间隔（毫秒）
    pub fetch_delay_ms: u64,

    /// 正文少于该字符数的页面会被丢弃
    pub min_content_chars: usize,

    /// 正文截断长度
    pub max_content_chars: usize,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 用环境变量补全配置，lookup 便于测试时注入
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // USE_GROQ=false 时让备选的非Groq Provider顶上
        if let Some(use_groq) = non_empty("USE_GROQ")
            && !parse_bool(&use_groq)
            && self.llm.primary.provider == LLMProvider::Groq
            && let Some(fallback) = self.llm.fallback.take()
        {
            let primary = std::mem::replace(&mut self.llm.primary, fallback);
            self.llm.fallback = Some(primary);
        }

        if let Some(model) = non_empty("DEFAULT_MODEL") {
            self.llm.primary.model = model;
        }

        self.fill_api_keys(&non_empty);

        if self.embedding.api_key.trim().is_empty()
            && let Some(key) = non_empty("OPENAI_API_KEY")
        {
            self.embedding.api_key = key;
        }

        if let Some(path) = non_empty("ECHOCHECK_INDEX_PATH") {
            self.retrieval.index_path = PathBuf::from(path);
        }
        if let Some(mode) = non_empty("DOCUMENT_SOURCE_MODE")
            && let Ok(mode) = mode.parse::<LoadMode>()
        {
            self.documents.mode = mode;
        }
        if let Some(v) = non_empty("USE_DOCUMENT_CACHE") {
            self.cache.enabled = parse_bool(&v);
        }
        if let Some(v) = non_empty("CACHE_EXPIRY_HOURS")
            && let Ok(hours) = v.trim().parse::<u64>()
        {
            self.cache.expire_hours = hours;
        }
        if let Some(dir) = non_empty("CACHE_DIR") {
            self.cache.cache_dir = PathBuf::from(dir);
        }
        if let Some(v) = non_empty("ENABLE_REACT_DOCS") {
            self.documents.enable_react_docs = parse_bool(&v);
        }
        if let Some(v) = non_empty("ENABLE_NEXTJS_DOCS") {
            self.documents.enable_nextjs_docs = parse_bool(&v);
        }
        if let Some(v) = non_empty("ENABLE_LOCAL_DOCS") {
            self.documents.enable_local_docs = parse_bool(&v);
        }
        if let Some(v) = non_empty("ENABLE_SAMPLE_DOCS") {
            self.documents.enable_sample_docs = parse_bool(&v);
        }
    }

    /// 只补全空缺的API KEY，命令行切换Provider后使用
    pub fn fill_api_keys<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        fill_api_key(&mut self.llm.primary, &non_empty);
        if let Some(fallback) = self.llm.fallback.as_mut() {
            fill_api_key(fallback, &non_empty);
        }
    }

    /// 校验发起问答所需的配置
    pub fn validate(&self) -> Result<(), RagError> {
        if !self.llm.primary.is_usable() {
            let env = self.llm.primary.provider.api_key_env().unwrap_or("API key");
            return Err(RagError::Config(format!(
                "{} is required when the primary provider is {}",
                env, self.llm.primary.provider
            )));
        }
        if self.reflection.max_iterations == 0 {
            return Err(RagError::Config(
                "reflection.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(RagError::Config(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(RagError::Config(format!(
                "retrieval.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }
        Ok(())
    }

    /// 文档缓存文件路径
    pub fn document_cache_file(&self) -> PathBuf {
        self.cache.cache_dir.join("cached_docs.json")
    }

    /// 输出时隐藏API KEY
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        redact(&mut config.llm.primary.api_key);
        if let Some(fallback) = config.llm.fallback.as_mut() {
            redact(&mut fallback.api_key);
        }
        redact(&mut config.embedding.api_key);
        config
    }
}

fn fill_api_key<F>(profile: &mut ProviderProfile, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if !profile.api_key.trim().is_empty() {
        return;
    }
    if let Some(env) = profile.provider.api_key_env()
        && let Some(key) = lookup(env)
    {
        profile.api_key = key;
    }
}

fn redact(key: &mut String) {
    if !key.is_empty() {
        *key = "***".to_string();
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            primary: ProviderProfile::new(LLMProvider::Groq),
            fallback: Some(ProviderProfile::new(LLMProvider::OpenAI)),
            temperature: 0.1,
            max_tokens: 2000,
            critic_temperature: 0.2,
            critic_max_tokens: 1000,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 8000,
            timeout_seconds: 60,
            failover_cooldown_seconds: 30,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Auto,
            model: String::from("text-embedding-3-small"),
            api_key: String::new(),
            api_base_url: String::from("https://api.openai.com/v1"),
            dimensions: 384,
            batch_size: 64,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            min_score: 0.0,
            max_context_tokens: 6000,
            index_path: PathBuf::from("./data/index/echocheck_docs.json"),
            collection_name: String::from("echocheck_docs"),
        }
    }
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self { max_iterations: 2 }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            mode: LoadMode::Hybrid,
            sources_dir: PathBuf::from("./data/sources"),
            enable_react_docs: true,
            enable_nextjs_docs: true,
            enable_local_docs: true,
            enable_sample_docs: true,
            local_patterns: vec!["*.md".to_string(), "*.txt".to_string(), "*.json".to_string()],
            react_urls: vec![
                "https://react.dev/reference/react/use".to_string(),
                "https://react.dev/learn/synchronizing-with-effects".to_string(),
                "https://react.dev/reference/react/useState".to_string(),
                "https://react.dev/reference/react/useEffect".to_string(),
            ],
            nextjs_urls: vec![
                "https://nextjs.org/docs/app/building-your-application/data-fetching".to_string(),
                "https://nextjs.org/docs/app/building-your-application/rendering/client-components"
                    .to_string(),
                "https://nextjs.org/docs/app/building-your-application/rendering/server-components"
                    .to_string(),
            ],
            fetch_timeout_seconds: 10,
            fetch_delay_ms: 1000,
            min_content_chars: 100,
            max_content_chars: 10_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from("./data/cache"),
            expire_hours: 24,
        }
    }
}
