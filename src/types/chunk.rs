use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// 文档的来源信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DocumentMetadata {
    /// 展示给用户的来源名称，例如 "React 18 Official Docs" 或相对路径
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// 文档类型：official_docs、local_file、sample 等
    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            doc_type: doc_type.into(),
            ..Default::default()
        }
    }
}

/// 加载后尚未切分的原始文档
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// 索引中的最小检索单元，创建后不可修改
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    /// 在所属文档中的序号
    pub ordinal: usize,
    pub metadata: DocumentMetadata,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, ordinal: usize, metadata: DocumentMetadata) -> Self {
        let text = text.into();
        let source = metadata.source.clone();
        let id = Self::chunk_id(&source, ordinal, &text);
        Self {
            id,
            text,
            source,
            ordinal,
            metadata,
        }
    }

    /// 块ID为 (source, ordinal, text) 的MD5，重复写入同一块时ID不变
    pub fn chunk_id(source: &str, ordinal: usize, text: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(ordinal.to_le_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// 带相关度分数的检索结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}
