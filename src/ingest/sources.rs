//! 网页与本地文档来源

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use glob::Pattern;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::DocumentConfig;
use crate::types::{DocumentMetadata, SourceDocument};
use crate::utils::{html_to_text, truncate_chars};

/// 一个文档站点
#[derive(Debug, Clone)]
pub struct DocSite {
    pub framework: &'static str,
    pub source: &'static str,
    pub urls: Vec<String>,
}

impl DocSite {
    pub fn react(urls: Vec<String>) -> Self {
        Self {
            framework: "react",
            source: "react-official",
            urls,
        }
    }

    pub fn nextjs(urls: Vec<String>) -> Self {
        Self {
            framework: "nextjs",
            source: "nextjs-official",
            urls,
        }
    }
}

/// 网页抓取器
pub struct WebFetcher {
    http: reqwest::Client,
    delay: Duration,
    min_chars: usize,
    max_chars: usize,
}

impl WebFetcher {
    pub fn new(config: &DocumentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds.max(1)))
            .user_agent(concat!("echocheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            delay: Duration::from_millis(config.fetch_delay_ms),
            min_chars: config.min_content_chars,
            max_chars: config.max_content_chars,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {}", response.status()));
        }
        let html = response.text().await?;
        Ok(extract_page_text(&html, self.min_chars, self.max_chars))
    }

    /// 依次抓取站点下的页面，页面之间间隔 delay；失败的页面跳过
    pub async fn fetch_site(&self, site: &DocSite) -> Vec<SourceDocument> {
        let mut documents = Vec::new();
        for (i, url) in site.urls.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.fetch_page(url).await {
                Ok(Some(text)) => {
                    let mut metadata = DocumentMetadata::new(site.source, "documentation");
                    metadata.url = Some(url.clone());
                    metadata.framework = Some(site.framework.to_string());
                    metadata.fetched_at = Some(Utc::now());
                    documents.push(SourceDocument::new(text, metadata));
                }
                Ok(None) => debug!("页面内容过少，跳过 {}", url),
                Err(e) => warn!("⚠️ 抓取失败 {}: {}", url, e),
            }
        }
        documents
    }
}

/// 提取正文，内容不足 min_chars 时返回 None
pub fn extract_page_text(html: &str, min_chars: usize, max_chars: usize) -> Option<String> {
    let text = html_to_text(html);
    if text.chars().count() <= min_chars {
        return None;
    }
    Some(truncate_chars(&text, max_chars))
}

/// 读取本地文档目录
///
/// Markdown 转成纯文本，JSON 可以是单篇文档或文档数组，其余文件按纯文本读取。
pub fn load_local_documents(dir: &Path, patterns: &[String]) -> Result<Vec<SourceDocument>> {
    if !dir.exists() {
        debug!("本地文档目录不存在 {:?}", dir);
        return Ok(Vec::new());
    }

    let patterns: Vec<Pattern> = patterns
        .iter()
        .map(|p| Pattern::new(p).context(format!("Invalid file pattern: {}", p)))
        .collect::<Result<_>>()?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).max_depth(5).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️ 无法访问 {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if file_name == "cached_docs.json" || !patterns.iter().any(|p| p.matches(&file_name)) {
            continue;
        }

        let relative = pathdiff::diff_paths(path, dir)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/");

        match load_local_file(path, &relative) {
            Ok(mut docs) => documents.append(&mut docs),
            Err(e) => warn!("⚠️ 读取本地文档失败 {:?}: {}", path, e),
        }
    }
    Ok(documents)
}

fn load_local_file(path: &Path, relative: &str) -> Result<Vec<SourceDocument>> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let local_metadata = |doc_type: &str| {
        let mut metadata = DocumentMetadata::new(relative, doc_type);
        metadata.path = Some(path.to_string_lossy().to_string());
        metadata
    };

    let documents = match extension.as_str() {
        "json" => {
            let value: serde_json::Value = serde_json::from_str(&content)?;
            let mut docs: Vec<SourceDocument> = if value.is_array() {
                serde_json::from_value(value)?
            } else {
                vec![serde_json::from_value(value)?]
            };
            for doc in docs.iter_mut() {
                if doc.metadata.source.is_empty() {
                    doc.metadata.source = relative.to_string();
                }
                if doc.metadata.doc_type.is_empty() {
                    doc.metadata.doc_type = "json".to_string();
                }
            }
            docs
        }
        "md" | "markdown" => {
            let html = markdown::to_html(&content);
            vec![SourceDocument::new(html_to_text(&html), local_metadata("markdown"))]
        }
        _ => vec![SourceDocument::new(content.trim(), local_metadata("text"))],
    };

    Ok(documents
        .into_iter()
        .filter(|doc| !doc.content.trim().is_empty())
        .collect())
}
