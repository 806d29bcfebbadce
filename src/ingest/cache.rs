use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::types::SourceDocument;

/// 抓取时启用了哪些来源
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SourcesUsed {
    pub react: bool,
    pub nextjs: bool,
    pub local: bool,
    pub sample: bool,
}

/// 缓存文件内容
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedDocuments {
    pub documents: Vec<SourceDocument>,
    /// Unix时间戳（秒）
    pub cached_at: u64,
    pub total_count: usize,
    #[serde(default)]
    pub sources_used: SourcesUsed,
}

/// 缓存状态，供 `cache info` 展示
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub document_count: usize,
    pub cached_at: Option<DateTime<Utc>>,
    pub age_hours: f64,
    pub is_expired: bool,
    pub sources_used: SourcesUsed,
}

/// 文档缓存管理器
pub struct DocumentCache {
    config: CacheConfig,
    path: PathBuf,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl DocumentCache {
    pub fn new(config: CacheConfig, path: PathBuf) -> Self {
        Self { config, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn age_hours(cached_at: u64, now: u64) -> f64 {
        now.saturating_sub(cached_at) as f64 / 3600.0
    }

    /// 检查缓存是否过期
    pub fn is_expired_at(&self, cached_at: u64, now: u64) -> bool {
        Self::age_hours(cached_at, now) >= self.config.expire_hours as f64
    }

    /// 读取缓存文件；不存在或损坏时返回 None
    pub async fn read(&self) -> Result<Option<CachedDocuments>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .await
            .context(format!("Failed to read document cache: {:?}", self.path))?;
        match serde_json::from_str::<CachedDocuments>(&content) {
            Ok(cached) => Ok(Some(cached)),
            Err(e) => {
                warn!("⚠️ 文档缓存反序列化失败，忽略缓存: {}", e);
                Ok(None)
            }
        }
    }

    /// 读取未过期的缓存，返回文档和缓存时长（小时）
    pub async fn read_fresh(&self) -> Result<Option<(Vec<SourceDocument>, f64)>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(cached) = self.read().await? else {
            return Ok(None);
        };
        let now = now_secs();
        let age = Self::age_hours(cached.cached_at, now);
        if self.is_expired_at(cached.cached_at, now) {
            info!("⏰ 文档缓存已过期 ({:.1}h)，重新抓取...", age);
            return Ok(None);
        }
        Ok(Some((cached.documents, age)))
    }

    /// 写入缓存
    pub async fn write(&self, documents: &[SourceDocument], sources_used: SourcesUsed) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let cached = CachedDocuments {
            documents: documents.to_vec(),
            cached_at: now_secs(),
            total_count: documents.len(),
            sources_used,
        };
        let content = serde_json::to_string_pretty(&cached)?;
        fs::write(&self.path, content)
            .await
            .context(format!("Failed to write document cache: {:?}", self.path))?;
        info!("💾 已缓存 {} 篇文档", documents.len());
        Ok(())
    }

    pub async fn info(&self) -> Result<CacheInfo> {
        let mut info = CacheInfo {
            path: self.path.clone(),
            exists: false,
            document_count: 0,
            cached_at: None,
            age_hours: 0.0,
            is_expired: false,
            sources_used: SourcesUsed::default(),
        };
        if let Some(cached) = self.read().await? {
            let now = now_secs();
            info.exists = true;
            info.document_count = cached.total_count;
            info.cached_at = Utc.timestamp_opt(cached.cached_at as i64, 0).single();
            info.age_hours = Self::age_hours(cached.cached_at, now);
            info.is_expired = self.is_expired_at(cached.cached_at, now);
            info.sources_used = cached.sources_used;
        }
        Ok(info)
    }

    /// 删除缓存文件，返回是否真的删除了文件
    pub async fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .await
            .context(format!("Failed to remove document cache: {:?}", self.path))?;
        info!("🗑️ 文档缓存已清除");
        Ok(true)
    }
}
