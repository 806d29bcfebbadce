#[cfg(test)]
mod tests {
    use crate::app::AppContext;
    use crate::config::{Config, EmbeddingBackend, LoadMode};
    use crate::embedding::{Embedder, Embedding, EmbeddingProfile};
    use crate::error::RagError;
    use crate::index::VectorIndex;
    use crate::ingest::DocumentOrigin;
    use crate::llm::{CallParams, LanguageModel, ProviderRoute};
    use crate::reflection::{CancelFlag, prompts};
    use crate::types::{ConfidenceLevel, Termination};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::RwLock;

    /// 评审总是通过的模型
    #[derive(Default)]
    struct ApprovingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for ApprovingModel {
        async fn complete(
            &self,
            _route: ProviderRoute,
            system_prompt: &str,
            _user_prompt: &str,
            _params: &CallParams,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if system_prompt == prompts::CRITIC_SYSTEM {
                Ok(r#"{"approved": true, "rationale": "Matches the docs.", "confidence": 0.92}"#
                    .to_string())
            } else {
                Ok("Call `use(promise)` inside a Client Component [Source 1].".to_string())
            }
        }

        fn model_label(&self, route: ProviderRoute) -> String {
            format!("scripted:{}", route)
        }
    }

    /// 向量化总是失败，并记录调用时索引锁是否空闲
    struct UnavailableEmbedder {
        profile: EmbeddingProfile,
        index: Arc<RwLock<VectorIndex>>,
        index_was_unlocked: AtomicBool,
    }

    #[async_trait]
    impl Embedder for UnavailableEmbedder {
        fn profile(&self) -> EmbeddingProfile {
            self.profile.clone()
        }

        async fn embed_documents(&self, _texts: &[String]) -> anyhow::Result<Vec<Embedding>> {
            self.index_was_unlocked
                .store(self.index.try_write().is_ok(), Ordering::SeqCst);
            Err(anyhow::anyhow!("embedding service unavailable"))
        }
    }

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.embedding.backend = EmbeddingBackend::Hashing;
        config.embedding.dimensions = 128;
        config.retrieval.index_path = temp_dir.path().join("index").join("docs.json");
        config.cache.cache_dir = temp_dir.path().join("cache");
        config.documents.sources_dir = temp_dir.path().join("sources");
        config.documents.mode = LoadMode::CacheOnly;
        config
    }

    async fn app(config: Config, fresh_index: bool) -> (AppContext, Arc<ApprovingModel>) {
        let model = Arc::new(ApprovingModel::default());
        let app = AppContext::with_model(config, model.clone(), fresh_index)
            .await
            .unwrap();
        (app, model)
    }

    #[tokio::test]
    async fn test_ensure_index_ingests_samples_once() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (app, _) = app(config.clone(), false).await;

        let chunks = app.ensure_index().await.unwrap();
        assert!(chunks > 0);
        assert!(config.retrieval.index_path.exists());

        // 已有索引时不会重复导入
        assert_eq!(app.ensure_index().await.unwrap(), chunks);

        let (reopened, _) = self::app(config, false).await;
        assert_eq!(reopened.index.read().await.len(), chunks);
    }

    #[tokio::test]
    async fn test_refresh_reports_and_rebuilds() {
        let temp_dir = TempDir::new().unwrap();
        let (app, _) = app(test_config(&temp_dir), false).await;

        let first = app.refresh(LoadMode::CacheOnly, false).await.unwrap();
        assert_eq!(first.origin, DocumentOrigin::Samples);
        assert_eq!(first.documents.count, 4);
        assert_eq!(first.added, first.chunks);

        let again = app.refresh(LoadMode::CacheOnly, false).await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.total_chunks, first.total_chunks);

        let rebuilt = app.refresh(LoadMode::CacheOnly, true).await.unwrap();
        assert_eq!(rebuilt.added, first.chunks);
        assert_eq!(rebuilt.total_chunks, first.total_chunks);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_existing_index() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (mut app, _) = app(config.clone(), false).await;
        let chunks = app.ensure_index().await.unwrap();

        let unavailable = Arc::new(UnavailableEmbedder {
            profile: app.embedder.profile(),
            index: app.index.clone(),
            index_was_unlocked: AtomicBool::new(false),
        });
        app.embedder = unavailable.clone();

        let err = app.refresh(LoadMode::CacheOnly, true).await.unwrap_err();
        assert!(format!("{:#}", err).contains("embedding service unavailable"));
        // 向量化时没有持有索引锁
        assert!(unavailable.index_was_unlocked.load(Ordering::SeqCst));

        assert_eq!(app.index.read().await.len(), chunks);
        let (reopened, _) = self::app(config, false).await;
        assert_eq!(reopened.index.read().await.len(), chunks);
    }

    #[tokio::test]
    async fn test_mismatched_index_requires_rebuild() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let (app, _) = app(config.clone(), false).await;
        app.ensure_index().await.unwrap();

        let mut other = config;
        other.embedding.dimensions = 64;
        let model = Arc::new(ApprovingModel::default());
        let err = AppContext::with_model(other.clone(), model.clone(), false)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("ingest --rebuild"));

        let fresh = AppContext::with_model(other, model, true).await.unwrap();
        assert!(fresh.index.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_ask_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let (app, model) = app(test_config(&temp_dir), false).await;
        app.ensure_index().await.unwrap();

        let outcome = app
            .ask("How do I use React's new `use` hook?", 2, CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome.iterations_used, 1);
        assert_eq!(outcome.termination, Termination::Passed);
        assert_eq!(outcome.confidence.level, ConfidenceLevel::Verified);
        assert_eq!(outcome.route, ProviderRoute::Primary);
        assert_eq!(outcome.model, "scripted:primary");
        assert_eq!(outcome.answer.sources.len(), 1);
        // 一次生成加一次评审
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ask_on_empty_index_is_retrieval_error() {
        let temp_dir = TempDir::new().unwrap();
        let (app, model) = app(test_config(&temp_dir), false).await;

        let result = app.ask("anything", 2, CancelFlag::new()).await;
        assert!(matches!(result, Err(RagError::Retrieval(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_cancelled_before_start() {
        let temp_dir = TempDir::new().unwrap();
        let (app, model) = app(test_config(&temp_dir), false).await;
        app.ensure_index().await.unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = app.ask("anything", 2, cancel).await;

        assert!(matches!(result, Err(RagError::Cancelled)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
