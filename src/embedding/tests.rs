#[cfg(test)]
mod tests {
    use crate::config::{EmbeddingBackend, EmbeddingConfig, LLMConfig};
    use crate::embedding::{
        Embedder, EmbeddingProfile, HashingEmbedder, build_embedder, cosine_similarity, magnitude,
    };

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("React use hook in Client Components");
        let b = embedder.embed_text("react USE hook in client components");

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!((magnitude(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_embedder_empty_text() {
        let embedder = HashingEmbedder::new(16);
        let vector = embedder.embed_text("   ");
        assert!(vector.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_hashing_embedder_ranks_related_text_higher() {
        let embedder = HashingEmbedder::new(384);
        let query = embedder.embed_query("streaming with the OpenAI SDK").await.unwrap();
        let related = embedder.embed_text("Use stream: true with the OpenAI SDK for streaming");
        let unrelated = embedder.embed_text("Server Components render on the server in Next.js");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_profile_compatibility() {
        let hashing = HashingEmbedder::new(384).profile();
        let other_dims = HashingEmbedder::new(128).profile();
        let remote = EmbeddingProfile {
            backend: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 0,
        };

        assert!(hashing.is_compatible(&hashing.clone()));
        assert!(!hashing.is_compatible(&other_dims));
        assert!(!hashing.is_compatible(&remote));
    }

    #[test]
    fn test_build_embedder_auto_without_key_uses_hashing() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Auto,
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config, &LLMConfig::default()).unwrap();
        assert_eq!(embedder.profile().backend, "hashing");
        assert_eq!(embedder.profile().dimensions, 384);
    }

    #[test]
    fn test_build_embedder_auto_with_key_uses_openai() {
        let config = EmbeddingConfig {
            api_key: "sk-test".to_string(),
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config, &LLMConfig::default()).unwrap();
        assert_eq!(embedder.profile().backend, "openai");
    }

    #[test]
    fn test_build_embedder_openai_requires_key() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::OpenAI,
            ..EmbeddingConfig::default()
        };
        assert!(build_embedder(&config, &LLMConfig::default()).is_err());
    }
}
