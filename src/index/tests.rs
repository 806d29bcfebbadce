#[cfg(test)]
mod tests {
    use crate::embedding::{Embedder, HashingEmbedder};
    use crate::index::VectorIndex;
    use crate::types::{DocumentChunk, DocumentMetadata};
    use tempfile::TempDir;

    fn chunk(source: &str, ordinal: usize, text: &str) -> DocumentChunk {
        DocumentChunk::new(text, ordinal, DocumentMetadata::new(source, "sample"))
    }

    fn corpus() -> Vec<DocumentChunk> {
        vec![
            chunk("react", 0, "The use hook reads a promise or context in React 19"),
            chunk("nextjs", 0, "Server Components fetch data on the server in Next.js"),
            chunk("openai", 0, "Streaming responses with the OpenAI SDK use stream true"),
        ]
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let embedder = HashingEmbedder::new(256);
        let mut index = VectorIndex::new("docs", embedder.profile());

        let added = index.add_chunks(corpus(), &embedder).await.unwrap();
        assert_eq!(added, 3);

        let query = embedder.embed_query("react use hook promise").await.unwrap();
        let results = index.search(&query, 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source, "react");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_reinserting_same_chunk_is_noop() {
        let embedder = HashingEmbedder::new(64);
        let mut index = VectorIndex::new("docs", embedder.profile());

        index.add_chunks(corpus(), &embedder).await.unwrap();
        let added = index.add_chunks(corpus(), &embedder).await.unwrap();

        assert_eq!(added, 0);
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_embed_then_insert_skips_known_ids() {
        let embedder = HashingEmbedder::new(64);
        let mut index = VectorIndex::new("docs", embedder.profile());
        index.add_chunks(corpus()[..1].to_vec(), &embedder).await.unwrap();

        let mut batch = corpus();
        batch.push(corpus()[2].clone());
        let pending = index.pending_chunks(batch);
        assert_eq!(pending.len(), 2);

        let embedded = VectorIndex::embed_chunks(pending, &embedder).await.unwrap();
        assert_eq!(embedded.len(), 2);
        assert_eq!(index.insert_embedded(embedded.clone()).unwrap(), 2);
        assert_eq!(index.insert_embedded(embedded).unwrap(), 0);
        assert_eq!(index.len(), 3);

        let narrow = HashingEmbedder::new(32);
        let foreign = VectorIndex::embed_chunks(vec![chunk("x", 0, "other space")], &narrow)
            .await
            .unwrap();
        assert!(index.insert_embedded(foreign).is_err());
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_rejects_incompatible_embedder() {
        let mut index = VectorIndex::new("docs", HashingEmbedder::new(64).profile());
        let other = HashingEmbedder::new(32);

        assert!(index.add_chunks(corpus(), &other).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let embedder = HashingEmbedder::new(64);
        let mut index = VectorIndex::new("docs", embedder.profile());
        index.add_chunks(corpus(), &embedder).await.unwrap();

        let stats = index.stats();
        assert_eq!(stats.collection, "docs");
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.sources, vec!["nextjs", "openai", "react"]);

        index.clear();
        assert!(index.is_empty());
        assert!(index.search(&[0.5; 64], 5).is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("index.json");
        let embedder = HashingEmbedder::new(64);
        let mut index = VectorIndex::new("docs", embedder.profile());
        index.add_chunks(corpus(), &embedder).await.unwrap();

        index.save(&path).await.unwrap();
        let loaded = VectorIndex::load(&path, &embedder.profile())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.len(), 3);
        assert!(loaded.contains(&corpus()[0].id));

        let mismatch = VectorIndex::load(&path, &HashingEmbedder::new(32).profile()).await;
        let message = mismatch.unwrap_err().to_string();
        assert!(message.contains("ingest --rebuild"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.json");
        let loaded = VectorIndex::load(&path, &HashingEmbedder::new(8).profile())
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
