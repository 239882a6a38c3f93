use crate::embedding_service::Embedder;
use crate::models::*;
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Similarity search over the whole populated index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let chunks = self.store.query(&query_embedding, self.top_k).await?;

        log::info!("Found {} relevant chunks in {}", chunks.len(), self.store.name());
        Ok(chunks)
    }
}
