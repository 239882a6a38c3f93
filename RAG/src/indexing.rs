use crate::chunker::TextChunker;
use crate::document_processor::DocumentProcessor;
use crate::embedding_service::Embedder;
use crate::error::ConfigError;
use crate::models::*;
use crate::retriever::Retriever;
use crate::vector_store::{stored_vector, VectorStore};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub batches: usize,
}

/// One-shot startup job: spreadsheet -> documents -> chunks -> index.
pub struct IndexingPipeline {
    processor: DocumentProcessor,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    spreadsheet_path: PathBuf,
    sheet_name: String,
    batch_size: usize,
    batch_retries: usize,
}

impl IndexingPipeline {
    pub fn new(
        processor: DocumentProcessor,
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        spreadsheet_path: impl Into<PathBuf>,
        sheet_name: &str,
    ) -> Self {
        Self {
            processor,
            chunker,
            embedder,
            store,
            spreadsheet_path: spreadsheet_path.into(),
            sheet_name: sheet_name.to_string(),
            batch_size: 100,
            batch_retries: 0,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, batch_retries: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        self.batch_size = batch_size;
        self.batch_retries = batch_retries;
        Ok(self)
    }

    /// Builds the whole index and hands back a retriever bound to it.
    ///
    /// Any failure aborts the run; a partially written index is never
    /// handed out.
    pub async fn run(&self, top_k: usize) -> Result<(Retriever, IndexReport)> {
        log::info!("Starting intake indexing into {}", self.store.name());

        self.store
            .ensure_index()
            .await
            .context("failed to prepare the vector index")?;

        let processor = self.processor.clone();
        let path = self.spreadsheet_path.clone();
        let sheet = self.sheet_name.clone();
        let documents = tokio::task::spawn_blocking(move || processor.process_spreadsheet(&path, &sheet))
            .await
            .context("spreadsheet reader panicked")??;

        let chunks = self.chunker.chunk_documents(&documents);
        let batches = self.index_chunks(&chunks).await?;

        let report = IndexReport {
            documents: documents.len(),
            chunks: chunks.len(),
            batches,
        };
        log::info!(
            "Indexing complete: {} documents, {} chunks, {} batches",
            report.documents,
            report.chunks,
            report.batches
        );

        let retriever = Retriever::new(self.embedder.clone(), self.store.clone(), top_k);
        Ok((retriever, report))
    }

    /// Submits chunks batch by batch, in order. Returns the number of batches.
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let total = chunks.len().div_ceil(self.batch_size);

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            self.submit_with_retry(batch_index, batch)
                .await
                .with_context(|| format!("batch {} of {} was rejected", batch_index + 1, total))?;
            log::info!("Indexed batch {}/{} ({} chunks)", batch_index + 1, total, batch.len());
        }

        Ok(total)
    }

    async fn submit_with_retry(&self, batch_index: usize, batch: &[DocumentChunk]) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.submit_batch(batch).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.batch_retries => {
                    attempt += 1;
                    log::warn!(
                        "Batch {} failed ({}), retry {}/{}",
                        batch_index + 1,
                        e,
                        attempt,
                        self.batch_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn submit_batch(&self, batch: &[DocumentChunk]) -> Result<()> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(anyhow::anyhow!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            ));
        }

        let vectors = batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| stored_vector(chunk, values))
            .collect();
        self.store.upsert(vectors).await?;
        Ok(())
    }
}
