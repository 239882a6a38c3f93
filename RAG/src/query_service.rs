use crate::error::QueryError;
use crate::llm_service::Generator;
use crate::models::*;
use crate::retriever::Retriever;
use std::sync::{Arc, OnceLock};

/// Retrieval followed by generation over the retrieved chunks.
pub struct QueryService {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
}

impl QueryService {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    pub async fn answer(&self, query: &str) -> Result<String, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let start_time = std::time::Instant::now();

        let relevant_chunks = self.retriever.retrieve(query).await?;
        let context = build_context(&relevant_chunks);
        let prompt = build_prompt(query, &context);
        let answer = self.generator.generate(&prompt).await?;

        log::info!("Answered query in {} ms", start_time.elapsed().as_millis());
        Ok(answer)
    }
}

fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_prompt(query: &str, context: &str) -> String {
    format!(
        r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {query}
Helpful Answer:"#
    )
}

/// Write-once slot the indexing task publishes the query service into.
///
/// Cloning shares the slot. Until something is published every query fails
/// with [`QueryError::NotReady`].
#[derive(Clone, Default)]
pub struct QaHandle {
    inner: Arc<OnceLock<QueryService>>,
}

impl QaHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, service: QueryService) -> anyhow::Result<()> {
        self.inner
            .set(service)
            .map_err(|_| anyhow::anyhow!("query service was already published"))
    }

    pub fn is_ready(&self) -> bool {
        self.inner.get().is_some()
    }

    pub async fn ask(&self, query: &str) -> Result<String, QueryError> {
        let service = self.inner.get().ok_or(QueryError::NotReady)?;
        service.answer(query).await
    }
}
