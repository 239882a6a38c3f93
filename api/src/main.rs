mod chat_page;
mod query_payload;
mod rag_response;
mod routes;
mod state;

use anyhow::{Context, Result};
use intake_rag::{
    ChatService, ColumnMapping, Config, DocumentProcessor, Embedder, EmbeddingService,
    InMemoryStore, IndexingPipeline, PineconeStore, QaHandle, QueryService, TextChunker,
    VectorStore, VectorStoreKind,
};
use state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{:#}", e);
        eprintln!("Failed to start intake backend: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let mapping = ColumnMapping::load(&config.column_mapping_path)?;
    let pipeline = build_pipeline(&config, mapping)?;
    let generator = Arc::new(ChatService::new(
        &config.openai_api_key,
        &config.openai_base_url,
        &config.chat_model,
        config.chat_temperature,
    ));

    let qa = QaHandle::new();
    let state = Arc::new(AppState::new(qa.clone()));

    // Queries are answered with NotReady until this completes.
    let top_k = config.top_k;
    tokio::spawn(async move {
        match pipeline.run(top_k).await {
            Ok((retriever, _report)) => {
                if let Err(e) = qa.publish(QueryService::new(retriever, generator)) {
                    log::error!("{:#}", e);
                    std::process::exit(1);
                }
                log::info!("Indexing and QA chain setup complete.");
            }
            Err(e) => {
                log::error!("Indexing failed: {:#}", e);
                std::process::exit(1);
            }
        }
    });

    let app = routes::build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_pipeline(config: &Config, mapping: ColumnMapping) -> Result<IndexingPipeline> {
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingService::new(
        &config.openai_api_key,
        &config.openai_base_url,
        &config.embedding_model,
        config.embedding_dimension,
    ));

    let store: Arc<dyn VectorStore> = match (config.vector_store, &config.pinecone) {
        (VectorStoreKind::Pinecone, Some(pinecone)) => Arc::new(PineconeStore::new(
            &pinecone.api_key,
            &pinecone.controller_url,
            &pinecone.index_name,
            embedder.dimension(),
            &pinecone.cloud,
            &pinecone.region,
        )),
        (VectorStoreKind::Pinecone, None) => {
            anyhow::bail!("pinecone vector store selected without pinecone settings")
        }
        (VectorStoreKind::Memory, _) => Arc::new(InMemoryStore::new()),
    };

    let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap)?;
    let pipeline = IndexingPipeline::new(
        DocumentProcessor::new(mapping),
        chunker,
        embedder,
        store,
        config.spreadsheet_path.clone(),
        &config.sheet_name,
    )
    .with_batching(config.batch_size, config.batch_retries)?;

    Ok(pipeline)
}
