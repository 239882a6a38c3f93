pub mod chat;
pub mod chunker;
pub mod column_mapping;
pub mod config;
pub mod document_processor;
pub mod embedding_service;
pub mod error;
pub mod indexing;
pub mod llm_service;
pub mod models;
pub mod query_service;
pub mod retriever;
pub mod vector_store;

pub use chat::{ChatSession, HttpQueryClient, QueryClient, SessionState};
pub use chunker::TextChunker;
pub use column_mapping::ColumnMapping;
pub use config::{Config, VectorStoreKind};
pub use document_processor::{DocumentProcessor, NOT_AVAILABLE};
pub use embedding_service::{Embedder, EmbeddingService};
pub use error::{ConfigError, QueryError};
pub use indexing::{IndexReport, IndexingPipeline};
pub use llm_service::{ChatService, Generator};
pub use models::*;
pub use query_service::{QaHandle, QueryService};
pub use retriever::Retriever;
pub use vector_store::{InMemoryStore, PineconeStore, VectorStore};
