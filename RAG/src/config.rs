use crate::error::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStoreKind {
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    pub controller_url: String,
    pub cloud: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub vector_store: VectorStoreKind,
    pub pinecone: Option<PineconeConfig>,
    pub spreadsheet_path: PathBuf,
    pub sheet_name: String,
    pub column_mapping_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub batch_retries: usize,
    pub top_k: usize,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be exercised
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup: &lookup };

        let vector_store = match vars.or("VECTOR_STORE", "pinecone").as_str() {
            "pinecone" => VectorStoreKind::Pinecone,
            "memory" => VectorStoreKind::Memory,
            other => {
                return Err(ConfigError::InvalidVar {
                    name: "VECTOR_STORE",
                    value: other.to_string(),
                })
            }
        };

        let pinecone = match vector_store {
            VectorStoreKind::Pinecone => Some(PineconeConfig {
                api_key: vars.required("PINECONE_API_KEY")?,
                index_name: vars.required("PINECONE_INDEX")?,
                controller_url: vars.or("PINECONE_CONTROLLER_URL", "https://api.pinecone.io"),
                cloud: vars.or("PINECONE_CLOUD", "aws"),
                region: vars.or("PINECONE_REGION", "us-east-1"),
            }),
            VectorStoreKind::Memory => None,
        };

        let config = Self {
            openai_api_key: vars.required("OPENAI_API_KEY")?,
            openai_base_url: vars.or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            embedding_model: vars.or("EMBEDDING_MODEL", "text-embedding-ada-002"),
            embedding_dimension: vars.parsed("EMBEDDING_DIMENSION", 1536)?,
            chat_model: vars.or("CHAT_MODEL", "gpt-3.5-turbo"),
            chat_temperature: vars.parsed("CHAT_TEMPERATURE", 0.0)?,
            vector_store,
            pinecone,
            spreadsheet_path: vars.or("INTAKE_SPREADSHEET", "source_excel.xlsx").into(),
            sheet_name: vars.or("INTAKE_SHEET", "Intake"),
            column_mapping_path: vars.or("COLUMN_MAPPING_PATH", "column_mapping.json").into(),
            chunk_size: vars.parsed("CHUNK_SIZE", 1000)?,
            chunk_overlap: vars.parsed("CHUNK_OVERLAP", 100)?,
            batch_size: vars.parsed("BATCH_SIZE", 100)?,
            batch_retries: vars.parsed("BATCH_RETRIES", 0)?,
            top_k: vars.parsed("RETRIEVER_TOP_K", 4)?,
            bind_addr: vars.parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
        };

        if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::InvalidChunking {
                size: config.chunk_size,
                overlap: config.chunk_overlap,
            });
        }
        if config.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }

        Ok(config)
    }
}

/// Base URL the chat client talks to.
pub fn chat_backend_url() -> String {
    env::var("CHAT_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string())
}

struct Vars<'a, F> {
    lookup: &'a F,
}

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::MissingVar(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name,
                value: raw,
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn memory_store_needs_only_openai_key() {
        let config =
            Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test"), ("VECTOR_STORE", "memory")]))
                .unwrap();

        assert_eq!(config.vector_store, VectorStoreKind::Memory);
        assert!(config.pinecone.is_none());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.sheet_name, "Intake");
        assert_eq!(config.bind_addr.port(), 8000);
    }

    #[test]
    fn pinecone_requires_key_and_index() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("PINECONE_API_KEY"));

        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("PINECONE_INDEX", "intake"),
        ]))
        .unwrap();
        let pinecone = config.pinecone.unwrap();
        assert_eq!(pinecone.index_name, "intake");
        assert_eq!(pinecone.region, "us-east-1");
    }

    #[test]
    fn missing_openai_key_is_fatal() {
        let err = Config::from_lookup(lookup(&[("VECTOR_STORE", "memory")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("OPENAI_API_KEY"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("VECTOR_STORE", "memory"),
            ("CHUNK_SIZE", "100"),
            ("CHUNK_OVERLAP", "100"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidChunking { size: 100, overlap: 100 });
    }

    #[test]
    fn unparseable_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("VECTOR_STORE", "memory"),
            ("BATCH_SIZE", "lots"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidVar {
                name: "BATCH_SIZE",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn unknown_vector_store_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("VECTOR_STORE", "faiss"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "VECTOR_STORE", .. }));
    }
}
