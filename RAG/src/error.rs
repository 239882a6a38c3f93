use thiserror::Error;

/// Problems with the startup configuration. All of them are fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidChunking { size: usize, overlap: usize },
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

/// Failures a caller of the query path has to tell apart.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("the intake index is still being built, try again shortly")]
    NotReady,
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("upstream service failed: {0}")]
    Upstream(#[from] anyhow::Error),
}
