use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
pub struct RagResponse {
    pub response: String,
}

#[derive(Deserialize, Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}
