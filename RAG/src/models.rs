use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single spreadsheet cell, already detached from the workbook reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Plain-text form of the cell. `Empty` renders as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// One row of the intake sheet, cells in sheet column order.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeRecord {
    pub row: usize,
    pub cells: Vec<(String, CellValue)>,
}

impl IntakeRecord {
    pub fn new(row: usize, cells: Vec<(String, CellValue)>) -> Self {
        Self { row, cells }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub row: usize,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

/// A vector ready to be written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

/// A retrieval hit: the chunk text plus whatever metadata came back with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// OpenAI-compatible wire types

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatCompletionMessage>,
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

// Pinecone-style wire types

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexList {
    #[serde(default)]
    pub indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub status: Option<IndexStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStatus {
    pub ready: bool,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateIndexRequest {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub spec: IndexSpec,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSpec {
    pub serverless: ServerlessSpec,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub vectors: Vec<UpsertVector>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    #[serde(default)]
    pub upserted_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorQueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_metadata: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorQueryResponse {
    #[serde(default)]
    pub matches: Vec<VectorMatch>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}
