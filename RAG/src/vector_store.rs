use crate::models::*;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::RwLock;

/// Metadata key the chunk text travels under.
/// Reserved so it cannot clash with a spreadsheet column.
pub const TEXT_KEY: &str = "_chunk_text";

const API_VERSION: &str = "2024-07";

/// Index that stores embedded chunks and answers similarity queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the index when it does not exist yet.
    async fn ensure_index(&self) -> Result<()>;

    /// Writes the vectors, replacing any with the same id. Returns the count written.
    async fn upsert(&self, vectors: Vec<StoredVector>) -> Result<usize>;

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    fn name(&self) -> &str;
}

/// Serverless index reached through a Pinecone-style REST API.
pub struct PineconeStore {
    client: Client,
    api_key: String,
    controller_url: String,
    index_name: String,
    dimension: usize,
    cloud: String,
    region: String,
    host: OnceLock<String>,
    poll_interval: Duration,
    max_polls: usize,
}

impl PineconeStore {
    pub fn new(
        api_key: &str,
        controller_url: &str,
        index_name: &str,
        dimension: usize,
        cloud: &str,
        region: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            controller_url: controller_url.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
            dimension,
            cloud: cloud.to_string(),
            region: region.to_string(),
            host: OnceLock::new(),
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn data_url(&self, route: &str) -> Result<String> {
        let host = self
            .host
            .get()
            .ok_or_else(|| anyhow::anyhow!("index host unknown, ensure_index has not completed"))?;
        Ok(format!("{}/{}", host, route))
    }

    async fn list_indexes(&self) -> Result<IndexList> {
        let response = self
            .authed(self.client.get(format!("{}/indexes", self.controller_url)))
            .send()
            .await?;
        Ok(check(response, "list indexes").await?.json().await?)
    }

    async fn create_index(&self) -> Result<()> {
        let request = CreateIndexRequest {
            name: self.index_name.clone(),
            dimension: self.dimension,
            metric: "cosine".to_string(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: self.cloud.clone(),
                    region: self.region.clone(),
                },
            },
        };

        let response = self
            .authed(self.client.post(format!("{}/indexes", self.controller_url)))
            .json(&request)
            .send()
            .await?;
        check(response, "create index").await?;

        log::info!(
            "Created index {} ({} dims, cosine, {}/{})",
            self.index_name,
            self.dimension,
            self.cloud,
            self.region
        );
        Ok(())
    }

    async fn describe_index(&self) -> Result<IndexDescription> {
        let response = self
            .authed(self.client.get(format!(
                "{}/indexes/{}",
                self.controller_url, self.index_name
            )))
            .send()
            .await?;
        Ok(check(response, "describe index").await?.json().await?)
    }

    async fn wait_until_ready(&self) -> Result<String> {
        for attempt in 1..=self.max_polls {
            let description = self.describe_index().await?;
            let ready = description.status.as_ref().map(|s| s.ready).unwrap_or(false);

            match description.host {
                Some(host) if ready => return Ok(host),
                _ => {
                    log::info!(
                        "Waiting for index {} to become ready ({}/{})",
                        self.index_name,
                        attempt,
                        self.max_polls
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        Err(anyhow::anyhow!(
            "index {} did not become ready after {} checks",
            self.index_name,
            self.max_polls
        ))
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_index(&self) -> Result<()> {
        let existing = self.list_indexes().await?;
        if !existing.indexes.iter().any(|i| i.name == self.index_name) {
            self.create_index().await?;
        }

        let host = self.wait_until_ready().await?;
        let host = if host.contains("://") {
            host
        } else {
            format!("https://{}", host)
        };
        log::info!("Index {} is ready at {}", self.index_name, host);

        // A second call keeps the host from the first one.
        let _ = self.host.set(host.trim_end_matches('/').to_string());
        Ok(())
    }

    async fn upsert(&self, vectors: Vec<StoredVector>) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: vectors
                .into_iter()
                .map(|v| UpsertVector {
                    id: v.id,
                    values: v.values,
                    metadata: v.metadata,
                })
                .collect(),
        };

        let response = self
            .authed(self.client.post(self.data_url("vectors/upsert")?))
            .json(&request)
            .send()
            .await?;
        let body: UpsertResponse = check(response, "upsert").await?.json().await?;
        Ok(body.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let request = VectorQueryRequest {
            vector: vector.to_vec(),
            top_k,
            include_metadata: true,
        };

        let response = self
            .authed(self.client.post(self.data_url("query")?))
            .json(&request)
            .send()
            .await?;
        let body: VectorQueryResponse = check(response, "query").await?.json().await?;

        Ok(body.matches.into_iter().map(scored_from_match).collect())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!(
        "Vector store {} failed ({}): {}",
        action,
        status,
        error_text
    ))
}

fn scored_from_match(m: VectorMatch) -> ScoredChunk {
    let mut metadata: BTreeMap<String, String> = m
        .metadata
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, value)
        })
        .collect();
    let content = metadata.remove(TEXT_KEY).unwrap_or_default();

    ScoredChunk {
        id: m.id,
        score: m.score,
        content,
        metadata,
    }
}

/// Process-local store for development runs and tests.
#[derive(Default)]
pub struct InMemoryStore {
    vectors: RwLock<Vec<StoredVector>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, vectors: Vec<StoredVector>) -> Result<usize> {
        let count = vectors.len();
        let mut stored = self.vectors.write().await;
        for vector in vectors {
            match stored.iter_mut().find(|v| v.id == vector.id) {
                Some(existing) => *existing = vector,
                None => stored.push(vector),
            }
        }
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.vectors.read().await;
        let mut scored: Vec<(&StoredVector, f32)> = stored
            .iter()
            .map(|v| (v, calculate_similarity(vector, &v.values)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(v, score)| {
                let mut metadata = v.metadata.clone();
                let content = metadata.remove(TEXT_KEY).unwrap_or_default();
                ScoredChunk {
                    id: v.id.clone(),
                    score,
                    content,
                    metadata,
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

pub fn calculate_similarity(embedding1: &[f32], embedding2: &[f32]) -> f32 {
    let min_len = embedding1.len().min(embedding2.len());

    let dot_product: f32 = embedding1[..min_len]
        .iter()
        .zip(embedding2[..min_len].iter())
        .map(|(a, b)| a * b)
        .sum();

    let norm1: f32 = embedding1[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm2: f32 = embedding2[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm1 == 0.0 || norm2 == 0.0 {
        0.0
    } else {
        dot_product / (norm1 * norm2)
    }
}

/// Helper for building a stored vector from a chunk and its embedding.
pub fn stored_vector(chunk: &DocumentChunk, values: Vec<f32>) -> StoredVector {
    let mut metadata = chunk.metadata.clone();
    metadata.insert(TEXT_KEY.to_string(), chunk.content.clone());
    StoredVector {
        id: chunk.id.clone(),
        values,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vector(id: &str, values: Vec<f32>, text: &str) -> StoredVector {
        let mut metadata = BTreeMap::new();
        metadata.insert(TEXT_KEY.to_string(), text.to_string());
        metadata.insert("q1".to_string(), "Alice".to_string());
        StoredVector {
            id: id.to_string(),
            values,
            metadata,
        }
    }

    fn store(server: &MockServer) -> PineconeStore {
        PineconeStore::new("pc-test", &server.uri(), "intake", 2, "aws", "us-east-1")
            .with_polling(Duration::from_millis(1), 3)
    }

    #[test]
    fn similarity_of_identical_and_orthogonal_vectors() {
        assert!((calculate_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert_eq!(calculate_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(calculate_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn memory_store_ranks_by_cosine() {
        let store = InMemoryStore::new();
        store
            .upsert(vec![
                vector("a", vec![1.0, 0.0], "about apples"),
                vector("b", vec![0.0, 1.0], "about bananas"),
                vector("c", vec![0.7, 0.7], "about both"),
            ])
            .await
            .unwrap();

        let hits = store.query(&[0.0, 1.0], 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[0].content, "about bananas");
        assert!(!hits[0].metadata.contains_key(TEXT_KEY));
        assert_eq!(hits[1].id, "c");
    }

    #[tokio::test]
    async fn column_named_text_keeps_its_value() {
        let mut metadata = BTreeMap::new();
        metadata.insert("text".to_string(), "free-form notes".to_string());
        let chunk = DocumentChunk {
            id: "row-0".to_string(),
            content: "Notes: free-form notes".to_string(),
            metadata,
        };

        let store = InMemoryStore::new();
        store.upsert(vec![stored_vector(&chunk, vec![1.0, 0.0])]).await.unwrap();
        let hits = store.query(&[1.0, 0.0], 1).await.unwrap();

        assert_eq!(hits[0].content, "Notes: free-form notes");
        assert_eq!(hits[0].metadata["text"], "free-form notes");
        assert!(!hits[0].metadata.contains_key(TEXT_KEY));
    }

    #[tokio::test]
    async fn memory_store_upsert_replaces_same_id() {
        let store = InMemoryStore::new();
        store.upsert(vec![vector("a", vec![1.0, 0.0], "old")]).await.unwrap();
        store.upsert(vec![vector("a", vec![1.0, 0.0], "new")]).await.unwrap();

        let hits = store.query(&[1.0, 0.0], 4).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "new");
    }

    #[tokio::test]
    async fn creates_missing_index_and_waits_for_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .and(header("Api-Key", "pc-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"indexes": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_partial_json(json!({
                "name": "intake",
                "dimension": 2,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "intake"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "intake",
                "host": server.uri(),
                "status": {"ready": true, "state": "Ready"}
            })))
            .mount(&server)
            .await;

        let store = store(&server);
        store.ensure_index().await.unwrap();

        assert_eq!(store.data_url("query").unwrap(), format!("{}/query", server.uri()));
    }

    #[tokio::test]
    async fn existing_index_is_not_recreated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{"name": "intake"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "intake",
                "host": server.uri(),
                "status": {"ready": true}
            })))
            .mount(&server)
            .await;

        store(&server).ensure_index().await.unwrap();
    }

    #[tokio::test]
    async fn index_that_never_becomes_ready_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{"name": "intake"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "intake",
                "status": {"ready": false, "state": "Initializing"}
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = store(&server).ensure_index().await.unwrap_err();
        assert!(err.to_string().contains("did not become ready"));
    }

    #[tokio::test]
    async fn upsert_before_ensure_index_fails() {
        let server = MockServer::start().await;
        let err = store(&server)
            .upsert(vec![vector("a", vec![1.0, 0.0], "x")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ensure_index"));
    }

    #[tokio::test]
    async fn upsert_and_query_round_trip_through_data_plane() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{"name": "intake"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "intake",
                "host": server.uri(),
                "status": {"ready": true}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_partial_json(json!({
                "vectors": [{"id": "a", "values": [1.0, 0.0], "metadata": {"_chunk_text": "chunk", "q1": "Alice"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({"topK": 4, "includeMetadata": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "a", "score": 0.92, "metadata": {"_chunk_text": "chunk", "q1": "Alice", "text": "notes", "n": 3}}
                ]
            })))
            .mount(&server)
            .await;

        let store = store(&server);
        store.ensure_index().await.unwrap();

        let written = store.upsert(vec![vector("a", vec![1.0, 0.0], "chunk")]).await.unwrap();
        assert_eq!(written, 1);

        let hits = store.query(&[1.0, 0.0], 4).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "chunk");
        assert_eq!(hits[0].metadata["q1"], "Alice");
        assert_eq!(hits[0].metadata["n"], "3");
        assert_eq!(hits[0].metadata["text"], "notes");
    }

    #[tokio::test]
    async fn rejected_upsert_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{"name": "intake"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "intake",
                "host": server.uri(),
                "status": {"ready": true}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(400).set_body_string("dimension mismatch"))
            .mount(&server)
            .await;

        let store = store(&server);
        store.ensure_index().await.unwrap();
        let err = store
            .upsert(vec![vector("a", vec![1.0, 0.0], "chunk")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }
}
