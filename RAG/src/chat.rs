use crate::models::*;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

/// Backend the chat session forwards questions to.
///
/// `Err` means the call itself failed (connection refused, unreadable body).
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn ask(&self, query: &str) -> Result<String>;
}

pub struct HttpQueryClient {
    client: Client,
    base_url: String,
}

impl HttpQueryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn ask(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let body: Value = response.json().await?;
        Ok(reply_from_body(&body))
    }
}

fn reply_from_body(body: &Value) -> String {
    if let Some(answer) = body.get("response").and_then(Value::as_str) {
        return answer.to_string();
    }
    match body.get("error").and_then(Value::as_str) {
        Some(error) => format!("Error: {}", error),
        None => FALLBACK_REPLY.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// Append-only history of one chat session.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.history.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Active
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Runs one turn: records and renders the user message, asks the
    /// backend, then records and renders the reply. Blank input is ignored.
    pub async fn submit<C, R>(&mut self, client: &C, input: &str, mut render: R) -> Option<&ChatMessage>
    where
        C: QueryClient + ?Sized,
        R: FnMut(&ChatMessage),
    {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        self.push(ChatMessage::user(input), &mut render);

        let reply = match client.ask(input).await {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("query failed: {}", e);
                format!("Error: {}", e)
            }
        };

        self.push(ChatMessage::assistant(reply), &mut render);
        self.history.last()
    }

    fn push<R: FnMut(&ChatMessage)>(&mut self, message: ChatMessage, render: &mut R) {
        render(&message);
        self.history.push(message);
    }
}
