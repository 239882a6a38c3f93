use crate::models::*;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Text generation conditioned on a fully built prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl ChatService {
    pub fn new(api_key: &str, base_url: &str, model: &str, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl Generator for ChatService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow::anyhow!("Chat API error ({}): {}", status, error_text));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        let answer = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_else(|| "No response generated".to_string());

        Ok(answer)
    }
}
