//! External language model boundary.
//!
//! The model is an untrusted, possibly-absent collaborator behind an
//! OpenAI-compatible chat endpoint. Everything above this layer deals in
//! prompt/response strings; parsing and validation live with the caller.

use crate::error::{FloatChatError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Request/response seam to the external model. Implemented by the HTTP
/// client in production and by in-memory fakes in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

pub struct HttpChatBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpChatBackend {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FloatChatError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url,
            model,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.1,
            "max_tokens": 1000
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| FloatChatError::Llm(format!("LLM API call failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FloatChatError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| FloatChatError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}
