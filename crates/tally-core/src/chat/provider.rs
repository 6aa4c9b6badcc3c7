//! LLM chat provider client.

use crate::config::ChatConfig;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the chat provider call.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {0}")]
    HttpStatus(u16),

    /// Network-level error from the underlying HTTP client.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider response did not contain a completion.
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

/// One turn of the conversation passed to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_owned(), content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_owned(), content: content.into() }
    }
}

/// Turns a system prompt plus conversation into a prose completion.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ChatError>;
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatProvider {
    /// Builds the provider from config, reading the API key from the
    /// configured environment variable.
    ///
    /// Returns `Ok(None)` when chat is disabled or the key is unset — the
    /// chat endpoint then reports itself unavailable instead of failing
    /// requests mid-flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn from_config(config: &ChatConfig) -> Result<Option<Self>, ChatError> {
        if !config.enabled {
            return Ok(None);
        }
        let Ok(api_key) = std::env::var(&config.api_key_env) else {
            warn!(
                var = %config.api_key_env,
                "chat enabled but API key env var is unset, chat endpoint disabled"
            );
            return Ok(None);
        };

        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key,
        }))
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ChatError> {
        let mut payload_messages = vec![json!({ "role": "system", "content": system_prompt })];
        for message in messages {
            payload_messages.push(json!({ "role": message.role, "content": message.content }));
        }

        debug!(model = %self.model, turns = messages.len(), "requesting chat completion");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": payload_messages,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        let body: serde_json::Value = response.json().await?;
        body.pointer("/choices/0/message/content")
            .and_then(|content| content.as_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                ChatError::InvalidResponse("missing choices[0].message.content".to_owned())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_yields_no_provider() {
        let config = ChatConfig::default();
        assert!(OpenAiCompatProvider::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_enabled_without_key_yields_no_provider() {
        let config = ChatConfig {
            enabled: true,
            api_key_env: "TALLY_TEST_KEY_THAT_DOES_NOT_EXIST".to_owned(),
            ..ChatConfig::default()
        };
        assert!(OpenAiCompatProvider::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_message_constructors() {
        let message = ChatMessage::user("hello");
        assert_eq!(message.role, "user");
        assert_eq!(message.content, "hello");
        assert_eq!(ChatMessage::assistant("hi").role, "assistant");
    }
}
