//! HTTP text generator: an OpenAI-compatible chat completions client.
//!
//! Sends one system and one user message per prompt, non-streaming, to
//! `POST {endpoint}/chat/completions`. Works against hosted APIs and local
//! servers that speak the same protocol; the bearer token is only sent when
//! a key was found in the environment.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use docpress_core::config::GenerationConfig;
use docpress_core::contract::TextGenerator;
use docpress_core::error::GenerationError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str =
    "You are a careful blog editor. You answer with the finished Markdown post only.";

/// Environment variables checked, in order, for the API key.
pub const API_KEY_VARS: &[&str] = &["DOCPRESS_API_KEY", "OPENAI_API_KEY"];

pub struct ChatClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout: config.timeout(),
        })
    }

    /// Builds a client with the key from `DOCPRESS_API_KEY` or
    /// `OPENAI_API_KEY`, if either is set.
    pub fn new_from_env(config: &GenerationConfig) -> Result<Self> {
        let api_key = api_key_from_env();
        tracing::info!(
            endpoint = %config.endpoint,
            model = %config.model,
            api_key_set = api_key.is_some(),
            "Initialized ChatClient from environment"
        );
        Self::new(config, api_key)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::debug!(url = %self.completions_url(), model = %self.model, "Sending chat completion request");
        let mut request = self
            .client
            .post(self.completions_url())
            .json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                tracing::error!(error = ?e, "Chat completion request failed");
                GenerationError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                GenerationError::Transport(e.to_string())
            }
        })?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Chat completion endpoint returned an error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let content = parse_completion(&body)?;
        tracing::info!(chars = content.chars().count(), "Received chat completion");
        Ok(content)
    }
}

/// First non-blank value among [`API_KEY_VARS`].
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

/// Pulls `choices[0].message.content` out of a completion response body.
pub fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Transport(format!("unreadable completion response: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
