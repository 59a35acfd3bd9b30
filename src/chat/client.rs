//! `POST {tunnel}/api/chat` client.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ChatConfig;
use crate::gossip::TunnelUrl;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Chat agent returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Chat agent response has no message")]
    EmptyReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
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
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

/// Stateless client for one chat agent.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(base_url: &TunnelUrl, config: &ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: base_url.join("api/chat"),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, test setups).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the whole conversation; return the agent's reply.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ChatError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed.message.ok_or(ChatError::EmptyReply)
    }
}

/// A conversation: the agent is stateless, so the full history goes with
/// every request.
#[derive(Debug, Clone)]
pub struct ChatSession {
    client: ChatClient,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            history: Vec::new(),
        }
    }

    /// Ask one question. History only grows when a reply arrives.
    pub async fn ask(&mut self, prompt: &str) -> Result<&ChatMessage, ChatError> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(prompt));

        let reply = self.client.complete(&messages).await?;
        messages.push(reply);
        self.history = messages;

        self.history.last().ok_or(ChatError::EmptyReply)
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}
