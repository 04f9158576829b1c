//! Transport seam between the orchestrator and the completion endpoint.
//!
//! The orchestrator only ever talks to a [`ChatTransport`]; production uses
//! [`HttpTransport`] (reqwest, bearer auth), tests inject scripted fakes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::types::ChatMessage;

/// Default chat-completions endpoint.
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// One completion request as handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    /// Request `response_format: {type: "json_object"}`.
    pub json_mode: bool,
}

impl ChatRequest {
    /// JSON body for the POST. `response_format` is included only when
    /// structured output is requested.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
            "stream": self.stream,
        });
        if self.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

/// A transport-level response: a parsed JSON body, or a byte stream of SSE
/// frames for streaming requests.
pub enum ChatResponse {
    Json(Value),
    Stream(BoxStream<'static, Result<Bytes, LlmError>>),
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatResponse::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ChatResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Issues one completion request. Implementations map non-success statuses to
/// [`LlmError::Api`] with the raw response body attached.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Production transport: POSTs to an OpenAI-compatible chat-completions
/// endpoint with bearer authentication.
pub struct HttpTransport {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport. Fails with [`LlmError::MissingApiKey`] when the
    /// credential is absent — before any network call.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    /// Create a transport against a custom endpoint (self-hosted gateways).
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_key,
            endpoint: endpoint.into(),
        })
    }

    fn build_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| LlmError::MissingApiKey)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .headers(self.build_headers()?)
            .json(&request.to_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if request.stream {
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(LlmError::Http))
                .boxed();
            Ok(ChatResponse::Stream(stream))
        } else {
            let data: Value = response.json().await?;
            tracing::debug!(
                model = %request.model,
                usage = ?data.get("usage"),
                id = ?data.get("id"),
                "completion response"
            );
            Ok(ChatResponse::Json(data))
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
