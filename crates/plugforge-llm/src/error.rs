//! Error types for model invocation.

use thiserror::Error;

/// Errors that can occur while obtaining a model response.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API credential configured; fatal, raised before any network call.
    #[error("Missing API key; set it in settings or the PLUGFORGE_API_KEY environment variable")]
    MissingApiKey,

    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned a non-success status.
    #[error("Completion endpoint error {status}: {body}")]
    Api { status: u16, body: String },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Streaming transport failed mid-read.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Every model candidate was exhausted without a usable response.
    #[error("All model fallbacks failed")]
    AllFallbacksFailed,
}

impl LlmError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 401/403 — a broken credential. Retrying other models wastes calls,
    /// so the fallback sequence aborts on these.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}
