//! Wire and result types for completion requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message author role. Only system and user turns are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One turn of a conversation, owned transiently per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Response payload: parsed JSON for buffered calls, accumulated text for
/// streamed ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// `choices[0].message.content` for buffered responses, the accumulated
    /// text for streamed ones. Empty string when the shape is unexpected.
    pub fn content(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Json(data) => data["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Produced once per successful call; never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    /// The model that actually answered (may differ from the preference).
    pub model: String,
    pub payload: Payload,
}

/// Request/token counters owned by the orchestrator. Single writer; read
/// after write within the same task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Completion requests attempted (one per model candidate tried).
    pub requests: u64,
    /// Most recent request-size estimate, in tokens.
    pub last_token_estimate: usize,
}

/// Cheap request-size proxy: `ceil(total characters / 4)`. Not an exact token
/// count; recorded for observability only.
pub fn estimate_tokens(messages: &[ChatMessage]) -> usize {
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    chars.div_ceil(4)
}
