//! Model fallback orchestration: obtain a usable response despite individual
//! model or transient failures.

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;
use crate::retry::{with_backoff, RetryPolicy};
use crate::streaming::read_stream;
use crate::transport::{ChatRequest, ChatResponse, ChatTransport};
use crate::types::{estimate_tokens, ChatMessage, InvocationResult, Payload, UsageStats};

/// Fixed model precedence. A caller preference, if any, is moved to the front.
pub const FALLBACK_MODELS: [&str; 4] =
    ["gpt-5-mini", "gpt-5-chat-latest", "gpt-4o", "gpt-4o-mini"];

/// Sentinel preference meaning "use the fixed list as-is".
pub const AUTO_MODEL: &str = "auto";

/// Pause between model candidates after a failure, to avoid hammering the
/// endpoint in a tight loop.
const CANDIDATE_PAUSE_MS: u64 = 200;

/// Per-model retry budget.
const PER_MODEL_RETRIES: u32 = 2;

/// Per-token observer for streamed responses. Runs inline on the read loop;
/// must not block.
pub type TokenObserver<'a> = &'a mut (dyn FnMut(&str) + Send);

/// One orchestrator per session. Owns its counters and transport reference —
/// no module-level state.
pub struct Orchestrator {
    transport: Arc<dyn ChatTransport>,
    retry: RetryPolicy,
    stats: UsageStats,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            retry: RetryPolicy {
                max_retries: PER_MODEL_RETRIES,
                base_delay_ms: 500,
            },
            stats: UsageStats::default(),
        }
    }

    /// Override the per-model retry policy (tests use short delays).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Request/token counters. Read-after-write within the session task.
    pub fn stats(&self) -> UsageStats {
        self.stats
    }

    /// Candidate order for one invocation. A preference that is set and not
    /// the `auto` sentinel goes first, deduplicated against the fixed list;
    /// the remainder keeps fixed-list order.
    pub fn resolve_model_order(&self, preference: Option<&str>) -> Vec<String> {
        match preference {
            Some(preferred) if !preferred.is_empty() && preferred != AUTO_MODEL => {
                let mut order = vec![preferred.to_string()];
                order.extend(
                    FALLBACK_MODELS
                        .iter()
                        .filter(|m| **m != preferred)
                        .map(|m| m.to_string()),
                );
                order
            }
            _ => FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Issue one completion request against one model.
    ///
    /// If the service rejects the request with a 400 while JSON mode was
    /// requested, the same model is retried exactly once without JSON mode —
    /// an explicit two-step, the only automatic parameter-stripping fallback.
    /// Any other non-success status surfaces as [`LlmError::Api`].
    pub async fn invoke_once(
        &self,
        model: &str,
        messages: &[ChatMessage],
        json_mode: bool,
        stream: bool,
    ) -> Result<ChatResponse, LlmError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            stream,
            json_mode,
        };
        match self.transport.send(&request).await {
            Err(LlmError::Api { status: 400, .. }) if json_mode => {
                tracing::debug!(model, "JSON mode rejected (400); retrying once without it");
                let stripped = ChatRequest {
                    json_mode: false,
                    ..request
                };
                self.transport.send(&stripped).await
            }
            other => other,
        }
    }

    /// Iterate the resolved model order until one candidate yields a response.
    ///
    /// Each candidate gets the per-model retry budget. A 401/403 aborts the
    /// whole sequence immediately — a broken credential is not model-specific.
    /// Any other failure advances to the next candidate after a short pause.
    /// When every candidate is exhausted the last error is raised.
    ///
    /// Streaming is selected by passing a token observer; fragments are
    /// delivered to it as they arrive and the accumulated text becomes the
    /// result payload.
    pub async fn invoke_with_fallback(
        &mut self,
        preference: Option<&str>,
        messages: &[ChatMessage],
        want_json: bool,
        mut on_token: Option<TokenObserver<'_>>,
    ) -> Result<InvocationResult, LlmError> {
        let stream = on_token.is_some();
        let mut last_err: Option<LlmError> = None;

        for model in self.resolve_model_order(preference) {
            self.stats.requests += 1;
            self.stats.last_token_estimate = estimate_tokens(messages);

            let attempt = with_backoff(
                &self.retry,
                |err: &LlmError, attempt, delay_ms| {
                    tracing::warn!(
                        model = %model,
                        %err,
                        attempt,
                        delay_ms,
                        "completion attempt failed; backing off"
                    );
                },
                || self.invoke_once(&model, messages, want_json, stream),
            )
            .await;

            let failure = match attempt {
                Ok(ChatResponse::Json(data)) => {
                    return Ok(InvocationResult {
                        model,
                        payload: Payload::Json(data),
                    });
                }
                Ok(ChatResponse::Stream(body)) => {
                    let drained = match &mut on_token {
                        Some(observer) => read_stream(body, |t: &str| observer(t)).await,
                        None => read_stream(body, |_| {}).await,
                    };
                    match drained {
                        Ok(outcome) => {
                            if outcome.skipped_frames > 0 {
                                tracing::warn!(
                                    model = %model,
                                    skipped = outcome.skipped_frames,
                                    "stream contained malformed frames"
                                );
                            }
                            return Ok(InvocationResult {
                                model,
                                payload: Payload::Text(outcome.text),
                            });
                        }
                        Err(err) => err,
                    }
                }
                Err(err) => err,
            };

            if failure.is_auth() {
                tracing::error!(model = %model, "authentication failure; aborting fallback sequence");
                return Err(failure);
            }
            tracing::warn!(model = %model, err = %failure, "model failed; trying next candidate");
            last_err = Some(failure);
            tokio::time::sleep(Duration::from_millis(CANDIDATE_PAUSE_MS)).await;
        }

        Err(last_err.unwrap_or(LlmError::AllFallbacksFailed))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("retry", &self.retry)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
