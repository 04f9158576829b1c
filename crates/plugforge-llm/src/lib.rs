//! Model access for the plugin studio.
//!
//! This crate owns everything between "the session wants a completion" and
//! "bytes on the wire": prompt construction, the transport seam, retry with
//! exponential backoff, model fallback orchestration, and incremental
//! consumption of streamed responses.
//!
//! The session layer drives [`Orchestrator::invoke_with_fallback`] with
//! messages built by [`prompts`]; everything else here is plumbing in service
//! of that call.

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod prompts;
pub mod retry;
pub mod streaming;
pub mod transport;
pub mod types;

pub use error::LlmError;
pub use orchestrator::{Orchestrator, AUTO_MODEL, FALLBACK_MODELS};
pub use plan::{TestPlan, TestPlanResult};
pub use retry::{with_backoff, RetryPolicy};
pub use streaming::{read_stream, StreamOutcome};
pub use transport::{ChatRequest, ChatResponse, ChatTransport, HttpTransport};
pub use types::{estimate_tokens, ChatMessage, InvocationResult, Payload, Role, UsageStats};
