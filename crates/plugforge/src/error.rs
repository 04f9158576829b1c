//! Session-level error type.

use plugforge_llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("no plugin description provided")]
    EmptyDescription,

    #[error("editor buffer is empty")]
    EmptyBuffer,

    #[error("no patch to apply")]
    EmptyPatch,

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// State persistence failed (settings or state file writes).
    #[error(transparent)]
    State(#[from] anyhow::Error),
}
