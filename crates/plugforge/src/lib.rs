//! LLM-assisted authoring studio for game-server plugins.
//!
//! This is the session layer tying the infrastructure crates together:
//! - [`plugforge_llm`] — prompts, model fallback, streaming
//! - [`plugforge_udiff`] — diff parsing, impact estimation, conservative apply
//! - [`plugforge_validate`] — plugin heuristics and fragment scoping
//! - [`plugforge_settings`] — configuration and persisted state
//!
//! The [`Studio`] owns one editor buffer and runs the five operations
//! (generate, refine, create-patch, suggest-tests, explain) against it. Model
//! output is always verified before it can touch the buffer, and patches
//! above the impact limits need explicit confirmation.

pub mod error;
pub mod studio;

pub use error::StudioError;
pub use studio::{
    ApplyRequest, Explanation, GenerateOutcome, PatchApplication, PatchProposal, ProposalOutcome,
    Studio, TestOutcome,
};

// Re-export the pieces callers need to drive a session.
pub use plugforge_llm::{ChatTransport, TestPlan, UsageStats};
pub use plugforge_settings::{Framework, PluginMeta, StateStore, StudioSettings};
pub use plugforge_udiff::{ImpactReport, ManualHunk};
pub use plugforge_validate::{Finding, Level};
