//! Heuristic validation for C# game-server plugins.
//!
//! Regex-level checks only; there is no C# parser here. The findings feed two
//! consumers: the session's validation report, and the uncertain-fragment
//! builder that scopes model prompts to the code neighborhoods that look
//! suspect.
//!
//! # Architecture
//!
//! This is a **Layer 2 (Infrastructure)** crate:
//! - Depends on: plugforge-settings (framework enum) and external crates
//! - Used by: plugforge (session layer)

pub mod extract;
pub mod fragments;
pub mod validators;

pub use extract::{extract_code_block, looks_like_plugin};
pub use fragments::uncertain_fragments;
pub use validators::{run_validators, Finding, Level};
