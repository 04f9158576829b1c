//! Unified diff parsing and conservative patching for LLM-produced diffs.
//!
//! This crate turns a model's free-form unified-diff output into a verifiable,
//! minimally invasive transformation of an existing text buffer. The guiding
//! rule is that user code is never silently deleted or truncated: a hunk either
//! applies whole at a located anchor, or it is deferred to a manual-merge list
//! and the buffer is left alone.
//!
//! # Architecture
//!
//! This is a **Layer 2 (Infrastructure)** crate:
//! - Depends on: serde, chrono, regex only
//! - Used by: plugforge (session layer)
//!
//! # Usage
//!
//! ```rust,ignore
//! use plugforge_udiff::{apply_unified_diff, estimate_impact, ApplyOptions};
//!
//! let impact = estimate_impact(&buffer, &diff);
//! if impact.touched_pct > 20.0 || impact.deleted_pct > 10.0 {
//!     // ask the user before applying
//! }
//!
//! let outcome = apply_unified_diff(&buffer, &diff, ApplyOptions::default());
//! for hunk in &outcome.manual {
//!     // surface "needs manual merge" entries to the user
//! }
//! ```

mod applier;
mod impact;
mod locator;
mod parser;

pub use applier::{apply_unified_diff, ApplyOptions, ApplyOutcome, ManualHunk};
pub use impact::{build_changelog_entry, estimate_impact, ChangelogEntry, ImpactReport};
pub use locator::locate_anchor;
pub use parser::{hunk_to_blocks, looks_like_diff, parse_unified_diff, DiffHunk, HunkBlocks};
