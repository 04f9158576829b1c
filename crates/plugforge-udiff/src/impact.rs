//! Estimate how much of a buffer a candidate diff would alter.

use serde::{Deserialize, Serialize};

use crate::parser::parse_unified_diff;

/// Estimated blast radius of a diff against a buffer.
///
/// `touched_lines` is `added + removed`: a changed line counts as both a
/// deletion and an addition, so replacement hunks double-count. That is
/// intentional conservatism for gating, not a bug. Percentages are not
/// clamped and can exceed 100 for many small hunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub total_lines: usize,
    pub added: usize,
    pub removed: usize,
    pub touched_lines: usize,
    pub touched_pct: f64,
    pub deleted_pct: f64,
}

/// Append-only audit record for an applied diff. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub title: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// e.g. `+3/-1, touched 4 lines (12.5%)`
    pub summary: String,
    /// The raw diff text as received.
    pub diff: String,
}

/// Count added/removed lines across all hunks of `diff_text` and express them
/// as percentages of `original`'s line count. Pure; mutates nothing.
pub fn estimate_impact(original: &str, diff_text: &str) -> ImpactReport {
    let hunks = parse_unified_diff(diff_text);
    let total_lines = original.replace("\r\n", "\n").split('\n').count();

    let mut added = 0usize;
    let mut removed = 0usize;
    for hunk in &hunks {
        for line in &hunk.lines {
            if line.starts_with('+') {
                added += 1;
            } else if line.starts_with('-') {
                removed += 1;
            }
        }
    }

    let touched_lines = added + removed;
    let (touched_pct, deleted_pct) = if total_lines > 0 {
        (
            touched_lines as f64 / total_lines as f64 * 100.0,
            removed as f64 / total_lines as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    ImpactReport {
        total_lines,
        added,
        removed,
        touched_lines,
        touched_pct,
        deleted_pct,
    }
}

/// Format an immutable changelog entry for an applied diff.
pub fn build_changelog_entry(title: &str, diff_text: &str, impact: &ImpactReport) -> ChangelogEntry {
    ChangelogEntry {
        title: title.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        summary: format!(
            "+{}/-{}, touched {} lines ({:.1}%)",
            impact.added, impact.removed, impact.touched_lines, impact.touched_pct
        ),
        diff: diff_text.to_string(),
    }
}
