//! Apply parsed hunks to a text buffer, deferring unlocatable ones.

use crate::locator::locate_anchor;
use crate::parser::{hunk_to_blocks, parse_unified_diff};

/// Options for [`apply_unified_diff`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// When set, anchors are still located (so `manual` is populated
    /// accurately for previews) but the buffer is never mutated.
    pub dry_run: bool,
}

/// A hunk the applier could not place automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualHunk {
    /// The `@@ ... @@` header of the deferred hunk.
    pub header: String,
    /// Human-readable reason the hunk was deferred.
    pub reason: String,
}

/// Result of applying a diff to a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// True when `result` differs from the input buffer.
    pub changed: bool,
    /// The final buffer. Equals the input on dry runs and when nothing applied.
    pub result: String,
    /// Hunks deferred for a human to resolve, in diff order.
    pub manual: Vec<ManualHunk>,
}

/// Apply a unified diff to `original`, hunk by hunk, left to right.
///
/// Each hunk is located against the *current accumulating buffer*, so earlier
/// hunks' effects are visible to later hunks' searches. An unlocatable hunk is
/// recorded in `manual` and skipped; it never aborts the patch and never
/// touches the buffer. A hunk is never applied partially: either the whole
/// old-block → new-block splice happens at the located offset, or nothing does.
pub fn apply_unified_diff(original: &str, diff_text: &str, opts: ApplyOptions) -> ApplyOutcome {
    let hunks = parse_unified_diff(diff_text);
    let mut text = original.to_string();
    let mut manual = Vec::new();

    for hunk in &hunks {
        let blocks = hunk_to_blocks(hunk);
        let Some(idx) = locate_anchor(&text, &blocks) else {
            manual.push(ManualHunk {
                header: hunk.header.clone(),
                reason: "Context not found; needs manual merge".to_string(),
            });
            continue;
        };
        if !opts.dry_run {
            let end = splice_end(&text, idx, blocks.old_block.len());
            text.replace_range(idx..end, &blocks.new_block);
        }
    }

    let changed = text != original;
    ApplyOutcome {
        changed,
        result: text,
        manual,
    }
}

/// End of the splice range for an old block located at `start`.
///
/// Exact matches always span `start + old_len` precisely. Fuzzy anchors
/// recover an approximate offset, so the raw old block can run past the end
/// of the buffer (whitespace the normalization collapsed) or land inside a
/// multi-byte character. Clamp to the buffer and round up to the next char
/// boundary so the splice stays valid.
fn splice_end(text: &str, start: usize, old_len: usize) -> usize {
    let mut end = (start + old_len).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    end
}
