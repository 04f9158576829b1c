//! Locate where a hunk's old block occurs in a possibly-drifted buffer.

use regex::Regex;
use std::sync::LazyLock;

use crate::parser::HunkBlocks;

static WS_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("Invalid whitespace regex"));

/// Collapse runs of spaces/tabs to a single space and trim the ends.
fn normalize_ws(s: &str) -> String {
    WS_RUN_REGEX.replace_all(s, " ").trim().to_string()
}

/// Find the byte offset at which to apply a hunk, or `None` if unlocatable.
///
/// Matching strategies in strict priority order, returning on first success:
///
/// 1. Exact substring match of the old block.
/// 2. Whitespace-normalized match. The real offset is recovered by re-finding
///    the needle's *first raw line* in the untouched buffer — an approximation
///    that can pick a wrong occurrence when that line repeats elsewhere.
/// 3. Context-before anchoring: find the context window verbatim, then search
///    for the old block only in the remainder after it. Handles drift where
///    text before the hunk changed but the target did not.
/// 4. Context-after anchoring, symmetric: find the trailing context, then take
///    the last occurrence of the old block before it.
///
/// The ordering keeps matches deterministic and always prefers exact matches
/// over guesses; LLM-produced diffs frequently carry slightly stale context,
/// so the fallbacks maximize applicability before giving up.
pub fn locate_anchor(haystack: &str, blocks: &HunkBlocks) -> Option<usize> {
    let needle = &blocks.old_block;

    // 1. Exact
    if let Some(idx) = haystack.find(needle.as_str()) {
        return Some(idx);
    }

    // 2. Whitespace-normalized
    let norm_haystack = normalize_ws(haystack);
    let norm_needle = normalize_ws(needle);
    if norm_haystack.contains(&norm_needle) {
        if let Some(first_line) = needle.split('\n').next() {
            if let Some(pos) = haystack.find(first_line) {
                return Some(pos);
            }
        }
    }

    // 3. Anchor on leading context, search forward
    if !blocks.context_before.is_empty() {
        if let Some(cb_idx) = haystack.find(blocks.context_before.as_str()) {
            let search_start = cb_idx + blocks.context_before.len();
            if let Some(rel) = haystack[search_start..].find(needle.as_str()) {
                return Some(search_start + rel);
            }
        }
    }

    // 4. Anchor on trailing context, search backward
    if !blocks.context_after.is_empty() {
        if let Some(ca_idx) = haystack.find(blocks.context_after.as_str()) {
            if let Some(idx) = haystack[..ca_idx].rfind(needle.as_str()) {
                return Some(idx);
            }
        }
    }

    None
}
