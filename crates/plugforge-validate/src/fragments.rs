//! Uncertain-fragment extraction for scoped prompts.
//!
//! When a session wants to keep request size down, only the neighborhoods of
//! warn/err findings are sent to the model instead of the whole buffer.

use plugforge_settings::Framework;

use crate::validators::{run_validators, Level};

/// Lines of context kept on each side of a finding.
const FRAGMENT_RADIUS: usize = 20;

/// Build snippet blocks around every warn/err finding that has a line guess.
///
/// Ranges of `line ± 20` are clamped to the buffer, merged when they overlap
/// or touch, and rendered as annotated blocks. Returns `None` when nothing
/// warrants scoping, in which case callers send the full buffer.
pub fn uncertain_fragments(code: &str, framework: Framework) -> Option<String> {
    let flagged_lines: Vec<usize> = run_validators(code, framework)
        .into_iter()
        .filter(|f| matches!(f.level, Level::Warn | Level::Err))
        .filter_map(|f| f.line)
        .collect();
    if flagged_lines.is_empty() {
        return None;
    }

    let lines: Vec<&str> = code
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .collect();

    // 1-based inclusive ranges, clamped to the buffer.
    let mut ranges: Vec<(usize, usize)> = flagged_lines
        .iter()
        .map(|&line| {
            (
                line.saturating_sub(FRAGMENT_RADIUS).max(1),
                (line + FRAGMENT_RADIUS).min(lines.len()),
            )
        })
        .collect();
    ranges.sort_by_key(|r| r.0);

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.0 <= last.1 + 1 => last.1 = last.1.max(range.1),
            _ => merged.push(range),
        }
    }

    let parts: Vec<String> = merged
        .into_iter()
        .map(|(start, end)| {
            let block = lines[start - 1..end].join("\n");
            format!(
                "// --- SNIPPET LINES {}-{} ---\n{}\n// --- END SNIPPET ---",
                start, end, block
            )
        })
        .collect();
    Some(parts.join("\n\n"))
}
