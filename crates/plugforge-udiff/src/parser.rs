//! Parse raw unified-diff text into hunks and decompose hunks into blocks.

use regex::Regex;
use std::sync::LazyLock;

/// Full hunk header: `@@ -<start>[,<count>] +<start>[,<count>] @@` (counts optional).
static HUNK_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@\s*-\d+(?:,\d+)?\s+\+\d+(?:,\d+)?\s*@@").expect("Invalid hunk header regex")
});

/// Loose header prefix used to terminate the previous hunk's body.
static HUNK_START_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@\s*-\d+").expect("Invalid hunk start regex"));

/// Shape check: does this look like a genuine patch rather than prose?
static DIFF_SHAPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:@@\s*-\d+|\s*diff --git)").expect("Invalid diff shape regex")
});

/// How many context lines to keep on each side of a hunk's changes.
const CONTEXT_WINDOW: usize = 3;

/// One contiguous change region within a unified diff.
///
/// `lines` holds the raw tagged lines of the hunk body. A hunk body never
/// contains another `@@` header or a `diff --git` marker; those terminate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    /// The `@@ ... @@` header line that opened this hunk.
    pub header: String,
    /// Raw body lines, leading tag character included.
    pub lines: Vec<String>,
}

/// Old/new text blocks derived from a hunk, plus bounded context windows
/// used for anchor recovery when exact matching fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkBlocks {
    /// Context + deletion lines, joined with newlines in original order.
    pub old_block: String,
    /// Context + addition lines, joined with newlines in original order.
    pub new_block: String,
    /// Up to the last 3 context lines strictly before the first change.
    pub context_before: String,
    /// Up to the first 3 context lines strictly after the last change.
    pub context_after: String,
}

/// Split raw diff text into an ordered sequence of hunks.
///
/// A line matching the hunk header pattern opens a hunk; subsequent lines
/// belong to it until another header, a `diff --git` file boundary, or the end
/// of input. Everything outside hunk bodies (file headers, `---`/`+++` lines)
/// is discarded. Empty input yields zero hunks, not an error.
pub fn parse_unified_diff(diff_text: &str) -> Vec<DiffHunk> {
    let normalized = diff_text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut hunks = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        if !HUNK_HEADER_REGEX.is_match(lines[i]) {
            i += 1;
            continue;
        }
        let header = lines[i].to_string();
        i += 1;
        let mut body = Vec::new();
        while i < lines.len() {
            let l = lines[i];
            if HUNK_START_REGEX.is_match(l) || l.starts_with("diff --git ") {
                break;
            }
            body.push(l.to_string());
            i += 1;
        }
        hunks.push(DiffHunk {
            header,
            lines: body,
        });
    }

    hunks
}

/// Line classification used while replaying a hunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineTag {
    Context,
    Deletion,
    Addition,
}

/// Decompose a hunk into old/new blocks and bounded context windows.
///
/// Tagging is by leading character: space is context, `-` deletion, `+`
/// addition. Anything else is treated as context verbatim — a defensive
/// fallback for malformed diffs, so a mangled line degrades the match rather
/// than corrupting the splice.
pub fn hunk_to_blocks(hunk: &DiffHunk) -> HunkBlocks {
    let mut old_lines: Vec<&str> = Vec::new();
    let mut new_lines: Vec<&str> = Vec::new();
    // (content, index of the preceding change line count) for window selection
    let mut context: Vec<(usize, &str)> = Vec::new();
    let mut tags: Vec<LineTag> = Vec::new();

    for (pos, raw) in hunk.lines.iter().enumerate() {
        if let Some(rest) = raw.strip_prefix(' ') {
            old_lines.push(rest);
            new_lines.push(rest);
            context.push((pos, rest));
            tags.push(LineTag::Context);
        } else if let Some(rest) = raw.strip_prefix('-') {
            old_lines.push(rest);
            tags.push(LineTag::Deletion);
        } else if let Some(rest) = raw.strip_prefix('+') {
            new_lines.push(rest);
            tags.push(LineTag::Addition);
        } else {
            // Unknown tag; treat as context verbatim.
            old_lines.push(raw);
            new_lines.push(raw);
            context.push((pos, raw));
            tags.push(LineTag::Context);
        }
    }

    let first_change = tags.iter().position(|t| *t != LineTag::Context);
    let last_change = tags.iter().rposition(|t| *t != LineTag::Context);

    let context_before: Vec<&str> = match first_change {
        Some(fc) => {
            let before: Vec<&str> = context
                .iter()
                .filter(|(pos, _)| *pos < fc)
                .map(|(_, l)| *l)
                .collect();
            let skip = before.len().saturating_sub(CONTEXT_WINDOW);
            before[skip..].to_vec()
        }
        None => Vec::new(),
    };
    let context_after: Vec<&str> = match last_change {
        Some(lc) => context
            .iter()
            .filter(|(pos, _)| *pos > lc)
            .map(|(_, l)| *l)
            .take(CONTEXT_WINDOW)
            .collect(),
        None => Vec::new(),
    };

    HunkBlocks {
        old_block: old_lines.join("\n"),
        new_block: new_lines.join("\n"),
        context_before: context_before.join("\n"),
        context_after: context_after.join("\n"),
    }
}

/// Does this text contain at least one hunk header or file boundary marker?
///
/// Callers use this to distinguish a genuine patch from a clarification
/// question the model asked instead; anything failing the check is surfaced
/// as "clarification needed" rather than fed to the applier.
pub fn looks_like_diff(text: &str) -> bool {
    DIFF_SHAPE_REGEX.is_match(text)
}
