//! Model-output recognition: code block extraction and plugin shape sniffing.

use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:csharp|cs)?\s*(.*?)```").unwrap());

static PLUGIN_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s*:\s*(RustPlugin|CarbonPlugin)\b").unwrap());
static PLUGIN_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(Info|Plugin)\s*\(").unwrap());
static OXIDE_USING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\busing\s+Oxide\.Core\b").unwrap());
static CARBON_USING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\busing\s+Carbon\.Core\b").unwrap());

/// Pull the first fenced code block out of model output. Accepts bare,
/// `csharp`, and `cs` fences.
pub fn extract_code_block(text: &str) -> Option<String> {
    CODE_FENCE
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Does this text look like a C# server plugin? Used as a shape check before
/// a generated buffer replaces user code.
pub fn looks_like_plugin(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    PLUGIN_CLASS.is_match(text)
        || PLUGIN_ATTR.is_match(text)
        || OXIDE_USING.is_match(text)
        || CARBON_USING.is_match(text)
}
