//! Heuristic checks over C# plugin source.
//!
//! These are linters in spirit, not a compiler: regex-level sanity checks for
//! the mistakes models and beginners actually make. Line numbers are a best
//! guess (first line containing the finding's leading keyword) and may be
//! absent.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use plugforge_settings::Framework;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ok,
    Warn,
    Err,
}

/// One validator result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub level: Level,
    pub message: String,
    /// 1-based line guessed from the message's leading keyword.
    pub line: Option<usize>,
}

static OXIDE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s*:\s*RustPlugin\b").unwrap());
static CARBON_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+\s*:\s*CarbonPlugin\b").unwrap());
static INFO_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(Info|Plugin)\s*\(").unwrap());
static PERM_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)const\s+string\s+\w*\s*PERM").unwrap());
static PERM_USE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"myplugin\.use""#).unwrap());
static PERM_REGISTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)permission\.RegisterPermission\s*\(").unwrap());
static THREAD_SLEEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Thread\.Sleep\s*\(").unwrap());
static TASK_WAIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bTask\.Wait\(\)").unwrap());
static TASK_RESULT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.Result\b").unwrap());
static TODO_NOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)TODO").unwrap());
static CMD_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"void\s+Cmd\w+\s*\(\s*BasePlayer").unwrap());
static CHAT_COMMAND_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[ChatCommand\(").unwrap());

/// Known hooks and their expected signatures.
static HOOK_SIGNATURES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "OnServerInitialized",
            Regex::new(r"void\s+OnServerInitialized\s*\(\s*\)").unwrap(),
        ),
        (
            "OnPlayerInit",
            Regex::new(r"void\s+OnPlayerInit\s*\(\s*BasePlayer\s+\w+\s*\)").unwrap(),
        ),
        (
            "OnPlayerDisconnected",
            Regex::new(r"void\s+OnPlayerDisconnected\s*\(\s*BasePlayer\s+\w+,\s*string\s+\w+\s*\)")
                .unwrap(),
        ),
        (
            "OnPlayerChat",
            Regex::new(r"(void|object)\s+OnPlayerChat\s*\(\s*BasePlayer\s+\w+,\s*string\s+\w+\s*\)")
                .unwrap(),
        ),
    ]
});

/// Run all heuristics over `code` for the given framework.
pub fn run_validators(code: &str, framework: Framework) -> Vec<Finding> {
    let lines: Vec<&str> = code.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let mut findings = Vec::new();

    let mut push = |level: Level, message: String| {
        let line = guess_line(&lines, &message);
        findings.push(Finding {
            level,
            message,
            line,
        });
    };

    // Class inheritance
    match framework {
        Framework::Oxide => {
            if OXIDE_CLASS.is_match(code) {
                push(Level::Ok, "Class derives from RustPlugin".to_string());
            } else {
                push(
                    Level::Warn,
                    "Class should derive from RustPlugin for Oxide/uMod".to_string(),
                );
            }
        }
        Framework::Carbon => {
            if CARBON_CLASS.is_match(code) {
                push(Level::Ok, "Class derives from CarbonPlugin".to_string());
            } else {
                push(
                    Level::Warn,
                    "Class should derive from CarbonPlugin for Carbon".to_string(),
                );
            }
        }
    }

    // Info/Plugin attribute
    if !INFO_ATTR.is_match(code) {
        push(
            Level::Warn,
            "Missing [Info(...)] (Oxide) or [Plugin(...)] (Carbon) attribute near class"
                .to_string(),
        );
    }

    // Permission constant without registration
    let has_perm_const = PERM_CONST.is_match(code) || PERM_USE_LITERAL.is_match(code);
    if has_perm_const && !PERM_REGISTER.is_match(code) {
        push(
            Level::Warn,
            "Permission constant detected but no permission.RegisterPermission(...) found"
                .to_string(),
        );
    }

    // Hook signature sanity
    for (name, signature) in HOOK_SIGNATURES.iter() {
        if code.contains(name) {
            if signature.is_match(code) {
                push(Level::Ok, format!("{} signature looks OK", name));
            } else {
                push(
                    Level::Warn,
                    format!("{} appears but the method signature may be incorrect", name),
                );
            }
        }
    }

    // Obvious main-thread blocking
    if THREAD_SLEEP.is_match(code) || TASK_WAIT.is_match(code) || TASK_RESULT.is_match(code) {
        push(
            Level::Warn,
            "Potential blocking calls detected (Thread.Sleep/Task.Wait/.Result). \
             Consider async or timers to avoid blocking the main thread."
                .to_string(),
        );
    }

    // Unresolved TODOs
    let todo_count = TODO_NOTE.find_iter(code).count();
    if todo_count > 0 {
        push(
            Level::Warn,
            format!(
                "Found {} TODO notes. Ensure they are resolved before production.",
                todo_count
            ),
        );
    }

    // Basic syntax cue
    let opens = code.matches('{').count();
    let closes = code.matches('}').count();
    if opens != closes {
        push(Level::Err, "Unbalanced curly braces detected.".to_string());
    }

    // Command method without its attribute
    if CMD_METHOD.is_match(code) && !CHAT_COMMAND_ATTR.is_match(code) {
        push(
            Level::Warn,
            "Command-like method found but missing [ChatCommand(...)] attribute.".to_string(),
        );
    }

    findings
}

/// First line (1-based) containing the message's leading word. Coarse by
/// design; it only needs to put the finding in the neighborhood.
fn guess_line(lines: &[&str], message: &str) -> Option<usize> {
    let keyword = message.split_whitespace().next()?;
    lines
        .iter()
        .position(|line| line.contains(keyword))
        .map(|i| i + 1)
}
