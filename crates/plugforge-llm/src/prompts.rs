//! Prompt builders for the studio tasks.
//!
//! Every conversation opens with the same non-destructive system instruction;
//! the task builders only vary the user turn. Wording is deliberately stable
//! so that model behavior stays comparable across sessions.

use plugforge_settings::{Framework, PluginMeta};

use crate::types::ChatMessage;

fn framework_label(framework: Framework) -> &'static str {
    match framework {
        Framework::Carbon => "Carbon",
        Framework::Oxide => "Oxide/uMod",
    }
}

/// The fixed system instruction: never destroy user code, prefer minimal
/// unified diffs, ask rather than guess.
pub fn system_non_destructive(framework: Framework) -> ChatMessage {
    ChatMessage::system(format!(
        "You are an expert Rust server plugin engineer. Target framework: {}.\n\
         CRITICAL RULES:\n\
         - NEVER delete or truncate user code.\n\
         - Produce minimal, explicit patches (unified diff) for any fixes or improvements.\n\
         - If >20% lines would change, split into multiple small patches with rationale.\n\
         - If uncertain, ask for clarification.\n\
         - Respect framework-specific attributes and hook signatures.",
        framework_label(framework)
    ))
}

/// Conversation for generating a fresh plugin from a description.
pub fn generate_plugin(
    framework: Framework,
    description: &str,
    meta: &PluginMeta,
    safety_mode: bool,
    selected_hooks: &[String],
) -> Vec<ChatMessage> {
    let hook_list = if selected_hooks.is_empty() {
        String::new()
    } else {
        format!("\nHooks to consider: {}", selected_hooks.join(", "))
    };
    let permissions = if meta.permissions.is_empty() {
        "(none)".to_string()
    } else {
        meta.permissions.join(", ")
    };
    let safety = if safety_mode {
        "Avoid sensitive operations and blocking calls; prefer safe patterns."
    } else {
        "Use standard patterns."
    };
    vec![
        system_non_destructive(framework),
        ChatMessage::user(format!(
            "Generate a minimal {} C# plugin implementing:\n\
             \"{}\"{}\n\n\
             Metadata:\n\
             - Name: {}\n\
             - Author: {}\n\
             - Version: {}\n\
             - Permissions: {}\n\n\
             Constraints:\n\
             - Include comments explaining each significant section.\n\
             - {}\n\
             - Output ONLY the C# code block. Do NOT include explanations.",
            framework_label(framework),
            description,
            hook_list,
            meta.name,
            meta.author,
            meta.version,
            permissions,
            safety
        )),
    ]
}

fn snippet_scope(code_fragment: Option<&str>, when_scoped: &str, when_full: &str) -> String {
    match code_fragment {
        Some(fragment) if !fragment.is_empty() => format!(
            "{}\n---BEGIN SNIPPETS---\n{}\n---END SNIPPETS---",
            when_scoped, fragment
        ),
        _ => when_full.to_string(),
    }
}

/// Conversation for refining an existing plugin toward the given goals.
/// Output is expected to be a unified diff, never a rewrite.
pub fn refine_plugin(
    framework: Framework,
    goals: &[String],
    current_code: &str,
    code_fragment: Option<&str>,
) -> Vec<ChatMessage> {
    let partial_note = snippet_scope(
        code_fragment,
        "Only modify within the provided snippets. Output a unified diff against the original file content; do not mass-rewrite.",
        "Return a unified diff (git-style) with minimal changes.",
    );
    vec![
        system_non_destructive(framework),
        ChatMessage::user(format!(
            "Refine the following plugin with conservative changes for goals: {}\n\n\
             {}\n\n\
             ---BEGIN CURRENT CODE---\n{}\n---END CURRENT CODE---",
            goals.join(", "),
            partial_note,
            current_code
        )),
    ]
}

/// Conversation for producing a minimal fix for a described problem.
pub fn create_patch(
    framework: Framework,
    problem: &str,
    current_code: &str,
    code_fragment: Option<&str>,
) -> Vec<ChatMessage> {
    let partial_note = snippet_scope(
        code_fragment,
        "Only touch code inside the snippets below. Produce the minimal unified diff applicable to the full file.",
        "Produce the minimal unified diff applicable to the full file.",
    );
    vec![
        system_non_destructive(framework),
        ChatMessage::user(format!(
            "Create a unified diff (git style) that minimally fixes the problem described, without deleting or truncating user code.\n\n\
             Problem:\n{}\n\n\
             Rules:\n\
             - Minimal explicit patches only.\n\
             - If >20% of lines would change, split into multiple small diffs; annotate each with a short rationale in comments starting with // PATCH NOTE:\n\n\
             {}\n\n\
             ---BEGIN CURRENT CODE---\n{}\n---END CURRENT CODE---",
            problem, partial_note, current_code
        )),
    ]
}

/// Conversation for a structured test plan. The caller requests JSON mode;
/// the expected keys are spelled out in the prompt as well.
pub fn suggest_tests(
    framework: Framework,
    current_code: &str,
    category_only: bool,
    code_fragment: Option<&str>,
) -> Vec<ChatMessage> {
    let scope = match code_fragment {
        Some(fragment) if !fragment.is_empty() => format!(
            "Focus only on these snippets:\n---SNIPPETS---\n{}\n---END SNIPPETS---\n",
            fragment
        ),
        _ => String::new(),
    };
    let brevity = if category_only {
        "Be terse. Prefer bullet points."
    } else {
        "Keep concise to save tokens."
    };
    vec![
        system_non_destructive(framework),
        ChatMessage::user(format!(
            "Suggest a test plan for this {} Rust plugin.\n\
             {}\n\
             Output JSON with keys:\n\
             - scenarios: array of scenario strings\n\
             - assertions: array of assertion strings\n\
             - manual_steps: array of in-game/manual steps\n\n\
             {}\n\n\
             ---CODE---\n{}\n---END---",
            framework, scope, brevity, current_code
        )),
    ]
}

/// Conversation for explaining a plugin, optionally summarized by category.
pub fn explain_code(
    framework: Framework,
    current_code: &str,
    category_only: bool,
    code_fragment: Option<&str>,
) -> Vec<ChatMessage> {
    let scope = match code_fragment {
        Some(fragment) if !fragment.is_empty() => format!(
            "Focus only on these snippets:\n---SNIPPETS---\n{}\n---END SNIPPETS---\n",
            fragment
        ),
        _ => String::new(),
    };
    let brevity = if category_only {
        "Be very concise; summarize by category (hooks, permissions, data IO)."
    } else {
        "Keep it concise."
    };
    vec![
        system_non_destructive(framework),
        ChatMessage::user(format!(
            "Explain the following plugin. Focus on hooks used, permissions, and key behaviors. {}\n\
             {}\n\
             ---CODE---\n{}\n---END---",
            brevity, scope, current_code
        )),
    ]
}
