//! End-to-end session flows over a scripted transport.
//!
//! These exercise the verify-before-apply contract: model output only reaches
//! the buffer after its shape check passes, oversized patches wait for
//! confirmation, and every operation leaves a history trail.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use plugforge::{
    ApplyRequest, Framework, GenerateOutcome, PatchApplication, ProposalOutcome, StateStore,
    Studio, StudioError, StudioSettings, TestOutcome,
};
use plugforge_llm::{ChatRequest, ChatResponse, ChatTransport, LlmError};
use serde_json::json;

enum Scripted {
    Content(&'static str),
    Stream(Vec<&'static str>),
}

struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl FakeTransport {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.seen.lock().unwrap().push(request.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted");
        match next {
            Scripted::Content(content) => Ok(ChatResponse::Json(json!({
                "choices": [{"message": {"content": content}}]
            }))),
            Scripted::Stream(frames) => {
                let items: Vec<Result<Bytes, LlmError>> = frames
                    .into_iter()
                    .map(|f| Ok(Bytes::from_static(f.as_bytes())))
                    .collect();
                Ok(ChatResponse::Stream(stream::iter(items).boxed()))
            }
        }
    }
}

fn studio_with(
    dir: &tempfile::TempDir,
    transport: Arc<FakeTransport>,
) -> Studio {
    let store = StateStore::open(dir.path().join("state.json"));
    Studio::with_transport(StudioSettings::default(), store, transport)
}

const PLUGIN_REPLY: &str = "```csharp\nusing Oxide.Core;\n\n[Info(\"MyPlugin\", \"YourName\", \"1.0.0\")]\npublic class MyPlugin : RustPlugin\n{\n}\n```";

#[tokio::test]
async fn test_generate_replaces_buffer_and_snapshots_previous() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(PLUGIN_REPLY)]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("// previous work").unwrap();

    let outcome = studio.generate("broadcast a welcome message", &[]).await.unwrap();
    match outcome {
        GenerateOutcome::Generated { model, code } => {
            assert_eq!(model, "gpt-5-mini");
            assert!(code.contains("class MyPlugin : RustPlugin"));
        }
        other => panic!("expected generated plugin, got {:?}", other),
    }
    assert!(studio.buffer().contains("RustPlugin"));
    assert_eq!(studio.store().snapshots().len(), 1);
    assert_eq!(studio.store().snapshots()[0].content, "// previous work");
    assert_eq!(studio.store().history()[0].title, "Generate Plugin");
}

#[tokio::test]
async fn test_generate_prose_leaves_buffer_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(
        "Which framework version are you targeting?",
    )]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("// keep me").unwrap();

    let outcome = studio.generate("do something", &[]).await.unwrap();
    assert!(matches!(outcome, GenerateOutcome::ClarificationNeeded { .. }));
    assert_eq!(studio.buffer(), "// keep me");
    assert!(studio.store().snapshots().is_empty());
    assert_eq!(studio.store().history()[0].title, "Clarification needed");
}

#[tokio::test]
async fn test_generate_appends_hook_note_to_description() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(PLUGIN_REPLY)]);
    let mut studio = studio_with(&dir, transport.clone());

    studio
        .generate("announce joins", &["OnPlayerInit".to_string()])
        .await
        .unwrap();
    let user_turn = &transport.seen()[0].messages[1].content;
    assert!(user_turn.contains("announce joins Target hooks: OnPlayerInit."));
    assert!(user_turn.contains("Hooks to consider: OnPlayerInit"));
}

#[tokio::test]
async fn test_empty_description_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![]);
    let mut studio = studio_with(&dir, transport);
    let err = studio.generate("   ", &[]).await.unwrap_err();
    assert!(matches!(err, StudioError::EmptyDescription));
}

#[tokio::test]
async fn test_refine_proposes_diff_with_impact() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(
        "@@ -1,2 +1,2 @@\n line1\n-line2\n+line2-improved",
    )]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("line1\nline2\nline3\nline4\nline5").unwrap();

    let outcome = studio.refine(&["reliability".to_string()]).await.unwrap();
    match outcome {
        ProposalOutcome::Proposed(proposal) => {
            assert!(proposal.diff.starts_with("@@"));
            assert_eq!(proposal.impact.added, 1);
            assert_eq!(proposal.impact.removed, 1);
        }
        other => panic!("expected proposal, got {:?}", other),
    }
    assert_eq!(studio.store().history()[0].title, "Refine/Improve");
}

#[tokio::test]
async fn test_refine_prose_is_clarification() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(
        "Could you tell me which part should be more reliable?",
    )]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("line1\nline2").unwrap();

    let outcome = studio.refine(&[]).await.unwrap();
    assert!(matches!(outcome, ProposalOutcome::ClarificationNeeded { .. }));
    assert_eq!(
        studio.store().history()[0].title,
        "Clarification needed (Refine)"
    );
}

#[tokio::test]
async fn test_create_patch_on_empty_buffer_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![]);
    let mut studio = studio_with(&dir, transport);
    let err = studio.create_patch("it crashes").await.unwrap_err();
    assert!(matches!(err, StudioError::EmptyBuffer));
}

#[tokio::test]
async fn test_small_patch_applies_and_records_changelog() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![]);
    let mut studio = studio_with(&dir, transport);
    studio
        .set_buffer("line1\nline2\nline3\nline4\nline5\nline6\nline7\nline8\nline9\nline10")
        .unwrap();

    let diff = "@@ -1,3 +1,3 @@\n line1\n-line2\n+line2-fixed\n line3";
    let applied = studio.apply_patch(diff, ApplyRequest::default()).unwrap();
    match applied {
        PatchApplication::Applied { manual, .. } => assert!(manual.is_empty()),
        other => panic!("expected applied, got {:?}", other),
    }
    assert!(studio.buffer().contains("line2-fixed"));
    assert_eq!(studio.store().changelog().len(), 1);
    assert_eq!(studio.store().changelog()[0].title, "Applied Patch");
}

#[tokio::test]
async fn test_large_patch_waits_for_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("line1\nline2\nline3\nline4").unwrap();

    // Touches 2 of 4 lines (50%)
    let diff = "@@ -1,2 +1,2 @@\n-line1\n-line2\n+one\n+two";
    let gated = studio.apply_patch(diff, ApplyRequest::default()).unwrap();
    match gated {
        PatchApplication::NeedsConfirmation { impact } => {
            assert!(impact.touched_pct > 20.0);
        }
        other => panic!("expected confirmation gate, got {:?}", other),
    }
    assert!(studio.buffer().contains("line1"));
    assert!(studio.store().changelog().is_empty());

    let applied = studio
        .apply_patch(
            diff,
            ApplyRequest {
                dry_run: false,
                confirmed: true,
            },
        )
        .unwrap();
    assert!(matches!(applied, PatchApplication::Applied { .. }));
    assert!(studio.buffer().starts_with("one\ntwo"));
}

#[tokio::test]
async fn test_dry_run_never_touches_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("line1\nline2\nline3\nline4").unwrap();

    // Dry run skips the confirmation gate even for a large patch.
    let diff = "@@ -1,2 +1,2 @@\n-line1\n-line2\n+one\n+two";
    let outcome = studio
        .apply_patch(
            diff,
            ApplyRequest {
                dry_run: true,
                confirmed: false,
            },
        )
        .unwrap();
    match outcome {
        PatchApplication::DryRun {
            applies_cleanly, ..
        } => assert!(applies_cleanly),
        other => panic!("expected dry run, got {:?}", other),
    }
    assert_eq!(studio.buffer(), "line1\nline2\nline3\nline4");
}

#[tokio::test]
async fn test_unlocatable_hunks_reported_as_manual() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![]);
    let mut studio = studio_with(&dir, transport);
    studio
        .set_buffer("line1\nline2\nline3\nline4\nline5\nline6\nline7\nline8\nline9\nline10")
        .unwrap();

    let diff = "@@ -1,1 +1,1 @@\n-missing content\n+replacement";
    let outcome = studio.apply_patch(diff, ApplyRequest::default()).unwrap();
    match outcome {
        PatchApplication::NoChanges { manual } => {
            assert_eq!(manual.len(), 1);
            assert!(manual[0].reason.contains("manual merge"));
        }
        other => panic!("expected no changes, got {:?}", other),
    }
}

#[tokio::test]
async fn test_suggest_tests_parses_plan_and_requests_json_mode() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(
        r#"{"scenarios":["player joins"],"assertions":["broadcast once"],"manual_steps":[]}"#,
    )]);
    let mut studio = studio_with(&dir, transport.clone());
    studio.set_buffer("class P : RustPlugin { }").unwrap();

    let outcome = studio.suggest_tests().await.unwrap();
    match outcome {
        TestOutcome::Plan { plan, .. } => {
            assert_eq!(plan.scenarios, vec!["player joins"]);
        }
        other => panic!("expected plan, got {:?}", other),
    }
    assert!(transport.seen()[0].json_mode);
    assert_eq!(studio.store().history()[0].title, "Suggest Tests");
}

#[tokio::test]
async fn test_suggest_tests_empty_plan_is_clarification() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content("{}")]);
    let mut studio = studio_with(&dir, transport);
    studio.set_buffer("class P : RustPlugin { }").unwrap();

    let outcome = studio.suggest_tests().await.unwrap();
    assert!(matches!(outcome, TestOutcome::ClarificationNeeded { .. }));
    assert_eq!(
        studio.store().history()[0].title,
        "Clarification needed (Tests)"
    );
}

#[tokio::test]
async fn test_explain_streams_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Stream(vec![
        "data: {\"choices\":[{\"delta\":{\"content\":\"Registers \"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"one hook.\"}}]}\n",
        "data: [DONE]\n",
    ])]);
    let mut studio = studio_with(&dir, transport.clone());
    studio.set_buffer("class P : RustPlugin { }").unwrap();

    let mut streamed = String::new();
    let mut observer = |t: &str| streamed.push_str(t);
    let explanation = studio.explain(Some(&mut observer)).await.unwrap();

    assert_eq!(explanation.text, "Registers one hook.");
    assert_eq!(streamed, "Registers one hook.");
    assert!(transport.seen()[0].stream);
    assert_eq!(studio.store().history()[0].title, "Explain Code");
}

#[tokio::test]
async fn test_only_uncertain_scopes_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new(vec![Scripted::Content(
        "@@ -1,1 +1,1 @@\n-void OnPlayerChat(string message) { }\n+void OnPlayerChat(BasePlayer player, string message) { }",
    )]);
    let mut studio = studio_with(&dir, transport.clone());
    studio.settings_mut().only_uncertain = true;
    studio.settings_mut().framework = Framework::Carbon;
    studio
        .set_buffer("void OnPlayerChat(string message) { }\nfine line")
        .unwrap();

    studio.refine(&[]).await.unwrap();
    let user_turn = &transport.seen()[0].messages[1].content;
    assert!(user_turn.contains("---BEGIN SNIPPETS---"));
    assert!(user_turn.contains("// --- SNIPPET LINES 1-2 ---"));
}

#[tokio::test]
async fn test_buffer_autosave_survives_sessions() {
    let dir = tempfile::tempdir().unwrap();
    {
        let transport = FakeTransport::new(vec![]);
        let mut studio = studio_with(&dir, transport);
        studio.set_buffer("persisted plugin code").unwrap();
    }
    let transport = FakeTransport::new(vec![]);
    let studio = studio_with(&dir, transport);
    assert_eq!(studio.buffer(), "persisted plugin code");
}
