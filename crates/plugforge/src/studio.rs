//! The studio session: one editor buffer, one orchestrator, one state store.
//!
//! Every operation follows the same contract: the model proposes, the session
//! verifies, and only verified content touches the buffer. Model output that
//! fails its shape check (prose instead of a plugin, prose instead of a diff,
//! broken JSON instead of a test plan) is surfaced as a clarification outcome
//! with the raw text preserved in history — never applied, never an error.
//!
//! Callers are expected to serialize operations; the session holds no lock of
//! its own.

use std::sync::Arc;

use plugforge_llm::{
    prompts, ChatTransport, HttpTransport, Orchestrator, TestPlan, TestPlanResult, UsageStats,
};
use plugforge_settings::{
    resolve_api_key, HistoryEntry, Snapshot, StateStore, StudioSettings,
};
use plugforge_udiff::{
    apply_unified_diff, build_changelog_entry, estimate_impact, looks_like_diff, ApplyOptions,
    ImpactReport, ManualHunk,
};
use plugforge_validate::{
    extract_code_block, looks_like_plugin, run_validators, uncertain_fragments, Finding,
};

use crate::error::StudioError;

/// Impact thresholds above which applying a patch requires explicit
/// confirmation.
const TOUCHED_PCT_LIMIT: f64 = 20.0;
const DELETED_PCT_LIMIT: f64 = 10.0;

/// Result of a generate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The buffer was replaced; the previous content was snapshotted.
    Generated { model: String, code: String },
    /// The model answered with something other than a plugin. The buffer is
    /// untouched.
    ClarificationNeeded { model: String, text: String },
}

/// A diff proposed by refine or create-patch, with its estimated impact.
/// Nothing has been applied yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchProposal {
    pub model: String,
    pub diff: String,
    pub impact: ImpactReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProposalOutcome {
    Proposed(PatchProposal),
    ClarificationNeeded { model: String, text: String },
}

/// How to run [`Studio::apply_patch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyRequest {
    /// Locate hunks and report, but never touch the buffer.
    pub dry_run: bool,
    /// The caller has seen the impact numbers and wants the patch anyway.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatchApplication {
    /// Impact exceeds the limits and `confirmed` was not set. Nothing was
    /// applied; re-invoke with confirmation to proceed.
    NeedsConfirmation { impact: ImpactReport },
    DryRun {
        impact: ImpactReport,
        manual: Vec<ManualHunk>,
        applies_cleanly: bool,
    },
    /// The buffer was updated and a changelog entry recorded. `manual` lists
    /// hunks that could not be located and still need a human.
    Applied {
        impact: ImpactReport,
        manual: Vec<ManualHunk>,
    },
    /// No hunk applied; the buffer is unchanged.
    NoChanges { manual: Vec<ManualHunk> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Plan { model: String, plan: TestPlan },
    /// The model returned prose, broken JSON, or an empty plan.
    ClarificationNeeded { model: String, raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub model: String,
    pub text: String,
}

/// One authoring session. Owns the working buffer; persists it as the
/// autosave on every change.
pub struct Studio {
    orchestrator: Orchestrator,
    settings: StudioSettings,
    store: StateStore,
    buffer: String,
}

impl Studio {
    /// Build a session with the production HTTP transport. Fails fast with a
    /// configuration error when no API key can be resolved.
    pub fn new(settings: StudioSettings, store: StateStore) -> Result<Self, StudioError> {
        let api_key = resolve_api_key(&settings).unwrap_or_default();
        let transport = HttpTransport::new(api_key)?;
        Ok(Self::with_transport(settings, store, Arc::new(transport)))
    }

    /// Build a session over any transport. The buffer starts from the
    /// persisted autosave.
    pub fn with_transport(
        settings: StudioSettings,
        store: StateStore,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let buffer = store.autosave().to_string();
        Self {
            orchestrator: Orchestrator::new(transport),
            settings,
            store,
            buffer,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Replace the buffer (user edit) and persist it as the autosave.
    pub fn set_buffer(&mut self, text: impl Into<String>) -> Result<(), StudioError> {
        self.buffer = text.into();
        self.store.set_autosave(self.buffer.clone())?;
        Ok(())
    }

    pub fn settings(&self) -> &StudioSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut StudioSettings {
        &mut self.settings
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn stats(&self) -> UsageStats {
        self.orchestrator.stats()
    }

    /// Run the validators over the current buffer.
    pub fn validation_report(&self) -> Vec<Finding> {
        run_validators(&self.buffer, self.settings.framework)
    }

    /// Save a manual snapshot of the current buffer.
    pub fn take_snapshot(&mut self, note: impl Into<String>) -> Result<(), StudioError> {
        self.store
            .add_snapshot(Snapshot::new(self.buffer.clone(), note))?;
        Ok(())
    }

    /// Generate a fresh plugin from a description. The previous buffer is
    /// snapshotted before being replaced.
    pub async fn generate(
        &mut self,
        description: &str,
        selected_hooks: &[String],
    ) -> Result<GenerateOutcome, StudioError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(StudioError::EmptyDescription);
        }
        let description = if selected_hooks.is_empty() {
            description.to_string()
        } else {
            format!("{} Target hooks: {}.", description, selected_hooks.join(", "))
        };

        let messages = prompts::generate_plugin(
            self.settings.framework,
            &description,
            &self.settings.meta,
            self.settings.safety_mode,
            selected_hooks,
        );
        let result = self
            .orchestrator
            .invoke_with_fallback(Some(self.settings.model_preference.as_str()), &messages, false, None)
            .await?;
        let text = result.payload.content();

        match extract_code_block(&text).filter(|code| looks_like_plugin(code)) {
            Some(code) => {
                if !self.buffer.is_empty() {
                    self.store.add_snapshot(Snapshot::new(
                        self.buffer.clone(),
                        "replaced by generate",
                    ))?;
                }
                self.set_buffer(code.clone())?;
                self.record("Generate Plugin", &result.model, &text)?;
                Ok(GenerateOutcome::Generated {
                    model: result.model,
                    code,
                })
            }
            None => {
                self.record("Clarification needed", &result.model, &text)?;
                Ok(GenerateOutcome::ClarificationNeeded {
                    model: result.model,
                    text,
                })
            }
        }
    }

    /// Ask for a conservative refinement diff toward the given goals.
    pub async fn refine(&mut self, goals: &[String]) -> Result<ProposalOutcome, StudioError> {
        if self.buffer.trim().is_empty() {
            return Err(StudioError::EmptyBuffer);
        }
        let goals: Vec<String> = if goals.is_empty() {
            vec!["reliability".to_string()]
        } else {
            goals.to_vec()
        };
        let fragments = self.fragment_scope();
        let messages = prompts::refine_plugin(
            self.settings.framework,
            &goals,
            &self.buffer,
            fragments.as_deref(),
        );
        self.propose(messages, "Refine/Improve", "Clarification needed (Refine)")
            .await
    }

    /// Ask for a minimal fix for a described problem.
    pub async fn create_patch(&mut self, problem: &str) -> Result<ProposalOutcome, StudioError> {
        if self.buffer.trim().is_empty() {
            return Err(StudioError::EmptyBuffer);
        }
        let fragments = self.fragment_scope();
        let messages = prompts::create_patch(
            self.settings.framework,
            problem,
            &self.buffer,
            fragments.as_deref(),
        );
        self.propose(messages, "Create Patch", "Clarification needed (Patch)")
            .await
    }

    /// Apply a proposed diff to the buffer, with impact gating.
    pub fn apply_patch(
        &mut self,
        diff: &str,
        request: ApplyRequest,
    ) -> Result<PatchApplication, StudioError> {
        if diff.trim().is_empty() {
            return Err(StudioError::EmptyPatch);
        }
        let impact = estimate_impact(&self.buffer, diff);
        let gated = impact.touched_pct > TOUCHED_PCT_LIMIT || impact.deleted_pct > DELETED_PCT_LIMIT;
        if !request.dry_run && gated && !request.confirmed {
            tracing::info!(
                touched_pct = impact.touched_pct,
                deleted_pct = impact.deleted_pct,
                "patch exceeds impact limits; awaiting confirmation"
            );
            return Ok(PatchApplication::NeedsConfirmation { impact });
        }

        let outcome = apply_unified_diff(
            &self.buffer,
            diff,
            ApplyOptions {
                dry_run: request.dry_run,
            },
        );
        if request.dry_run {
            return Ok(PatchApplication::DryRun {
                impact,
                applies_cleanly: outcome.manual.is_empty(),
                manual: outcome.manual,
            });
        }
        if !outcome.changed {
            return Ok(PatchApplication::NoChanges {
                manual: outcome.manual,
            });
        }

        self.set_buffer(outcome.result)?;
        self.store
            .add_changelog(build_changelog_entry("Applied Patch", diff, &impact))?;
        if !outcome.manual.is_empty() {
            tracing::warn!(
                hunks = outcome.manual.len(),
                "some hunks could not be located and need manual merge"
            );
        }
        Ok(PatchApplication::Applied {
            impact,
            manual: outcome.manual,
        })
    }

    /// Ask for a structured test plan (JSON mode).
    pub async fn suggest_tests(&mut self) -> Result<TestOutcome, StudioError> {
        if self.buffer.trim().is_empty() {
            return Err(StudioError::EmptyBuffer);
        }
        let fragments = self.fragment_scope();
        let messages = prompts::suggest_tests(
            self.settings.framework,
            &self.buffer,
            self.settings.category_only,
            fragments.as_deref(),
        );
        let result = self
            .orchestrator
            .invoke_with_fallback(Some(self.settings.model_preference.as_str()), &messages, true, None)
            .await?;
        let raw = result.payload.content();

        match TestPlanResult::from_raw(&raw) {
            TestPlanResult::Parsed(plan) if plan != TestPlan::default() => {
                let rendered =
                    serde_json::to_string_pretty(&plan).unwrap_or_else(|_| raw.clone());
                self.record("Suggest Tests", &result.model, &rendered)?;
                Ok(TestOutcome::Plan {
                    model: result.model,
                    plan,
                })
            }
            _ => {
                self.record("Clarification needed (Tests)", &result.model, &raw)?;
                Ok(TestOutcome::ClarificationNeeded {
                    model: result.model,
                    raw,
                })
            }
        }
    }

    /// Explain the current buffer. With a token observer the response streams
    /// and fragments are delivered as they arrive.
    pub async fn explain(
        &mut self,
        on_token: Option<&mut (dyn FnMut(&str) + Send)>,
    ) -> Result<Explanation, StudioError> {
        if self.buffer.trim().is_empty() {
            return Err(StudioError::EmptyBuffer);
        }
        let fragments = self.fragment_scope();
        let messages = prompts::explain_code(
            self.settings.framework,
            &self.buffer,
            self.settings.category_only,
            fragments.as_deref(),
        );
        let result = self
            .orchestrator
            .invoke_with_fallback(Some(self.settings.model_preference.as_str()), &messages, false, on_token)
            .await?;
        let text = result.payload.content();
        self.record("Explain Code", &result.model, &text)?;
        Ok(Explanation {
            model: result.model,
            text,
        })
    }

    async fn propose(
        &mut self,
        messages: Vec<plugforge_llm::ChatMessage>,
        title: &str,
        clarification_title: &str,
    ) -> Result<ProposalOutcome, StudioError> {
        let result = self
            .orchestrator
            .invoke_with_fallback(Some(self.settings.model_preference.as_str()), &messages, false, None)
            .await?;
        let diff = result.payload.content();

        if !looks_like_diff(&diff) {
            self.record(clarification_title, &result.model, &diff)?;
            return Ok(ProposalOutcome::ClarificationNeeded {
                model: result.model,
                text: diff,
            });
        }

        let impact = estimate_impact(&self.buffer, &diff);
        self.record(title, &result.model, &diff)?;
        Ok(ProposalOutcome::Proposed(PatchProposal {
            model: result.model,
            diff,
            impact,
        }))
    }

    fn fragment_scope(&self) -> Option<String> {
        if self.settings.only_uncertain {
            uncertain_fragments(&self.buffer, self.settings.framework)
        } else {
            None
        }
    }

    fn record(&mut self, title: &str, model: &str, content: &str) -> Result<(), StudioError> {
        self.store
            .add_history(HistoryEntry::new(title, model, content))?;
        Ok(())
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("buffer_len", &self.buffer.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
