//! Structured test-plan output and its recovery path.

use serde::{Deserialize, Serialize};

/// A test plan as requested from the model in JSON mode. Missing keys
/// deserialize to empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    #[serde(default)]
    pub scenarios: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<String>,
    #[serde(default)]
    pub manual_steps: Vec<String>,
}

/// Outcome of parsing model output as a test plan. Models occasionally return
/// prose or broken JSON even in JSON mode; the raw text is preserved so the
/// caller can still show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestPlanResult {
    Parsed(TestPlan),
    Unparsed { raw: String },
}

impl TestPlanResult {
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str::<TestPlan>(raw) {
            Ok(plan) => TestPlanResult::Parsed(plan),
            Err(e) => {
                tracing::warn!("test plan output was not valid JSON: {}", e);
                TestPlanResult::Unparsed {
                    raw: raw.to_string(),
                }
            }
        }
    }
}
