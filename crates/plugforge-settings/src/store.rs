//! Persistent studio state: autosave buffer, snapshots, action history, and
//! the patch changelog.
//!
//! Everything lives in a single JSON file. Lists are newest-first and capped;
//! writes are last-write-wins. A corrupt or missing file starts the store
//! empty rather than failing the session.

use anyhow::{Context, Result};
use chrono::Utc;
use plugforge_udiff::ChangelogEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_CAP: usize = 100;
pub const HISTORY_CAP: usize = 200;
pub const CHANGELOG_CAP: usize = 500;

/// A saved copy of the editor buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub content: String,
    #[serde(default)]
    pub note: String,
}

impl Snapshot {
    pub fn new(content: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            content: content.into(),
            note: note.into(),
        }
    }
}

/// One recorded studio action and the text it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub title: String,
    pub model: String,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(
        title: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            title: title.into(),
            model: model.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct StudioState {
    autosave: String,
    snapshots: Vec<Snapshot>,
    history: Vec<HistoryEntry>,
    changelog: Vec<ChangelogEntry>,
}

/// File-backed studio state. Every mutation persists immediately.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: StudioState,
}

impl StateStore {
    /// Default location: `~/.plugforge/state.json`.
    pub fn open_default() -> Self {
        Self::open(crate::loader::config_dir().join("state.json"))
    }

    /// Open the store at `path`. A missing file starts empty; a corrupt file
    /// is logged and discarded on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupt state file; starting empty"
                    );
                    StudioState::default()
                }
            },
            Err(_) => StudioState::default(),
        };
        Self { path, state }
    }

    pub fn autosave(&self) -> &str {
        &self.state.autosave
    }

    pub fn set_autosave(&mut self, text: impl Into<String>) -> Result<()> {
        self.state.autosave = text.into();
        self.persist()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.state.snapshots
    }

    /// Prepend a snapshot, dropping the oldest beyond [`SNAPSHOT_CAP`].
    pub fn add_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        self.state.snapshots.insert(0, snapshot);
        self.state.snapshots.truncate(SNAPSHOT_CAP);
        self.persist()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn add_history(&mut self, entry: HistoryEntry) -> Result<()> {
        self.state.history.insert(0, entry);
        self.state.history.truncate(HISTORY_CAP);
        self.persist()
    }

    pub fn changelog(&self) -> &[ChangelogEntry] {
        &self.state.changelog
    }

    pub fn add_changelog(&mut self, entry: ChangelogEntry) -> Result<()> {
        self.state.changelog.insert(0, entry);
        self.state.changelog.truncate(CHANGELOG_CAP);
        self.persist()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialized =
            serde_json::to_string_pretty(&self.state).context("failed to serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move state into place at {}", self.path.display()))?;
        Ok(())
    }
}
