//! Configuration and state persistence for the plugin studio.
//!
//! Two files under `~/.plugforge/`:
//! - `settings.toml` — user preferences, loaded with serde defaults so partial
//!   files work, written atomically (temp file + rename).
//! - `state.json` — autosave buffer plus capped newest-first lists for
//!   snapshots, action history, and the patch changelog.
//!
//! # Architecture
//!
//! This is a **Layer 2 (Infrastructure)** crate:
//! - Depends on: plugforge-udiff (changelog record type) and external crates
//! - Used by: plugforge-llm (prompt metadata), plugforge (session layer)

pub mod loader;
pub mod schema;
pub mod store;

pub use loader::{
    config_dir, load_settings, load_settings_from, resolve_api_key, save_settings,
    save_settings_to, settings_path, API_KEY_ENV_VARS,
};
pub use schema::{Framework, PluginMeta, StudioSettings};
pub use store::{
    HistoryEntry, Snapshot, StateStore, CHANGELOG_CAP, HISTORY_CAP, SNAPSHOT_CAP,
};
