//! Loading and saving `settings.toml`, plus credential resolution.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::schema::StudioSettings;

/// Environment variables consulted when no explicit API key is configured,
/// in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["PLUGFORGE_API_KEY", "OPENAI_API_KEY"];

/// Configuration directory: `~/.plugforge`.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".plugforge")
}

/// Path to the settings file: `~/.plugforge/settings.toml`.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

/// Load settings from the default location. Missing file means defaults; a
/// malformed file is an error (never silently discarded).
pub fn load_settings() -> Result<StudioSettings> {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Result<StudioSettings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(StudioSettings::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    let settings = toml::from_str(&raw)
        .with_context(|| format!("failed to parse settings from {}", path.display()))?;
    Ok(settings)
}

/// Save settings to the default location atomically (temp file + rename, so
/// a crash mid-write never leaves a truncated file).
pub fn save_settings(settings: &StudioSettings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &StudioSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = toml::to_string_pretty(settings).context("failed to serialize settings")?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, serialized)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move settings into place at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

/// Resolve the API key: explicit setting first, then the environment
/// variables in [`API_KEY_ENV_VARS`] order. Empty strings count as absent.
pub fn resolve_api_key(settings: &StudioSettings) -> Option<String> {
    resolve_api_key_with(settings, |var| std::env::var(var).ok())
}

fn resolve_api_key_with(
    settings: &StudioSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(key) = settings.api_key.as_deref() {
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .find(|value| !value.is_empty())
}
