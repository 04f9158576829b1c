//! Settings schema definitions.
//!
//! All structs use `#[serde(default)]` so partial configuration files load
//! cleanly; missing fields fall back to sensible defaults.

use serde::{Deserialize, Serialize};

/// Target plugin framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    #[default]
    Oxide,
    Carbon,
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Framework::Oxide => "oxide",
            Framework::Carbon => "carbon",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oxide" | "umod" | "oxide/umod" => Ok(Framework::Oxide),
            "carbon" => Ok(Framework::Carbon),
            _ => Err(format!("Invalid framework: {}", s)),
        }
    }
}

/// Plugin metadata stamped into generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMeta {
    pub name: String,
    pub author: String,
    pub version: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Default for PluginMeta {
    fn default() -> Self {
        Self {
            name: "MyPlugin".to_string(),
            author: "YourName".to_string(),
            version: "1.0.0".to_string(),
            permissions: Vec::new(),
        }
    }
}

/// Root settings structure, loaded from `~/.plugforge/settings.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioSettings {
    /// API key for the completion endpoint. When absent, environment
    /// variables are consulted at resolution time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Preferred model, or the `auto` sentinel for the built-in fallback
    /// order.
    pub model_preference: String,

    /// Target plugin framework.
    pub framework: Framework,

    /// Steer generation away from sensitive operations and blocking calls.
    pub safety_mode: bool,

    /// Scope refine/patch prompts to uncertain fragments only, to cut
    /// request size.
    pub only_uncertain: bool,

    /// Request category-level summaries instead of full prose.
    pub category_only: bool,

    /// Default metadata for newly generated plugins.
    pub meta: PluginMeta,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model_preference: "auto".to_string(),
            framework: Framework::default(),
            safety_mode: true,
            only_uncertain: false,
            category_only: false,
            meta: PluginMeta::default(),
        }
    }
}
