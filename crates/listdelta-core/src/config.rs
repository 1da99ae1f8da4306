#![forbid(unsafe_code)]

//! Aggregator configuration.
//!
//! # Environment
//!
//! | Variable                 | Values                   | Effect                          |
//! |--------------------------|--------------------------|---------------------------------|
//! | `LISTDELTA_FORCE_RELOAD` | `1` / `true` / `yes`     | Every batch ends in a reload.   |
//! | `LISTDELTA_ITEM_UPDATES` | `reload` / `reconfigure` | How updated items are refreshed |
//!
//! # Files
//!
//! With the `config-file` feature the same settings load from TOML or JSON:
//!
//! ```toml
//! item_updates = "reconfigure"
//! force_reload = false
//! ```

#[cfg(feature = "config-file")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Env var that forces every batch to resolve to a full reload.
pub const FORCE_RELOAD_ENV: &str = "LISTDELTA_FORCE_RELOAD";
/// Env var selecting the [`ItemUpdateMode`].
pub const ITEM_UPDATES_ENV: &str = "LISTDELTA_ITEM_UPDATES";

/// How updated items are refreshed on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ItemUpdateMode {
    /// Ask the surface to reload each updated item's visual.
    #[default]
    Reload,
    /// Leave the visual alone during the batch and reconfigure it in place
    /// once the batch completes. Avoids flicker and keeps in-cell state.
    Reconfigure,
}

impl ItemUpdateMode {
    /// Parse `reload` / `reconfigure`, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reload" => Some(Self::Reload),
            "reconfigure" => Some(Self::Reconfigure),
            _ => None,
        }
    }
}

/// Configuration for [`ChangeSetAggregator`](crate::ChangeSetAggregator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct AggregatorConfig {
    /// How updated items are refreshed.
    pub item_updates: ItemUpdateMode,
    /// Resolve every batch to a full reload (disables incremental updates).
    /// Env: `LISTDELTA_FORCE_RELOAD=1`
    pub force_reload: bool,
}

impl AggregatorConfig {
    /// Default configuration with the given item update mode.
    #[must_use]
    pub fn new(item_updates: ItemUpdateMode) -> Self {
        Self {
            item_updates,
            force_reload: false,
        }
    }

    /// Set the item update mode.
    #[must_use]
    pub fn with_item_updates(mut self, mode: ItemUpdateMode) -> Self {
        self.item_updates = mode;
        self
    }

    /// Set the forced-reload fallback.
    #[must_use]
    pub fn with_force_reload(mut self, force: bool) -> Self {
        self.force_reload = force;
        self
    }

    /// Create from environment variables. Unset or unrecognized values fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides on top of `self`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.overlay(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::default().overlay(lookup)
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(FORCE_RELOAD_ENV) {
            self.force_reload = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }
        if let Some(mode) = lookup(ITEM_UPDATES_ENV).as_deref().and_then(ItemUpdateMode::parse) {
            self.item_updates = mode;
        }
        self
    }

    /// Check for combinations that are accepted but almost certainly
    /// unintended. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.force_reload && self.item_updates == ItemUpdateMode::Reconfigure {
            errors.push(
                "item_updates = \"reconfigure\" has no effect while force_reload is set".into(),
            );
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a TOML file and reject configs that fail [`validate`](Self::validate).
    #[cfg(feature = "config-file")]
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_toml_file(path)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------

/// Errors that can occur when loading an aggregator configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
