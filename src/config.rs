//! Editor configuration
//!
//! Configuration is read from a TOML file and then overridden by environment
//! variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `CME_BACKEND_URL` | `backend_url` |
//! | `CME_PACKAGE_ROOT_URL` | `package_root_url` |
//! | `CME_AUTOSAVE_INTERVAL_MS` | `autosave_interval_ms` |
//! | `CME_LANGUAGE` | `preferred_language` |

use crate::sync::SyncSettings;
use crate::value_objects::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {variable}: {value}")]
    Environment { variable: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Settings of the editor core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base URL of the package backend
    pub backend_url: String,
    /// Prefix of the IRIs of new packages
    pub package_root_url: String,
    /// Autosave period; 0 disables autosave
    pub autosave_interval_ms: u64,
    /// Language labels are shown in
    pub preferred_language: String,
    /// Color of nodes whose model has none assigned
    pub default_color: Color,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3100".to_string(),
            package_root_url: "http://localhost:3100/packages/".to_string(),
            autosave_interval_ms: 30_000,
            preferred_language: "en".to_string(),
            default_color: Color::WHITE,
        }
    }
}

impl EditorConfig {
    /// Load a TOML file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides, used when no file is given
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    /// Override fields from variables returned by `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("CME_BACKEND_URL") {
            self.backend_url = value;
        }
        if let Some(value) = lookup("CME_PACKAGE_ROOT_URL") {
            self.package_root_url = value;
        }
        if let Some(value) = lookup("CME_AUTOSAVE_INTERVAL_MS") {
            self.autosave_interval_ms = value.parse().map_err(|_| ConfigError::Environment {
                variable: "CME_AUTOSAVE_INTERVAL_MS".to_string(),
                value,
            })?;
        }
        if let Some(value) = lookup("CME_LANGUAGE") {
            self.preferred_language = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("backend_url", &self.backend_url),
            ("package_root_url", &self.package_root_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{field} must be an http(s) URL: {url}"
                )));
            }
        }
        if self.preferred_language.trim().is_empty() {
            return Err(ConfigError::Validation(
                "preferred_language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Autosave period, `None` when autosave is disabled
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_ms > 0).then(|| Duration::from_millis(self.autosave_interval_ms))
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            language: self.preferred_language.clone(),
            default_color: self.default_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EditorConfig::from_toml(
            r##"
            preferred_language = "cs"
            default_color = "#112233"
            "##,
        )
        .unwrap();
        assert_eq!(config.preferred_language, "cs");
        assert_eq!(config.default_color, Color::rgb(0x11, 0x22, 0x33));
        assert_eq!(config.backend_url, EditorConfig::default().backend_url);
    }

    #[test]
    fn test_environment_overrides() {
        let variables: HashMap<&str, &str> = [
            ("CME_BACKEND_URL", "https://backend.example"),
            ("CME_AUTOSAVE_INTERVAL_MS", "0"),
        ]
        .into_iter()
        .collect();
        let mut config = EditorConfig::default();
        config
            .apply_overrides(|name| variables.get(name).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(config.backend_url, "https://backend.example");
        assert_eq!(config.autosave_interval(), None);

        let result = config.apply_overrides(|name| {
            (name == "CME_AUTOSAVE_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Environment { .. })));
    }

    #[test]
    fn test_validation() {
        let config = EditorConfig {
            backend_url: "ftp://nope".to_string(),
            ..EditorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "autosave_interval_ms = 500").unwrap();

        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.autosave_interval(), Some(Duration::from_millis(500)));

        let missing = EditorConfig::load("/definitely/not/here.toml");
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_invalid_toml() {
        let result = EditorConfig::from_toml("autosave_interval_ms = \"often\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
