//! Tool configuration.
//!
//! Settings are read from `.ocatool.toml` in the working directory, or from
//! the file given with `--config`. Every key is optional.
//!
//! ```toml
//! language = "fra"
//! pretty = true
//! enforce_validation = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".ocatool.toml";

/// Settings shared by all subcommands.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    /// Language used for labels and option checks (`eng`, `fra`, ...).
    pub language: String,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Exit with an error when `check` finds invalid answers.
    pub enforce_validation: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            pretty: true,
            enforce_validation: false,
        }
    }
}

impl ToolConfig {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, `.ocatool.toml` in the
    /// current directory is used when present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    debug!("no {CONFIG_FILE}, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// JSON schema of the configuration file.
    pub fn schema() -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::to_value(schemars::schema_for!(ToolConfig))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config = ToolConfig::from_toml("language = \"fra\"").unwrap();
        assert_eq!(config.language, "fra");
        assert!(config.pretty);
        assert!(!config.enforce_validation);
        assert_eq!(ToolConfig::from_toml("").unwrap(), ToolConfig::default());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "pretty = false\nenforce_validation = true\n").unwrap();

        let config = ToolConfig::load(Some(path.as_path())).unwrap();
        assert!(!config.pretty);
        assert!(config.enforce_validation);
        assert_eq!(config.language, "eng");
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ToolConfig::load(Some(dir.path().join("missing.toml").as_path())).is_err());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(ToolConfig::from_toml("pretty = \"yes\"").is_err());
    }

    #[test]
    fn schema_lists_fields() {
        let schema = ToolConfig::schema().unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("language").is_some());
        assert!(properties.get("enforce_validation").is_some());
    }
}
