use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{RefMenuError, Result};

/// What arrow keys do while a session is armed. The original menus disagree
/// on this, so it is an explicit product decision here: `Keep` leaves the
/// session open (caret movement is not a content edit), `Cancel` closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKeyPolicy {
    Keep,
    Cancel,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkspaceConfig {
    pub id: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            result_limit: default_result_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeysConfig {
    #[serde(default = "default_arrow_keys")]
    pub arrow_keys: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            arrow_keys: default_arrow_keys(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    80
}

fn default_result_limit() -> usize {
    20
}

fn default_arrow_keys() -> String {
    "keep".into()
}

impl EngineConfig {
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::defaults()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("REFMENU_").split("_").lowercase(false))
            .extract()
            .map_err(|e| RefMenuError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workspace.id.is_empty() {
            return Err(RefMenuError::Config("workspace.id is required".into()));
        }
        if self.search.result_limit == 0 {
            return Err(RefMenuError::Config(
                "search.result_limit must be at least 1".into(),
            ));
        }
        if !matches!(self.keys.arrow_keys.as_str(), "keep" | "cancel") {
            return Err(RefMenuError::Config(format!(
                "keys.arrow_keys must be \"keep\" or \"cancel\", got \"{}\"",
                self.keys.arrow_keys
            )));
        }
        Ok(())
    }

    pub fn arrow_key_policy(&self) -> ArrowKeyPolicy {
        match self.keys.arrow_keys.as_str() {
            "cancel" => ArrowKeyPolicy::Cancel,
            _ => ArrowKeyPolicy::Keep,
        }
    }

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(|xdg| PathBuf::from(xdg).join("refmenu"))
            .or_else(|| {
                directories::BaseDirs::new()
                    .map(|dirs| dirs.home_dir().join(".config").join("refmenu"))
            })
    }

    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = r#"[workspace]
id = "your-workspace-id"

[search]
debounce_ms = 80
result_limit = 20

[keys]
arrow_keys = "keep"  # keep | cancel
"#;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn defaults() -> Self {
        Self {
            workspace: WorkspaceConfig { id: String::new() },
            search: SearchConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_valid_config_from_toml() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[workspace]
id = "ws-1"

[search]
debounce_ms = 120
result_limit = 10

[keys]
arrow_keys = "cancel"
"#,
        );

        let config = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(config.workspace.id, "ws-1");
        assert_eq!(config.search.debounce_ms, 120);
        assert_eq!(config.search.result_limit, 10);
        assert_eq!(config.arrow_key_policy(), ArrowKeyPolicy::Cancel);
    }

    #[test]
    fn defaults_apply_for_missing_optional_sections() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[workspace]
id = "ws-1"
"#,
        );

        let config = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(config.search.debounce_ms, 80);
        assert_eq!(config.search.result_limit, 20);
        assert_eq!(config.arrow_key_policy(), ArrowKeyPolicy::Keep);
    }

    #[test]
    fn validate_fails_without_workspace_id() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[workspace]
id = ""
"#,
        );

        let err = EngineConfig::load_from_path(&path);
        assert!(err.is_err());
        assert!(err.unwrap_err().to_string().contains("workspace.id"));
    }

    #[test]
    fn validate_fails_on_zero_result_limit() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[workspace]
id = "ws-1"

[search]
result_limit = 0
"#,
        );

        let err = EngineConfig::load_from_path(&path);
        assert!(err.is_err());
        assert!(err.unwrap_err().to_string().contains("result_limit"));
    }

    #[test]
    fn validate_rejects_unknown_arrow_key_policy() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[workspace]
id = "ws-1"

[keys]
arrow_keys = "reposition"
"#,
        );

        let err = EngineConfig::load_from_path(&path);
        assert!(err.is_err());
        assert!(err.unwrap_err().to_string().contains("arrow_keys"));
    }

    #[test]
    fn write_default_creates_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("subdir").join("config.toml");

        EngineConfig::write_default(&path).unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("your-workspace-id"));
        assert!(content.contains("arrow_keys"));
    }

    #[test]
    fn config_dir_returns_some() {
        assert!(EngineConfig::config_dir().is_some());
    }
}
