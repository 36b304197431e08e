//! Application configuration for edumeta.
//!
//! User config lives at `~/.edumeta/edumeta.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EduMetaError, Result};
use crate::types::KnowledgePolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "edumeta.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".edumeta";

// ---------------------------------------------------------------------------
// Config structs (matching edumeta.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source dataset field names.
    #[serde(default)]
    pub fields: FieldNames,

    /// Extraction defaults.
    #[serde(default)]
    pub extract: ExtractDefaults,
}

/// `[fields]` section: names of the fields read from the source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Item identifiers per timestep.
    #[serde(default = "default_question_field")]
    pub question_id: String,

    /// Knowledge identifiers per timestep.
    #[serde(default = "default_knowledge_field")]
    pub knowledge: String,

    /// Optional correctness labels.
    #[serde(default = "default_correctness_field")]
    pub correctness: String,

    /// Optional validity mask.
    #[serde(default = "default_mask_field")]
    pub mask: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            question_id: default_question_field(),
            knowledge: default_knowledge_field(),
            correctness: default_correctness_field(),
            mask: default_mask_field(),
        }
    }
}

fn default_question_field() -> String {
    "question_id".into()
}
fn default_knowledge_field() -> String {
    "skill".into()
}
fn default_correctness_field() -> String {
    "y".into()
}
fn default_mask_field() -> String {
    "mask".into()
}

/// `[extract]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractDefaults {
    /// How conflicting question → knowledge observations are resolved.
    #[serde(default)]
    pub knowledge_policy: KnowledgePolicy,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.edumeta/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EduMetaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.edumeta/edumeta.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EduMetaError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        EduMetaError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EduMetaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| EduMetaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EduMetaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("question_id"));
        assert!(toml_str.contains("first-seen"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fields, FieldNames::default());
        assert_eq!(parsed.extract.knowledge_policy, KnowledgePolicy::FirstSeen);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[fields]
knowledge = "concept"

[extract]
knowledge_policy = "majority"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fields.knowledge, "concept");
        assert_eq!(config.fields.question_id, "question_id");
        assert_eq!(config.fields.mask, "mask");
        assert_eq!(config.extract.knowledge_policy, KnowledgePolicy::Majority);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let toml_str = "[extract]\nknowledge_policy = \"random\"\n";
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn load_config_from_reports_path_on_parse_failure() {
        let path = std::env::temp_dir().join(format!(
            "edumeta-config-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[fields\n").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_file(&path);
    }
}
