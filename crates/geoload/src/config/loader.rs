use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::schema::Settings;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/settings-v1.json");

static RE_PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").unwrap());

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let settings: Settings = serde_json::from_value(json_value)?;

    validate_settings(&settings)?;

    Ok(settings)
}

/// `<config dir>/geoload/settings.json`, if the platform has a config dir.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("geoload").join("settings.json"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub(crate) fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != "1" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported settings version: {}", settings.version),
        });
    }

    if settings.load_poll.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "loadPoll.maxAttempts must be at least 1".to_string(),
        });
    }

    if settings.stage.upload_retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "stage.uploadRetry.maxAttempts must be at least 1".to_string(),
        });
    }

    if settings.stage.max_file_size_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "stage.maxFileSizeBytes must be greater than zero".to_string(),
        });
    }

    if settings.processing_enabled {
        if !RE_PROJECT_ID.is_match(&settings.project_id) {
            return Err(ConfigError::Validation {
                message: format!(
                    "projectId '{}' is not a valid project identifier",
                    settings.project_id
                ),
            });
        }
        if settings.stage.bucket.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "stage.bucket is required when processing is enabled".to_string(),
            });
        }
    }

    Ok(())
}
