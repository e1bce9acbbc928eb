//! Access token resolution.
//!
//! A token may be given three ways, checked in this order:
//!
//! 1. `token` - inline value, handy for local runs
//! 2. `tokenFile` - path to a file holding the token (mounted secrets)
//! 3. `tokenEnvVar` - name of an environment variable holding the token

use std::path::PathBuf;

use secrecy::SecretString;

use crate::config::CredentialSettings;
use crate::error::AdapterError;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No access token configured (set token, tokenFile or tokenEnvVar)")]
    NoSourceProvided,

    #[error("Failed to read token file '{path}': {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token file '{path}' is empty")]
    EmptyFile { path: PathBuf },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

impl From<SecretError> for AdapterError {
    fn from(err: SecretError) -> Self {
        AdapterError::Auth(err.to_string())
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Resolves the configured access token.
pub fn resolve_access_token(credentials: &CredentialSettings) -> Result<SecretString, SecretError> {
    if let Some(value) = non_empty(credentials.token.as_ref()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = non_empty(credentials.token_file.as_ref()) {
        let path = expand_home(path);
        let content = std::fs::read_to_string(&path).map_err(|source| SecretError::FileReadError {
            path: path.clone(),
            source,
        })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(SecretError::EmptyFile { path });
        }
        return Ok(SecretString::from(token.to_string()));
    }

    if let Some(name) = non_empty(credentials.token_env_var.as_ref()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Expands a leading `~` using the platform home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
