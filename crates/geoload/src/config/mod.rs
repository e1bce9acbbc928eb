pub mod loader;
pub mod schema;

use std::sync::{Arc, RwLock};

pub use loader::{default_settings_path, load_settings, load_settings_from_str};
pub use schema::{
    CredentialSettings, EndpointSettings, HttpSettings, LoadPollSettings, LogFormat,
    LoggingSettings, RetrySettings, Settings, SimulationSettings, StageSettings,
    VerificationSettings,
};

/// Shared, swappable settings.
///
/// Every `create_job` reads a fresh [`SettingsHandle::snapshot`], so a
/// [`SettingsHandle::replace`] takes effect for the next job without restart.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                log::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    /// Validates and installs new settings.
    pub fn replace(&self, settings: Settings) -> Result<(), crate::error::ConfigError> {
        loader::validate_settings(&settings)?;
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_is_visible_to_clones() {
        let handle = SettingsHandle::new(Settings::default());
        let other = handle.clone();

        let mut updated = Settings::default();
        updated.load_poll.max_attempts = 15;
        handle.replace(updated).unwrap();

        assert_eq!(other.snapshot().load_poll.max_attempts, 15);
    }

    #[test]
    fn test_replace_rejects_invalid_settings() {
        let handle = SettingsHandle::default();
        let mut bad = Settings::default();
        bad.version = "9".to_string();
        assert!(handle.replace(bad).is_err());
        assert_eq!(handle.snapshot().version, "1");
    }
}
