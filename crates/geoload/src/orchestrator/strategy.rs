//! Real vs. simulated backend selection.

use std::sync::Arc;

use tracing::debug;

use super::simulated::SimulatedOrchestrator;
use super::{JobService, Orchestrator};
use crate::adapters::http::http_adapters;
use crate::adapters::Adapters;
use crate::broadcast::{JobNotifier, JobRegistry};
use crate::config::{Settings, SettingsHandle};
use crate::error::{AdapterError, ValidationError};
use crate::job::{ExecutionStrategy, JobRecord, JobRequest};

/// Real processing needs both the master switch and a credential source.
pub fn select_strategy(settings: &Settings) -> ExecutionStrategy {
    if settings.processing_enabled && settings.has_credentials() {
        ExecutionStrategy::Real
    } else {
        ExecutionStrategy::Simulated
    }
}

/// Routes each new job to the backend the current settings call for.
///
/// Both backends share one registry and notifier, so reads and
/// subscriptions see every job regardless of how it was executed.
pub struct StrategyRouter {
    settings: SettingsHandle,
    registry: Arc<JobRegistry>,
    notifier: Arc<JobNotifier>,
    real: Arc<dyn JobService>,
    simulated: Arc<dyn JobService>,
}

impl StrategyRouter {
    pub fn new(
        settings: SettingsHandle,
        registry: Arc<JobRegistry>,
        notifier: Arc<JobNotifier>,
        adapters: Adapters,
    ) -> Self {
        let real = Arc::new(Orchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&notifier),
            adapters,
            settings.clone(),
        ));
        let simulated = Arc::new(SimulatedOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&notifier),
            settings.clone(),
        ));
        Self {
            settings,
            registry,
            notifier,
            real,
            simulated,
        }
    }

    /// Router whose real backend talks to the configured REST endpoints.
    pub fn with_http_adapters(
        settings: SettingsHandle,
        registry: Arc<JobRegistry>,
        notifier: Arc<JobNotifier>,
    ) -> Result<Self, AdapterError> {
        let adapters = http_adapters(settings.clone())?;
        Ok(Self::new(settings, registry, notifier, adapters))
    }

    fn backend(&self, strategy: ExecutionStrategy) -> &dyn JobService {
        match strategy {
            ExecutionStrategy::Real => self.real.as_ref(),
            ExecutionStrategy::Simulated => self.simulated.as_ref(),
        }
    }
}

impl JobService for StrategyRouter {
    /// Evaluated against the settings as they are right now.
    fn strategy(&self) -> ExecutionStrategy {
        select_strategy(&self.settings.snapshot())
    }

    fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    fn notifier(&self) -> &Arc<JobNotifier> {
        &self.notifier
    }

    fn create_job(&self, request: JobRequest) -> Result<JobRecord, ValidationError> {
        let strategy = self.strategy();
        debug!(%strategy, owner = %request.owner, "Routing new job");
        self.backend(strategy).create_job(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialSettings;

    fn settings(enabled: bool, token: Option<&str>) -> Settings {
        Settings {
            processing_enabled: enabled,
            credentials: CredentialSettings {
                token: token.map(String::from),
                ..CredentialSettings::default()
            },
            ..Settings::default()
        }
    }

    #[test]
    fn test_select_strategy_truth_table() {
        assert_eq!(select_strategy(&settings(true, Some("t"))), ExecutionStrategy::Real);
        assert_eq!(select_strategy(&settings(true, None)), ExecutionStrategy::Simulated);
        assert_eq!(select_strategy(&settings(false, Some("t"))), ExecutionStrategy::Simulated);
        assert_eq!(select_strategy(&settings(false, None)), ExecutionStrategy::Simulated);
        assert_eq!(select_strategy(&settings(true, Some("   "))), ExecutionStrategy::Simulated);
    }
}
