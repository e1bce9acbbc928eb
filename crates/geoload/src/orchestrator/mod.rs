//! Job orchestration.
//!
//! [`JobService`] is the public contract. [`Orchestrator`] runs jobs against
//! real adapters, [`SimulatedOrchestrator`] fakes them, and [`StrategyRouter`]
//! picks between the two on every `create_job`.

pub mod pipeline;
pub mod poll;
pub mod retry;
pub mod simulated;
pub mod strategy;
pub mod writer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::Adapters;
use crate::broadcast::{JobNotifier, JobRegistry, Subscription, UpdateCallback};
use crate::config::SettingsHandle;
use crate::error::ValidationError;
use crate::job::{ExecutionStrategy, JobRecord, JobRequest};

pub use simulated::SimulatedOrchestrator;
pub use strategy::{select_strategy, StrategyRouter};
pub use writer::JobWriter;

/// A unit of work inside a real pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Stage,
    Transform,
    TableProvisioning,
    Load,
    Verification,
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStep::Stage => write!(f, "Upload"),
            PipelineStep::Transform => write!(f, "Conversion"),
            PipelineStep::TableProvisioning => write!(f, "Table provisioning"),
            PipelineStep::Load => write!(f, "Load"),
            PipelineStep::Verification => write!(f, "Verification"),
        }
    }
}

/// What callers can do with jobs, whichever backend runs them.
///
/// `create_job` must be called from within a Tokio runtime; it spawns the
/// job's pipeline and returns without waiting on it.
pub trait JobService: Send + Sync {
    fn strategy(&self) -> ExecutionStrategy;

    fn registry(&self) -> &Arc<JobRegistry>;

    fn notifier(&self) -> &Arc<JobNotifier>;

    /// Validates `request`, stores a Queued record and starts processing.
    fn create_job(&self, request: JobRequest) -> Result<JobRecord, ValidationError>;

    /// Jobs for `owner`, newest first.
    fn get_jobs(&self, owner: &str) -> Vec<JobRecord> {
        self.registry().list_for_owner(owner)
    }

    fn get_job(&self, job_id: &str) -> Option<JobRecord> {
        self.registry().get(job_id)
    }

    /// Calls `on_update` with the current snapshot and after every change.
    fn subscribe_to_job_updates(&self, job_id: &str, on_update: UpdateCallback) -> Subscription {
        let registry = self.registry();
        self.notifier()
            .subscribe(job_id, || registry.get(job_id), on_update)
    }
}

/// Runs jobs against real stage, transform and sink adapters.
pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    notifier: Arc<JobNotifier>,
    adapters: Adapters,
    settings: SettingsHandle,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        notifier: Arc<JobNotifier>,
        adapters: Adapters,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            registry,
            notifier,
            adapters,
            settings,
        }
    }
}

impl JobService for Orchestrator {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Real
    }

    fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    fn notifier(&self) -> &Arc<JobNotifier> {
        &self.notifier
    }

    fn create_job(&self, request: JobRequest) -> Result<JobRecord, ValidationError> {
        let record = request.into_record(ExecutionStrategy::Real)?;
        let settings = self.settings.snapshot();
        let (writer, record) = writer::register_job(&self.registry, &self.notifier, record);
        info!(
            job_id = %record.id,
            owner = %record.owner,
            target = %record.qualified_table(),
            "Job created"
        );

        let span = pipeline::job_span(&record);
        tokio::spawn(pipeline::run_guarded(
            writer.clone(),
            span,
            pipeline::run(writer, self.adapters.clone(), settings),
        ));
        Ok(record)
    }
}
