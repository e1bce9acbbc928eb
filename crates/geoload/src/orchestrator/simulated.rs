//! Orchestrator that fabricates every step.
//!
//! Used when processing is disabled or no credentials are configured. Jobs
//! walk the same status sequence as real ones, always succeed, and say
//! plainly that nothing was written.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::pipeline::{job_span, run_guarded};
use super::poll::{LOAD_PROGRESS_END, LOAD_PROGRESS_START};
use super::writer::{register_job, JobWriter};
use super::JobService;
use crate::broadcast::{JobNotifier, JobRegistry};
use crate::config::{SettingsHandle, SimulationSettings};
use crate::error::{PipelineError, ValidationError};
use crate::job::{ExecutionStrategy, JobRecord, JobRequest, JobSource, JobStatus, LogLevel};

pub struct SimulatedOrchestrator {
    registry: Arc<JobRegistry>,
    notifier: Arc<JobNotifier>,
    settings: SettingsHandle,
}

impl SimulatedOrchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        notifier: Arc<JobNotifier>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            registry,
            notifier,
            settings,
        }
    }
}

impl JobService for SimulatedOrchestrator {
    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Simulated
    }

    fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    fn notifier(&self) -> &Arc<JobNotifier> {
        &self.notifier
    }

    fn create_job(&self, request: JobRequest) -> Result<JobRecord, ValidationError> {
        let record = request.into_record(ExecutionStrategy::Simulated)?;
        let simulation = self.settings.snapshot().simulation;
        let (writer, record) = register_job(&self.registry, &self.notifier, record);
        info!(job_id = %record.id, owner = %record.owner, "Simulated job created");

        let span = job_span(&record);
        tokio::spawn(run_guarded(
            writer.clone(),
            span,
            simulate(writer, record.clone(), simulation),
        ));
        Ok(record)
    }
}

async fn simulate(
    writer: JobWriter,
    job: JobRecord,
    simulation: SimulationSettings,
) -> Result<(), PipelineError> {
    let delay = Duration::from_millis(simulation.step_delay_ms);
    let pause = || tokio::time::sleep(delay);

    if let JobSource::LocalFile { .. } = &job.source {
        writer.advance(
            JobStatus::Uploading,
            5,
            format!("Simulating upload of {}", job.source.describe()),
        );
        pause().await;
        writer.progress(25);
    }

    writer.advance(JobStatus::Converting, 25, "Simulating conversion");
    pause().await;
    writer.apply(|j| {
        j.record_count = Some(simulation.record_count);
        j.set_progress(50);
    });
    writer.log(
        LogLevel::Info,
        format!("Simulated conversion produced {} records", simulation.record_count),
    );

    if let Some(fields) = job.schema_mode.explicit_fields() {
        writer.advance(
            JobStatus::TableProvisioning,
            55,
            format!(
                "Simulating creation of table {} with {} columns",
                job.qualified_table(),
                fields.len()
            ),
        );
        pause().await;
    }

    let remote_job_id = format!("simulated:{}", uuid::Uuid::new_v4().simple());
    writer.advance(
        JobStatus::Loading,
        LOAD_PROGRESS_START,
        format!("Simulating load job {}", remote_job_id),
    );
    writer.apply(|j| j.remote_load_job_id = Some(remote_job_id.clone()));
    pause().await;
    writer.progress(LOAD_PROGRESS_END);

    writer.complete(format!(
        "Simulated load completed: {} rows for {} (no data was written)",
        simulation.record_count,
        job.qualified_table()
    ));
    Ok(())
}
