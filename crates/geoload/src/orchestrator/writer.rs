//! The single writer for one job.
//!
//! Only the task that owns a job holds its [`JobWriter`]. Every mutation goes
//! through the registry and is then published to observers, so stored state
//! and notifications never diverge.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::broadcast::{JobNotifier, JobRegistry};
use crate::error::PipelineError;
use crate::job::{JobRecord, JobStatus, LogLevel};

#[derive(Clone)]
pub struct JobWriter {
    job_id: String,
    registry: Arc<JobRegistry>,
    notifier: Arc<JobNotifier>,
}

/// Stores a freshly queued record and returns the writer that owns it.
pub(crate) fn register_job(
    registry: &Arc<JobRegistry>,
    notifier: &Arc<JobNotifier>,
    mut record: JobRecord,
) -> (JobWriter, JobRecord) {
    while !registry.insert(record.clone()) {
        record.id = uuid::Uuid::new_v4().to_string();
    }
    notifier.publish(&record);
    let writer = JobWriter {
        job_id: record.id.clone(),
        registry: Arc::clone(registry),
        notifier: Arc::clone(notifier),
    };
    (writer, record)
}

fn trace_entry(job_id: &str, level: LogLevel, message: &str) {
    match level {
        LogLevel::Info => info!(job_id = %job_id, "{}", message),
        LogLevel::Warn => warn!(job_id = %job_id, "{}", message),
        LogLevel::Error => error!(job_id = %job_id, "{}", message),
    }
}

impl JobWriter {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn snapshot(&self) -> Option<JobRecord> {
        self.registry.get(&self.job_id)
    }

    /// Applies `mutate`, stores the result and publishes it.
    pub fn apply<F>(&self, mutate: F) -> Option<JobRecord>
    where
        F: FnOnce(&mut JobRecord),
    {
        let snapshot = self.registry.update(&self.job_id, mutate)?;
        self.notifier.publish(&snapshot);
        Some(snapshot)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        trace_entry(&self.job_id, level, &message);
        self.apply(|job| job.append_log(level, message));
    }

    /// Enters `status`, raises progress and records `message`.
    pub fn advance(&self, status: JobStatus, progress: u8, message: impl Into<String>) {
        let message = message.into();
        trace_entry(&self.job_id, LogLevel::Info, &message);
        self.apply(|job| {
            if let Err(e) = job.transition(status) {
                warn!(job_id = %job.id, "{}", e);
            }
            job.set_progress(progress);
            job.append_log(LogLevel::Info, message);
        });
    }

    /// Raises progress. No-op when it would not change anything.
    pub fn progress(&self, progress: u8) {
        let raises = self
            .registry
            .get(&self.job_id)
            .is_some_and(|job| !job.is_finished() && job.progress < progress.min(100));
        if raises {
            self.apply(|job| job.set_progress(progress));
        }
    }

    /// Marks the job Completed with a final status message.
    pub fn complete(&self, message: impl Into<String>) {
        let message = message.into();
        trace_entry(&self.job_id, LogLevel::Info, &message);
        self.apply(|job| {
            if let Err(e) = job.transition(JobStatus::Completed) {
                warn!(job_id = %job.id, "{}", e);
                return;
            }
            job.message = message.clone();
            job.append_log(LogLevel::Info, message);
        });
    }

    /// Records `err` and its troubleshooting hint, then marks the job Failed.
    pub fn fail(&self, err: &PipelineError) {
        let message = err.to_string();
        let hint = err.hint();
        error!(job_id = %self.job_id, kind = err.kind(), "{}", message);
        self.apply(|job| {
            if job.is_finished() {
                warn!(job_id = %job.id, "Ignoring failure for finished job: {}", message);
                return;
            }
            job.append_log(LogLevel::Error, format!("{}: {}", err.kind(), message));
            job.append_log(LogLevel::Info, format!("Hint: {}", hint));
            if let Err(e) = job.fail(message) {
                warn!(job_id = %job.id, "{}", e);
            }
        });
    }
}
