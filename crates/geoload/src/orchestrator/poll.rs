//! Load Poll Loop.

use std::time::Duration;

use tracing::debug;

use super::writer::JobWriter;
use super::PipelineStep;
use crate::adapters::{LoadState, LoadStatus, SinkAdapter};
use crate::config::LoadPollSettings;
use crate::error::PipelineError;
use crate::job::LogLevel;

/// Progress while loading runs from this value...
pub const LOAD_PROGRESS_START: u8 = 60;
/// ...up to this one as the poll budget is consumed.
pub const LOAD_PROGRESS_END: u8 = 95;

/// Progress after `attempt` of `max_attempts` status checks.
pub fn poll_progress(attempt: u32, max_attempts: u32) -> u8 {
    let max_attempts = max_attempts.max(1);
    let attempt = attempt.min(max_attempts);
    let span = u32::from(LOAD_PROGRESS_END - LOAD_PROGRESS_START);
    LOAD_PROGRESS_START + (attempt * span / max_attempts) as u8
}

/// Polls `remote_job_id` until it finishes or the attempt budget runs out.
///
/// Transient status-check failures are logged and count against the same
/// budget. Any other adapter error ends the loop.
pub async fn wait_for_load(
    writer: &JobWriter,
    sink: &dyn SinkAdapter,
    remote_job_id: &str,
    settings: &LoadPollSettings,
) -> Result<LoadStatus, PipelineError> {
    let max_attempts = settings.max_attempts.max(1);
    let interval = Duration::from_millis(settings.interval_ms);

    for attempt in 1..=max_attempts {
        match sink.get_load_status(remote_job_id).await {
            Ok(status) if status.state == LoadState::Done => {
                if status.errors.is_empty() {
                    debug!(remote_job_id, attempt, "Load job done");
                    return Ok(status);
                }
                return Err(PipelineError::LoadFailed {
                    remote_job_id: remote_job_id.to_string(),
                    errors: status.errors.join("; "),
                });
            }
            Ok(status) => {
                let state = match status.state {
                    LoadState::Pending => "pending",
                    _ => "running",
                };
                writer.progress(poll_progress(attempt, max_attempts));
                writer.log(
                    LogLevel::Info,
                    format!(
                        "Load job {} is {} (check {}/{})",
                        remote_job_id, state, attempt, max_attempts
                    ),
                );
            }
            Err(e) if e.is_retryable() => {
                writer.log(
                    LogLevel::Warn,
                    format!(
                        "Status check {}/{} for load job {} failed, will retry: {}",
                        attempt, max_attempts, remote_job_id, e
                    ),
                );
            }
            Err(e) => return Err(PipelineError::step(PipelineStep::Load, e)),
        }

        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(PipelineError::LoadTimedOut {
        remote_job_id: remote_job_id.to_string(),
        attempts: max_attempts,
    })
}
