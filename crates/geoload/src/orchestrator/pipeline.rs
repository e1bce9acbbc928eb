//! Step sequencing for real jobs.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{info_span, Instrument, Span};

use super::poll::{wait_for_load, LOAD_PROGRESS_START};
use super::retry::with_backoff;
use super::writer::JobWriter;
use super::PipelineStep;
use crate::adapters::{Adapters, LoadRequest, StageFile, TableProvisioning};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::job::{object_uri, JobRecord, JobSource, JobStatus, LogLevel};
use crate::sanitize::redact_path;

const STAGE_START: u8 = 5;
const STAGE_END: u8 = 25;
const TRANSFORM_END: u8 = 50;
const PROVISION_PROGRESS: u8 = 55;

/// Span covering one job's whole pipeline.
pub(crate) fn job_span(job: &JobRecord) -> Span {
    let source = match &job.source {
        JobSource::LocalFile { path, .. } => redact_path(path),
        JobSource::RemoteReference { bucket, path } => object_uri(bucket, path),
    };
    info_span!("pipeline",
        job_id = %job.id,
        owner = %job.owner,
        strategy = %job.strategy,
        source = %source,
        target = %job.qualified_table(),
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Drives `work` to the end and turns an error or panic into a Failed job.
pub(crate) async fn run_guarded<F>(writer: JobWriter, span: Span, work: F)
where
    F: Future<Output = Result<(), PipelineError>>,
{
    let outcome = AssertUnwindSafe(work).catch_unwind().instrument(span).await;
    let err = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err,
        Err(payload) => PipelineError::Panicked(panic_message(payload)),
    };
    writer.fail(&err);
}

/// Stage, transform, provision, load, verify.
pub(crate) async fn run(
    writer: JobWriter,
    adapters: Adapters,
    settings: Settings,
) -> Result<(), PipelineError> {
    let Some(job) = writer.snapshot() else {
        return Err(PipelineError::Panicked(format!(
            "job {} vanished from the registry",
            writer.job_id()
        )));
    };
    let project = settings.project_id.as_str();

    // Step 1: Stage
    let source_uri = match &job.source {
        JobSource::LocalFile {
            file_name,
            size_bytes,
            path,
        } => {
            writer.advance(
                JobStatus::Uploading,
                STAGE_START,
                format!("Uploading {}", job.source.describe()),
            );
            let file = StageFile {
                path: path.clone(),
                file_name: file_name.clone(),
                size_bytes: *size_bytes,
            };
            let destination = stage_destination(&settings.stage.path_prefix, &job.id, file_name);
            let staged = with_backoff(
                &settings.stage.upload_retry,
                |_| adapters.stage.upload(&file, &destination),
                |next, max, delay, e| {
                    writer.log(
                        LogLevel::Warn,
                        format!(
                            "Upload attempt failed ({}), retrying in {}ms (attempt {}/{})",
                            e,
                            delay.as_millis(),
                            next,
                            max
                        ),
                    )
                },
            )
            .instrument(info_span!("step", step = %PipelineStep::Stage))
            .await
            .map_err(|e| PipelineError::step(PipelineStep::Stage, e))?;

            writer.progress(STAGE_END);
            writer.log(
                LogLevel::Info,
                format!("Uploaded {} bytes to {}", staged.size_bytes, staged.uri),
            );
            staged.uri
        }
        JobSource::RemoteReference { bucket, path } => {
            let uri = object_uri(bucket, path);
            writer.log(LogLevel::Info, format!("Using staged object {}", uri));
            uri
        }
    };

    // Step 2: Transform
    writer.advance(
        JobStatus::Converting,
        STAGE_END,
        format!("Converting {}", source_uri),
    );
    let progress_writer = writer.clone();
    let on_progress = move |pct: u8| {
        let span = u32::from(TRANSFORM_END - STAGE_END);
        let scaled = u32::from(pct.min(100)) * span / 100;
        progress_writer.progress(STAGE_END + scaled as u8);
    };
    let converted = adapters
        .transform
        .convert(&source_uri, &job.schema_mode, &on_progress)
        .instrument(info_span!("step", step = %PipelineStep::Transform))
        .await
        .map_err(|e| PipelineError::step(PipelineStep::Transform, e))?;

    writer.apply(|j| {
        j.record_count = Some(converted.record_count);
        j.set_progress(TRANSFORM_END);
    });
    writer.log(
        LogLevel::Info,
        format!(
            "Converted {} records to {}",
            converted.record_count, converted.converted_uri
        ),
    );

    // Step 3: Table provisioning
    let explicit_fields = job.schema_mode.explicit_fields();
    if let Some(fields) = explicit_fields {
        writer.advance(
            JobStatus::TableProvisioning,
            PROVISION_PROGRESS,
            format!("Creating table {} with {} columns", job.qualified_table(), fields.len()),
        );
        let outcome = adapters
            .sink
            .create_table(project, &job.target_dataset, &job.target_table, fields)
            .instrument(info_span!("step", step = %PipelineStep::TableProvisioning))
            .await
            .map_err(|e| PipelineError::step(PipelineStep::TableProvisioning, e))?;
        let message = match outcome {
            TableProvisioning::Created => format!("Created table {}", job.qualified_table()),
            TableProvisioning::AlreadyExists => format!(
                "Table {} already exists, loading into it",
                job.qualified_table()
            ),
        };
        writer.log(LogLevel::Info, message);
    }

    // Step 4: Load
    writer.advance(
        JobStatus::Loading,
        LOAD_PROGRESS_START,
        format!("Submitting load job into {}", job.qualified_table()),
    );
    let load = LoadRequest {
        project: project.to_string(),
        dataset: job.target_dataset.clone(),
        table: job.target_table.clone(),
        source_uri: converted.converted_uri.clone(),
        schema: explicit_fields.map(|f| f.to_vec()),
    };
    let remote_job_id = adapters
        .sink
        .submit_load(&load)
        .instrument(info_span!("step", step = %PipelineStep::Load))
        .await
        .map_err(|e| PipelineError::step(PipelineStep::Load, e))?;
    writer.apply(|j| j.remote_load_job_id = Some(remote_job_id.clone()));
    writer.log(
        LogLevel::Info,
        format!("Load job {} submitted", remote_job_id),
    );

    let status = wait_for_load(&writer, adapters.sink.as_ref(), &remote_job_id, &settings.load_poll)
        .instrument(info_span!("step", step = %PipelineStep::Load, remote_job_id = %remote_job_id))
        .await?;
    let rows = status.rows_loaded.unwrap_or(converted.record_count);
    writer.log(
        LogLevel::Info,
        format!("Load job {} completed: {} rows loaded", remote_job_id, rows),
    );

    // Step 5: Verification
    if settings.verification.enabled {
        let sample = adapters
            .sink
            .sample_query(
                project,
                &job.target_dataset,
                &job.target_table,
                settings.verification.sample_limit,
            )
            .instrument(info_span!("step", step = %PipelineStep::Verification))
            .await;
        match sample {
            Ok(rows) => writer.log(
                LogLevel::Info,
                format!("Verification query returned {} sample rows", rows.len()),
            ),
            Err(e) => writer.log(
                LogLevel::Warn,
                format!("Verification query failed, the load itself succeeded: {}", e),
            ),
        }
    }

    // Step 6: Done
    writer.complete(format!(
        "Loaded {} rows into {}",
        rows,
        job.qualified_table()
    ));
    Ok(())
}

/// Object name for an uploaded file: `<prefix>/<job id>/<file name>`.
pub fn stage_destination(prefix: &str, job_id: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", job_id, file_name)
    } else {
        format!("{}/{}/{}", prefix, job_id, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_destination() {
        assert_eq!(
            stage_destination("uploads/", "job-1", "parcels.zip"),
            "uploads/job-1/parcels.zip"
        );
        assert_eq!(stage_destination("", "job-1", "parcels.zip"), "job-1/parcels.zip");
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic");
    }
}
