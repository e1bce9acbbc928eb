//! The authoritative state of one processing request.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a job.
///
/// Variants are declared in pipeline order; a job only ever moves forward
/// through this list, and `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Uploading,
    Converting,
    TableProvisioning,
    Loading,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position along the pipeline. Both terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Uploading => 1,
            JobStatus::Converting => 2,
            JobStatus::TableProvisioning => 3,
            JobStatus::Loading => 4,
            JobStatus::Completed | JobStatus::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Forward moves (including skips) are allowed; backward moves and any
    /// move out of a terminal state are not.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JobStatus::Failed || next.rank() >= self.rank()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Uploading => write!(f, "Uploading"),
            JobStatus::Converting => write!(f, "Converting"),
            JobStatus::TableProvisioning => write!(f, "Provisioning table"),
            JobStatus::Loading => write!(f, "Loading"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LocalFile,
    RemoteReference,
}

/// Where the data for a job comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSource {
    /// A file on the submitting machine that must be staged first.
    #[serde(rename_all = "camelCase")]
    LocalFile {
        file_name: String,
        size_bytes: u64,
        /// Machine-local; kept out of serialized records.
        #[serde(skip_serializing, default)]
        path: PathBuf,
    },
    /// An object already present in the stage.
    RemoteReference { bucket: String, path: String },
}

impl JobSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            JobSource::LocalFile { .. } => SourceKind::LocalFile,
            JobSource::RemoteReference { .. } => SourceKind::RemoteReference,
        }
    }

    /// Human-readable description used in job logs.
    pub fn describe(&self) -> String {
        match self {
            JobSource::LocalFile {
                file_name,
                size_bytes,
                ..
            } => format!("{} ({})", file_name, format_size(*size_bytes)),
            JobSource::RemoteReference { bucket, path } => object_uri(bucket, path),
        }
    }
}

/// Builds a `gs://` style URI for a staged object.
pub fn object_uri(bucket: &str, path: &str) -> String {
    format!("gs://{}/{}", bucket, path.trim_start_matches('/'))
}

fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

/// One column of an explicit table schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: FieldMode,
}

impl SchemaField {
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            mode: FieldMode::Nullable,
        }
    }

    pub fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "fields", rename_all = "snake_case")]
pub enum SchemaMode {
    #[default]
    AutoDetect,
    Explicit(Vec<SchemaField>),
}

impl SchemaMode {
    pub fn explicit_fields(&self) -> Option<&[SchemaField]> {
        match self {
            SchemaMode::AutoDetect => None,
            SchemaMode::Explicit(fields) => Some(fields),
        }
    }
}

/// Which backend executes a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Simulated,
    Real,
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategy::Simulated => write!(f, "simulated"),
            ExecutionStrategy::Real => write!(f, "real"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid status transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A job and its full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Unique job identifier.
    pub id: String,
    /// Submitting principal.
    pub owner: String,
    pub source: JobSource,
    pub target_dataset: String,
    pub target_table: String,
    pub schema_mode: SchemaMode,
    /// Backend chosen when the job was created.
    pub strategy: ExecutionStrategy,
    pub status: JobStatus,
    /// Percentage complete, 0 to 100.
    pub progress: u8,
    /// Current step message.
    pub message: String,
    /// Bumped on every stored mutation; lets observers discard stale snapshots.
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_load_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub log: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Creates a queued record with a fresh identifier.
    pub fn queued(
        owner: String,
        source: JobSource,
        target_dataset: String,
        target_table: String,
        schema_mode: SchemaMode,
        strategy: ExecutionStrategy,
    ) -> Self {
        let mut record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner,
            source,
            target_dataset,
            target_table,
            schema_mode,
            strategy,
            status: JobStatus::Queued,
            progress: 0,
            message: "Job queued for processing".to_string(),
            revision: 0,
            remote_load_job_id: None,
            record_count: None,
            error_message: None,
            log: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        };
        let line = format!(
            "Job queued ({} execution): {} -> {}.{}",
            strategy,
            record.source.describe(),
            record.target_dataset,
            record.target_table
        );
        record.append_log(LogLevel::Info, line);
        record
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Fully qualified `dataset.table` name.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.target_dataset, self.target_table)
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Appends a log line. Timestamps never go backward even if the wall
    /// clock does.
    pub fn append_log(&mut self, level: LogLevel, message: impl Into<String>) {
        let now = Utc::now();
        let timestamp = match self.log.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        self.log.push(LogEntry {
            timestamp,
            level,
            message: message.into(),
        });
    }

    /// Moves to a non-terminal or `Completed` status.
    ///
    /// Use [`JobRecord::fail`] to enter `Failed`.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if next == JobStatus::Failed || !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.message = next.to_string();
        if next == JobStatus::Completed {
            self.progress = 100;
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Raises progress, never lowering it. Ignored once terminal.
    pub fn set_progress(&mut self, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
    }

    /// Enters `Failed`, keeping the last known progress.
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition {
                from: self.status,
                to: JobStatus::Failed,
            });
        }
        let error_message = error_message.into();
        self.status = JobStatus::Failed;
        self.message = "Processing failed".to_string();
        self.error_message = Some(error_message);
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}
