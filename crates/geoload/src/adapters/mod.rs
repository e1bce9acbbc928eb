//! Contracts for the external services a job talks to.
//!
//! Each adapter accepts typed input and returns typed output or a classified
//! [`AdapterError`]. Adapters never retry; that is the orchestrator's call.

pub mod http;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, ValidationError};
use crate::job::{SchemaField, SchemaMode};

pub use http::{ApiClient, HttpSink, HttpStage, HttpTransform};

/// A local file handed to the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Durable location of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedObject {
    pub uri: String,
    pub bucket: String,
    pub size_bytes: u64,
}

/// Output of the transform service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedSource {
    pub converted_uri: String,
    pub record_count: u64,
}

/// Outcome of a create-table call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableProvisioning {
    Created,
    AlreadyExists,
}

/// Parameters for an asynchronous load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub source_uri: String,
    /// `None` lets the sink detect the schema itself.
    pub schema: Option<Vec<SchemaField>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadState {
    Pending,
    Running,
    Done,
}

/// Status of a remote load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStatus {
    pub state: LoadState,
    pub errors: Vec<String>,
    pub rows_loaded: Option<u64>,
}

impl LoadStatus {
    pub fn pending() -> Self {
        Self {
            state: LoadState::Pending,
            errors: Vec::new(),
            rows_loaded: None,
        }
    }

    pub fn running() -> Self {
        Self {
            state: LoadState::Running,
            errors: Vec::new(),
            rows_loaded: None,
        }
    }

    pub fn done(rows_loaded: u64) -> Self {
        Self {
            state: LoadState::Done,
            errors: Vec::new(),
            rows_loaded: Some(rows_loaded),
        }
    }

    pub fn done_with_errors(errors: Vec<String>) -> Self {
        Self {
            state: LoadState::Done,
            errors,
            rows_loaded: None,
        }
    }
}

/// Progress callback for long conversions, called with 0..=100.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

#[async_trait]
pub trait StageAdapter: Send + Sync {
    /// Uploads `file` under `destination` and returns its location.
    async fn upload(
        &self,
        file: &StageFile,
        destination: &str,
    ) -> Result<StagedObject, AdapterError>;
}

#[async_trait]
pub trait TransformAdapter: Send + Sync {
    /// Converts the object at `source_uri` into a sink-ingestible format.
    async fn convert(
        &self,
        source_uri: &str,
        schema_mode: &SchemaMode,
        on_progress: ProgressFn<'_>,
    ) -> Result<ConvertedSource, AdapterError>;
}

#[async_trait]
pub trait SinkAdapter: Send + Sync {
    async fn create_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        schema: &[SchemaField],
    ) -> Result<TableProvisioning, AdapterError>;

    /// Starts a load job and returns the remote job id.
    async fn submit_load(&self, request: &LoadRequest) -> Result<String, AdapterError>;

    async fn get_load_status(&self, remote_job_id: &str) -> Result<LoadStatus, AdapterError>;

    async fn sample_query(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        limit: u32,
    ) -> Result<Vec<serde_json::Value>, AdapterError>;
}

/// The three collaborators a real pipeline needs.
#[derive(Clone)]
pub struct Adapters {
    pub stage: Arc<dyn StageAdapter>,
    pub transform: Arc<dyn TransformAdapter>,
    pub sink: Arc<dyn SinkAdapter>,
}

impl Adapters {
    pub fn new(
        stage: Arc<dyn StageAdapter>,
        transform: Arc<dyn TransformAdapter>,
        sink: Arc<dyn SinkAdapter>,
    ) -> Self {
        Self {
            stage,
            transform,
            sink,
        }
    }
}

/// Rejects files over `limit` bytes before any network call.
pub fn check_file_size(name: &str, size_bytes: u64, limit: u64) -> Result<(), AdapterError> {
    if size_bytes > limit {
        return Err(AdapterError::Validation(ValidationError::FileTooLarge {
            name: name.to_string(),
            size: size_bytes,
            limit,
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_size() {
        assert!(check_file_size("a.zip", 10, 10).is_ok());
        let err = check_file_size("a.zip", 11, 10).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Validation(ValidationError::FileTooLarge { size: 11, limit: 10, .. })
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_load_status_constructors() {
        assert_eq!(LoadStatus::pending().state, LoadState::Pending);
        assert_eq!(LoadStatus::running().state, LoadState::Running);
        assert_eq!(LoadStatus::done(500).rows_loaded, Some(500));
        let failed = LoadStatus::done_with_errors(vec!["bad row".into()]);
        assert_eq!(failed.state, LoadState::Done);
        assert_eq!(failed.errors.len(), 1);
    }
}
