use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::PipelineStep;

#[derive(Error, Debug)]
pub enum GeoloadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid job request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Settings validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Rejections raised before a job exists or before a step touches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Owner must not be empty")]
    EmptyOwner,

    #[error("Target table must not be empty")]
    MissingTargetTable,

    #[error("Target table '{0}' must have the form 'dataset.table'")]
    MalformedTargetTable(String),

    #[error("Invalid {kind} name '{value}': must start with a letter and contain only letters, digits and underscores")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Local file is empty or has no name")]
    EmptyFile,

    #[error("Remote reference requires both a bucket and a path")]
    MissingRemoteReference,

    #[error("Explicit schema must declare at least one field")]
    EmptySchema,

    #[error("File '{name}' is {size} bytes, which exceeds the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("File '{name}' could not be read: {reason}")]
    UnreadableFile { name: String, reason: String },
}

/// Classified failures reported by the stage, transform and sink adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Remote service rejected the request: {0}")]
    Remote(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AdapterError {
    /// Returns true for failures of the transport rather than of the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Network(_) | AdapterError::Timeout(_))
    }

    /// Short classification label used in job logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Auth(_) => "AuthError",
            AdapterError::Quota(_) => "QuotaError",
            AdapterError::Timeout(_) => "TimeoutError",
            AdapterError::Remote(_) => "RemoteError",
            AdapterError::Network(_) => "NetworkError",
            AdapterError::Validation(_) => "ValidationError",
        }
    }
}

/// A failure that ends a job's pipeline.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("{step} failed: {source}")]
    Step {
        step: PipelineStep,
        #[source]
        source: AdapterError,
    },

    #[error("Load job {remote_job_id} finished with errors: {errors}")]
    LoadFailed {
        remote_job_id: String,
        errors: String,
    },

    #[error("Load job timed out: {remote_job_id} did not finish after {attempts} status checks")]
    LoadTimedOut {
        remote_job_id: String,
        attempts: u32,
    },

    #[error("Pipeline task panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    pub fn step(step: PipelineStep, source: AdapterError) -> Self {
        PipelineError::Step { step, source }
    }

    /// Classification label matching the adapter error taxonomy.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Step { source, .. } => source.kind(),
            PipelineError::LoadFailed { .. } => "RemoteError",
            PipelineError::LoadTimedOut { .. } => "TimeoutError",
            PipelineError::Panicked(_) => "InternalError",
        }
    }

    /// Troubleshooting hint appended to the job log on failure.
    pub fn hint(&self) -> String {
        match self {
            PipelineError::Step { source, .. } => match source {
                AdapterError::Auth(_) => {
                    "Check that the configured access token is valid and grants storage and warehouse access".to_string()
                }
                AdapterError::Quota(_) => {
                    "The remote service is rate limiting this project; wait and resubmit, or raise the quota".to_string()
                }
                AdapterError::Timeout(_) | AdapterError::Network(_) => {
                    "The remote service could not be reached; check connectivity and endpoint settings".to_string()
                }
                AdapterError::Remote(_) => {
                    "The remote service rejected the request; check the dataset, table and source format".to_string()
                }
                AdapterError::Validation(_) => {
                    "Fix the request and submit a new job".to_string()
                }
            },
            PipelineError::LoadFailed { .. } => {
                "Inspect the load job errors in the warehouse console; schema mismatches are the usual cause".to_string()
            }
            PipelineError::LoadTimedOut { remote_job_id, .. } => format!(
                "The load may still complete; check job {} in the warehouse console",
                remote_job_id
            ),
            PipelineError::Panicked(_) => "This is a bug in the orchestrator".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoloadError>;
