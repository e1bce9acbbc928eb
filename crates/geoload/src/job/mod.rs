pub mod record;
pub mod request;

pub use record::{
    object_uri, ExecutionStrategy, FieldMode, InvalidTransition, JobRecord, JobSource, JobStatus,
    LogEntry, LogLevel, SchemaField, SchemaMode, SourceKind,
};
pub use request::{parse_target_table, JobRequest};
