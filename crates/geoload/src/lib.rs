pub mod adapters;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;

pub use adapters::{
    Adapters, ConvertedSource, LoadRequest, LoadState, LoadStatus, SinkAdapter, StageAdapter,
    StageFile, StagedObject, TableProvisioning, TransformAdapter,
};
pub use broadcast::{JobNotifier, JobRegistry, Subscription, UpdateCallback};
pub use config::{load_settings, Settings, SettingsHandle};
pub use error::{
    AdapterError, ConfigError, GeoloadError, PipelineError, Result, ValidationError,
};
pub use job::{
    ExecutionStrategy, JobRecord, JobRequest, JobSource, JobStatus, LogLevel, SchemaField,
    SchemaMode,
};
pub use orchestrator::{
    select_strategy, JobService, Orchestrator, PipelineStep, SimulatedOrchestrator,
    StrategyRouter,
};
pub use secrets::{resolve_access_token, SecretError};
pub use telemetry::init_tracing;
