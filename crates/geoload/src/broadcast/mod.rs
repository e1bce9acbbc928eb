//! Job registry and update fan-out shared by every orchestrator.

pub mod job_progress;
pub mod job_store;

pub use job_progress::{JobNotifier, Subscription, UpdateCallback};
pub use job_store::JobRegistry;
