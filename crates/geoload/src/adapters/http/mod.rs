//! REST implementations of the stage, transform and sink adapters.

pub mod client;
pub mod sink;
pub mod stage;
pub mod transform;

pub use client::{classify_status, ApiClient};
pub use sink::{parse_remote_job_id, HttpSink};
pub use stage::HttpStage;
pub use transform::HttpTransform;

use crate::config::SettingsHandle;
use crate::error::AdapterError;

use super::Adapters;
use std::sync::Arc;

/// Builds the three REST adapters over one shared client.
pub fn http_adapters(settings: SettingsHandle) -> Result<Adapters, AdapterError> {
    let client = ApiClient::new(settings)?;
    Ok(Adapters::new(
        Arc::new(HttpStage::new(client.clone())),
        Arc::new(HttpTransform::new(client.clone())),
        Arc::new(HttpSink::new(client)),
    ))
}
