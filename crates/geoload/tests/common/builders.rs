//! Request and settings builders shared by the integration tests.

#![allow(dead_code)]

use geoload::config::CredentialSettings;
use geoload::{JobRequest, SchemaField, SchemaMode, Settings};

pub const OWNER: &str = "alice";
pub const TEN_MB: u64 = 10 * 1024 * 1024;

/// Settings with millisecond delays so pipelines finish quickly.
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.project_id = "geo-warehouse".to_string();
    settings.stage.bucket = "raw-geo".to_string();
    settings.stage.upload_retry.base_delay_ms = 1;
    settings.load_poll.interval_ms = 1;
    settings.load_poll.max_attempts = 10;
    settings.simulation.step_delay_ms = 1;
    settings.simulation.record_count = 250;
    settings
}

/// [`fast_settings`] with real processing switched on.
pub fn real_settings() -> Settings {
    let mut settings = fast_settings();
    settings.processing_enabled = true;
    settings.credentials = CredentialSettings {
        token: Some("test-token".to_string()),
        ..CredentialSettings::default()
    };
    settings
}

/// The canonical `parcels.zip` (10 MB) into `geo.parcels` request.
pub fn parcels_request() -> JobRequest {
    JobRequest::local_file(OWNER, "/data/uploads/parcels.zip", TEN_MB, "geo.parcels")
}

pub fn remote_request(target_table: &str) -> JobRequest {
    JobRequest::remote_reference(OWNER, "raw-geo", "incoming/roads.zip", target_table)
}

pub fn parcels_schema() -> SchemaMode {
    SchemaMode::Explicit(vec![
        SchemaField::new("parcel_id", "STRING").required(),
        SchemaField::new("geometry", "GEOGRAPHY"),
        SchemaField::new("area_m2", "FLOAT"),
    ])
}
