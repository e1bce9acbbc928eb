use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::client::{error_for_status, read_json, ApiClient};
use crate::adapters::{check_file_size, StageAdapter, StageFile, StagedObject};
use crate::error::{AdapterError, ValidationError};
use crate::job::object_uri;
use crate::sanitize::redact_path;

/// Object stage backed by the storage JSON API media upload.
pub struct HttpStage {
    client: ApiClient,
}

#[derive(Deserialize)]
struct ObjectResource {
    bucket: String,
    name: String,
    /// The API reports sizes as decimal strings.
    #[serde(default)]
    size: Option<String>,
}

impl HttpStage {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StageAdapter for HttpStage {
    async fn upload(
        &self,
        file: &StageFile,
        destination: &str,
    ) -> Result<StagedObject, AdapterError> {
        let settings = self.client.settings();
        let limit = settings.stage.max_file_size_bytes;
        check_file_size(&file.file_name, file.size_bytes, limit)?;

        let unreadable = |e: std::io::Error| {
            AdapterError::Validation(ValidationError::UnreadableFile {
                name: file.file_name.clone(),
                reason: e.to_string(),
            })
        };
        let handle = tokio::fs::File::open(&file.path).await.map_err(unreadable)?;
        let on_disk = handle.metadata().await.map_err(unreadable)?.len();
        // The declared size may be stale; the ceiling applies to the larger
        check_file_size(&file.file_name, file.size_bytes.max(on_disk), limit)?;

        let token = self.client.token(&settings)?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(handle));
        let content_type = mime_guess::from_path(&file.file_name).first_or_octet_stream();

        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            settings.endpoints.stage_base_url.trim_end_matches('/'),
            settings.stage.bucket
        );
        debug!(
            file = %redact_path(&file.path),
            bucket = %settings.stage.bucket,
            content_type = %content_type,
            size_bytes = on_disk,
            "Uploading to stage"
        );

        let request = self
            .client
            .http()
            .post(&url)
            .query(&[("uploadType", "media"), ("name", destination)])
            .header(reqwest::header::CONTENT_TYPE, content_type.essence_str())
            .header(reqwest::header::CONTENT_LENGTH, on_disk)
            .body(body);
        let response = self.client.send(request, &token, "Stage upload").await?;
        let response = error_for_status(response, "Stage upload").await?;
        let object: ObjectResource = read_json(response, "Stage upload").await?;

        let size_bytes = object
            .size
            .and_then(|s| s.parse().ok())
            .unwrap_or(on_disk);
        Ok(StagedObject {
            uri: object_uri(&object.bucket, &object.name),
            bucket: object.bucket,
            size_bytes,
        })
    }
}
