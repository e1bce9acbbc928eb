use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{error_for_status, read_json, ApiClient};
use crate::adapters::{ConvertedSource, ProgressFn, TransformAdapter};
use crate::error::AdapterError;
use crate::job::{SchemaField, SchemaMode};

/// Conversion service reached over a single JSON endpoint.
pub struct HttpTransform {
    client: ApiClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest<'a> {
    source_uri: &'a str,
    autodetect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [SchemaField]>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertResponse {
    converted_uri: String,
    record_count: u64,
}

impl HttpTransform {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TransformAdapter for HttpTransform {
    async fn convert(
        &self,
        source_uri: &str,
        schema_mode: &SchemaMode,
        on_progress: ProgressFn<'_>,
    ) -> Result<ConvertedSource, AdapterError> {
        let settings = self.client.settings();
        let url = settings.endpoints.transform_url.trim();
        if url.is_empty() {
            return Err(AdapterError::Remote(
                "No transform endpoint configured".to_string(),
            ));
        }
        let token = self.client.token(&settings)?;

        on_progress(0);
        let payload = ConvertRequest {
            source_uri,
            autodetect: schema_mode.explicit_fields().is_none(),
            fields: schema_mode.explicit_fields(),
        };
        let request = self.client.http().post(url).json(&payload);
        let response = self.client.send(request, &token, "Conversion").await?;
        let response = error_for_status(response, "Conversion").await?;
        let converted: ConvertResponse = read_json(response, "Conversion").await?;
        on_progress(100);

        Ok(ConvertedSource {
            converted_uri: converted.converted_uri,
            record_count: converted.record_count,
        })
    }
}
