//! Shared HTTP plumbing for the REST adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::{HttpSettings, Settings, SettingsHandle};
use crate::error::AdapterError;
use crate::sanitize::{strip_query, truncate_body};
use crate::secrets::resolve_access_token;

fn create_http_client(settings: &HttpSettings) -> Result<Client, AdapterError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .map_err(|e| AdapterError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// reqwest client plus the settings it authenticates with.
///
/// The bearer token is resolved from the current settings on every call, so
/// rotated credentials apply without rebuilding adapters.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    settings: SettingsHandle,
}

impl ApiClient {
    pub fn new(settings: SettingsHandle) -> Result<Self, AdapterError> {
        let http = create_http_client(&settings.snapshot().http)?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> Settings {
        self.settings.snapshot()
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Missing or unreadable credentials fail here, before any request.
    pub(crate) fn token(&self, settings: &Settings) -> Result<SecretString, AdapterError> {
        Ok(resolve_access_token(&settings.credentials)?)
    }

    /// Sends an authenticated request, mapping transport failures.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        token: &SecretString,
        operation: &str,
    ) -> Result<Response, AdapterError> {
        request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| classify_transport(e, operation))
    }
}

/// Query strings carry object names, so only the base URL is kept.
fn classify_transport(err: reqwest::Error, operation: &str) -> AdapterError {
    let target = err
        .url()
        .map(|u| strip_query(u.as_str()).to_string())
        .unwrap_or_default();
    let timed_out = err.is_timeout();
    let detail = format!("{} ({}): {}", operation, target, err.without_url());
    if timed_out {
        AdapterError::Timeout(detail)
    } else {
        AdapterError::Network(detail)
    }
}

/// Maps an HTTP status to the adapter error taxonomy.
pub fn classify_status(status: StatusCode, detail: String) -> AdapterError {
    match status.as_u16() {
        401 | 403 => AdapterError::Auth(detail),
        429 => AdapterError::Quota(detail),
        408 | 504 => AdapterError::Timeout(detail),
        500 | 502 | 503 => AdapterError::Network(detail),
        _ => AdapterError::Remote(detail),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Passes successful responses through, classifying the rest.
pub(crate) async fn error_for_status(
    response: Response,
    operation: &str,
) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(classify_status(
        status,
        format!("{} returned {}: {}", operation, status, truncate_body(&message)),
    ))
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    operation: &str,
) -> Result<T, AdapterError> {
    response.json::<T>().await.map_err(|e| {
        AdapterError::Remote(format!("{} returned an unexpected body: {}", operation, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        let classify = |status| classify_status(status, "x".to_string());
        assert!(matches!(classify(StatusCode::UNAUTHORIZED), AdapterError::Auth(_)));
        assert!(matches!(classify(StatusCode::FORBIDDEN), AdapterError::Auth(_)));
        assert!(matches!(classify(StatusCode::TOO_MANY_REQUESTS), AdapterError::Quota(_)));
        assert!(matches!(classify(StatusCode::GATEWAY_TIMEOUT), AdapterError::Timeout(_)));
        assert!(matches!(classify(StatusCode::REQUEST_TIMEOUT), AdapterError::Timeout(_)));
        assert!(matches!(classify(StatusCode::SERVICE_UNAVAILABLE), AdapterError::Network(_)));
        assert!(matches!(classify(StatusCode::BAD_REQUEST), AdapterError::Remote(_)));
        assert!(matches!(classify(StatusCode::NOT_FOUND), AdapterError::Remote(_)));
    }

    #[test]
    fn test_missing_credentials_is_auth_error() {
        let client = ApiClient::new(SettingsHandle::default()).unwrap();
        let err = client.token(&client.settings()).unwrap_err();
        assert!(matches!(err, AdapterError::Auth(_)));
    }
}
