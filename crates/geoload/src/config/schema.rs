use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub project_id: String,
    /// Master switch for real processing. Off means every job is simulated.
    #[serde(default)]
    pub processing_enabled: bool,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub endpoints: EndpointSettings,
    #[serde(default)]
    pub stage: StageSettings,
    #[serde(default)]
    pub load_poll: LoadPollSettings,
    #[serde(default)]
    pub verification: VerificationSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_version() -> String {
    "1".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            project_id: String::new(),
            processing_enabled: false,
            credentials: CredentialSettings::default(),
            endpoints: EndpointSettings::default(),
            stage: StageSettings::default(),
            load_poll: LoadPollSettings::default(),
            verification: VerificationSettings::default(),
            simulation: SimulationSettings::default(),
            http: HttpSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// True when at least one credential source is configured.
    pub fn has_credentials(&self) -> bool {
        self.credentials.has_source()
    }
}

/// Access token sources, tried in order: direct value, file, environment variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env_var: Option<String>,
}

impl CredentialSettings {
    pub fn has_source(&self) -> bool {
        [&self.token, &self.token_file, &self.token_env_var]
            .iter()
            .any(|s| s.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSettings {
    #[serde(default = "default_sink_base_url")]
    pub sink_base_url: String,
    #[serde(default = "default_stage_base_url")]
    pub stage_base_url: String,
    #[serde(default)]
    pub transform_url: String,
}

fn default_sink_base_url() -> String {
    "https://bigquery.googleapis.com".to_string()
}

fn default_stage_base_url() -> String {
    "https://storage.googleapis.com".to_string()
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            sink_base_url: default_sink_base_url(),
            stage_base_url: default_stage_base_url(),
            transform_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSettings {
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default)]
    pub upload_retry: RetrySettings,
}

fn default_path_prefix() -> String {
    "uploads".to_string()
}

fn default_max_file_size() -> u64 {
    // 1 GiB
    1024 * 1024 * 1024
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            path_prefix: default_path_prefix(),
            max_file_size_bytes: default_max_file_size(),
            upload_retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay")]
    pub base_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            base_delay_ms: default_retry_base_delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPollSettings {
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

fn default_poll_attempts() -> u32 {
    60
}

fn default_poll_interval() -> u64 {
    5000
}

impl Default for LoadPollSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_poll_attempts(),
            interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: u32,
}

fn default_true() -> bool {
    true
}

fn default_sample_limit() -> u32 {
    5
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_limit: default_sample_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    #[serde(default = "default_step_delay")]
    pub step_delay_ms: u64,
    #[serde(default = "default_record_count")]
    pub record_count: u64,
}

fn default_step_delay() -> u64 {
    500
}

fn default_record_count() -> u64 {
    1000
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay(),
            record_count: default_record_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}
