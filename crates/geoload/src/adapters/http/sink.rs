//! Warehouse sink over the BigQuery v2 REST surface.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::client::{error_for_status, read_json, ApiClient};
use crate::adapters::{LoadRequest, LoadState, LoadStatus, SinkAdapter, TableProvisioning};
use crate::error::AdapterError;
use crate::job::SchemaField;

const DEFAULT_LOCATION: &str = "US";

pub struct HttpSink {
    client: ApiClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: Option<JobStatusResource>,
    #[serde(default)]
    statistics: Option<JobStatistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusResource {
    state: LoadState,
    #[serde(default)]
    error_result: Option<ErrorProto>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    message: String,
}

#[derive(Deserialize)]
struct JobStatistics {
    #[serde(default)]
    load: Option<LoadStatistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    #[serde(default)]
    output_rows: Option<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    schema: Option<QuerySchema>,
    #[serde(default)]
    rows: Vec<QueryRow>,
}

#[derive(Deserialize)]
struct QuerySchema {
    fields: Vec<QueryField>,
}

#[derive(Deserialize)]
struct QueryField {
    name: String,
}

#[derive(Deserialize)]
struct QueryRow {
    f: Vec<QueryCell>,
}

#[derive(Deserialize)]
struct QueryCell {
    #[serde(default)]
    v: Value,
}

/// Splits `project:location.jobId` into its parts.
pub fn parse_remote_job_id(remote_job_id: &str) -> Result<(&str, &str, &str), AdapterError> {
    let malformed = || AdapterError::Remote(format!("Malformed load job id '{}'", remote_job_id));
    let (project, rest) = remote_job_id.split_once(':').ok_or_else(malformed)?;
    let (location, job_id) = rest.split_once('.').ok_or_else(malformed)?;
    if project.is_empty() || location.is_empty() || job_id.is_empty() {
        return Err(malformed());
    }
    Ok((project, location, job_id))
}

/// Row counts arrive as decimal strings; accept plain numbers too.
fn parse_rows(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn schema_json(fields: &[SchemaField]) -> Value {
    json!({ "fields": fields })
}

impl HttpSink {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn api_base(&self, base_url: &str, project: &str) -> String {
        format!(
            "{}/bigquery/v2/projects/{}",
            base_url.trim_end_matches('/'),
            project
        )
    }
}

#[async_trait]
impl SinkAdapter for HttpSink {
    async fn create_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        schema: &[SchemaField],
    ) -> Result<TableProvisioning, AdapterError> {
        let settings = self.client.settings();
        let token = self.client.token(&settings)?;
        let url = format!(
            "{}/datasets/{}/tables",
            self.api_base(&settings.endpoints.sink_base_url, project),
            dataset
        );
        let reference = TableReference {
            project_id: project,
            dataset_id: dataset,
            table_id: table,
        };
        let body = json!({
            "tableReference": reference,
            "schema": schema_json(schema),
        });

        let request = self.client.http().post(&url).json(&body);
        let response = self.client.send(request, &token, "Create table").await?;
        if response.status() == StatusCode::CONFLICT {
            debug!(dataset, table, "Table already exists");
            return Ok(TableProvisioning::AlreadyExists);
        }
        error_for_status(response, "Create table").await?;
        Ok(TableProvisioning::Created)
    }

    async fn submit_load(&self, request: &LoadRequest) -> Result<String, AdapterError> {
        let settings = self.client.settings();
        let token = self.client.token(&settings)?;
        let url = format!(
            "{}/jobs",
            self.api_base(&settings.endpoints.sink_base_url, &request.project)
        );

        let destination = TableReference {
            project_id: &request.project,
            dataset_id: &request.dataset,
            table_id: &request.table,
        };
        let mut load = Map::new();
        load.insert("sourceUris".into(), json!([request.source_uri]));
        load.insert("sourceFormat".into(), json!("NEWLINE_DELIMITED_JSON"));
        load.insert("destinationTable".into(), json!(destination));
        load.insert("writeDisposition".into(), json!("WRITE_APPEND"));
        load.insert("createDisposition".into(), json!("CREATE_IF_NEEDED"));
        match &request.schema {
            Some(fields) => {
                load.insert("schema".into(), schema_json(fields));
            }
            None => {
                load.insert("autodetect".into(), json!(true));
            }
        }
        let body = json!({ "configuration": { "load": load } });

        let http_request = self.client.http().post(&url).json(&body);
        let response = self.client.send(http_request, &token, "Submit load").await?;
        let response = error_for_status(response, "Submit load").await?;
        let job: JobResource = read_json(response, "Submit load").await?;

        let reference = job.job_reference;
        Ok(format!(
            "{}:{}.{}",
            reference.project_id,
            reference.location.as_deref().unwrap_or(DEFAULT_LOCATION),
            reference.job_id
        ))
    }

    async fn get_load_status(&self, remote_job_id: &str) -> Result<LoadStatus, AdapterError> {
        let (project, location, job_id) = parse_remote_job_id(remote_job_id)?;
        let settings = self.client.settings();
        let token = self.client.token(&settings)?;
        let url = format!(
            "{}/jobs/{}",
            self.api_base(&settings.endpoints.sink_base_url, project),
            job_id
        );

        let request = self.client.http().get(&url).query(&[("location", location)]);
        let response = self.client.send(request, &token, "Load status").await?;
        let response = error_for_status(response, "Load status").await?;
        let job: JobResource = read_json(response, "Load status").await?;

        let Some(status) = job.status else {
            return Ok(LoadStatus::pending());
        };
        let mut errors: Vec<String> = Vec::new();
        if let Some(primary) = status.error_result {
            errors.push(primary.message);
        }
        for e in status.errors {
            if !errors.contains(&e.message) {
                errors.push(e.message);
            }
        }
        let rows_loaded = job
            .statistics
            .and_then(|s| s.load)
            .and_then(|l| l.output_rows)
            .and_then(|v| parse_rows(&v));

        Ok(LoadStatus {
            state: status.state,
            errors,
            rows_loaded,
        })
    }

    async fn sample_query(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        limit: u32,
    ) -> Result<Vec<Value>, AdapterError> {
        let settings = self.client.settings();
        let token = self.client.token(&settings)?;
        let url = format!(
            "{}/queries",
            self.api_base(&settings.endpoints.sink_base_url, project)
        );
        let body = json!({
            "query": format!("SELECT * FROM `{}.{}.{}` LIMIT {}", project, dataset, table, limit),
            "useLegacySql": false,
        });

        let request = self.client.http().post(&url).json(&body);
        let response = self.client.send(request, &token, "Sample query").await?;
        let response = error_for_status(response, "Sample query").await?;
        let result: QueryResponse = read_json(response, "Sample query").await?;

        let names: Vec<String> = result
            .schema
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let rows = result
            .rows
            .into_iter()
            .map(|row| {
                let object: Map<String, Value> = row
                    .f
                    .into_iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let name = names.get(i).cloned().unwrap_or_else(|| format!("f{}", i));
                        (name, cell.v)
                    })
                    .collect();
                Value::Object(object)
            })
            .collect();
        Ok(rows)
    }
}
