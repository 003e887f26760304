// loadchain-core/src/infrastructure/gcp/bigquery.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::auth::TokenProvider;
use crate::domain::settings::WriteMode;
use crate::domain::table::{ColumnSpec, TableRef};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::warehouse::{LoadSummary, ProvisionOutcome, Warehouse};

pub const BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com";

const SERVICE: &str = "bigquery";

// --- REST payloads ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    error_result: Option<ErrorProto>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => format!("{}: {}", reason, message),
            (None, Some(message)) => message.clone(),
            (Some(reason), None) => reason.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    // int64 values travel as JSON strings
    output_rows: Option<String>,
}

impl Job {
    fn is_done(&self) -> bool {
        self.status.state == "DONE"
    }

    fn output_rows(&self) -> Option<u64> {
        self.statistics
            .as_ref()?
            .load
            .as_ref()?
            .output_rows
            .as_ref()?
            .parse()
            .ok()
    }
}

fn schema_fields(schema: &[ColumnSpec]) -> Value {
    json!({
        "fields": schema
            .iter()
            .map(|c| json!({ "name": c.name, "type": c.field_type.as_str() }))
            .collect::<Vec<_>>()
    })
}

fn write_disposition(mode: WriteMode) -> &'static str {
    match mode {
        WriteMode::Truncate => "WRITE_TRUNCATE",
        WriteMode::Append => "WRITE_APPEND",
    }
}

// --- Adapter ---

/// BigQuery REST v2: `tables.insert` for provisioning, load jobs for CSV.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    base_url: String,
    default_project: Option<String>,
    poll_interval: Duration,
}

impl BigQueryWarehouse {
    pub fn new(client: reqwest::Client, tokens: Arc<TokenProvider>) -> Self {
        Self {
            client,
            tokens,
            base_url: BIGQUERY_BASE_URL.to_string(),
            default_project: None,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Project used for `dataset.table` identifiers.
    pub fn with_default_project(mut self, project: Option<String>) -> Self {
        self.default_project = project;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn project_of<'a>(&'a self, destination: &'a TableRef) -> Result<&'a str, InfrastructureError> {
        destination
            .project
            .as_deref()
            .or(self.default_project.as_deref())
            .ok_or_else(|| InfrastructureError::MissingProject(destination.to_string()))
    }

    fn table_reference(project: &str, destination: &TableRef) -> Value {
        json!({
            "projectId": project,
            "datasetId": destination.dataset,
            "tableId": destination.table,
        })
    }

    async fn api_error(response: reqwest::Response) -> InfrastructureError {
        InfrastructureError::Api {
            service: SERVICE,
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        }
    }

    async fn get_job(&self, project: &str, job: &JobReference) -> Result<Job, InfrastructureError> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/jobs/{}",
            self.base_url, project, job.job_id
        );
        let mut request = self.client.get(&url).bearer_auth(self.tokens.token().await?);
        if let Some(location) = &job.location {
            request = request.query(&[("location", location)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    #[instrument(skip(self, schema), fields(engine = "bigquery", destination = %destination))]
    async fn ensure_table(
        &self,
        destination: &TableRef,
        schema: &[ColumnSpec],
    ) -> Result<ProvisionOutcome, InfrastructureError> {
        let project = self.project_of(destination)?;
        let url = format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables",
            self.base_url, project, destination.dataset
        );
        let body = json!({
            "tableReference": Self::table_reference(project, destination),
            "schema": schema_fields(schema),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.tokens.token().await?)
            .json(&body)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => {
                info!("Destination table created");
                Ok(ProvisionOutcome::Created)
            }
            409 => {
                debug!("Destination table already exists");
                Ok(ProvisionOutcome::AlreadyExists)
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    #[instrument(skip(self, schema), fields(engine = "bigquery", destination = %destination))]
    async fn load_csv(
        &self,
        object_uri: &str,
        destination: &TableRef,
        schema: &[ColumnSpec],
        write_mode: WriteMode,
    ) -> Result<LoadSummary, InfrastructureError> {
        if !object_uri.starts_with("gs://") {
            return Err(InfrastructureError::UnsupportedUri {
                uri: object_uri.to_string(),
                expected: "gs://",
            });
        }

        let project = self.project_of(destination)?;
        let url = format!("{}/bigquery/v2/projects/{}/jobs", self.base_url, project);
        let body = json!({
            "configuration": {
                "load": {
                    "sourceUris": [object_uri],
                    "destinationTable": Self::table_reference(project, destination),
                    "sourceFormat": "CSV",
                    "skipLeadingRows": 1,
                    "schema": schema_fields(schema),
                    "writeDisposition": write_disposition(write_mode),
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.tokens.token().await?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let mut job: Job = response.json().await?;
        info!(job_id = %job.job_reference.job_id, "Load job submitted");

        while !job.is_done() {
            tokio::time::sleep(self.poll_interval).await;
            job = self.get_job(project, &job.job_reference).await?;
            debug!(job_id = %job.job_reference.job_id, state = %job.status.state, "Polled load job");
        }

        if let Some(error) = &job.status.error_result {
            let mut message = error.describe();
            for detail in job.status.errors.iter().take(5) {
                message.push_str("; ");
                message.push_str(&detail.describe());
            }
            return Err(InfrastructureError::JobFailed {
                job_id: job.job_reference.job_id,
                message,
            });
        }

        let rows_loaded = job.output_rows();
        info!(job_id = %job.job_reference.job_id, rows = ?rows_loaded, "Load job done");
        Ok(LoadSummary { rows_loaded })
    }

    fn engine_name(&self) -> &str {
        "bigquery"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::table::FieldType;
    use anyhow::Result;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn warehouse(server: &MockServer) -> BigQueryWarehouse {
        let client = reqwest::Client::new();
        let tokens = Arc::new(TokenProvider::fixed(client.clone(), "ya29.test"));
        BigQueryWarehouse::new(client, tokens)
            .with_base_url(server.uri())
            .with_poll_interval(Duration::from_millis(5))
    }

    fn schema() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("id", FieldType::Int64),
            ColumnSpec::new("amount", FieldType::Float),
        ]
    }

    #[tokio::test]
    async fn test_ensure_table_creates_with_declared_schema() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigquery/v2/projects/proj/datasets/ds/tables"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_partial_json(json!({
                "tableReference": {"projectId": "proj", "datasetId": "ds", "tableId": "orders"},
                "schema": {"fields": [
                    {"name": "id", "type": "INT64"},
                    {"name": "amount", "type": "FLOAT"}
                ]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "proj:ds.orders"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = warehouse(&server)
            .ensure_table(&TableRef::parse("proj.ds.orders")?, &schema())
            .await?;
        assert_eq!(outcome, ProvisionOutcome::Created);
        Ok(())
    }

    #[tokio::test]
    async fn test_conflict_means_already_exists() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigquery/v2/projects/fallback/datasets/ds/tables"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Already Exists"))
            .mount(&server)
            .await;

        let outcome = warehouse(&server)
            .with_default_project(Some("fallback".into()))
            .ensure_table(&TableRef::parse("ds.orders")?, &schema())
            .await?;
        assert_eq!(outcome, ProvisionOutcome::AlreadyExists);
        Ok(())
    }

    #[tokio::test]
    async fn test_two_part_identifier_without_default_project() -> Result<()> {
        let server = MockServer::start().await;
        let result = warehouse(&server)
            .ensure_table(&TableRef::parse("ds.orders")?, &schema())
            .await;
        assert!(matches!(result, Err(InfrastructureError::MissingProject(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_job_is_polled_until_done() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigquery/v2/projects/proj/jobs"))
            .and(body_partial_json(json!({
                "configuration": {"load": {
                    "sourceUris": ["gs://landing/orders_data.csv"],
                    "sourceFormat": "CSV",
                    "skipLeadingRows": 1,
                    "writeDisposition": "WRITE_TRUNCATE"
                }}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobReference": {"projectId": "proj", "jobId": "job_1", "location": "EU"},
                "status": {"state": "RUNNING"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bigquery/v2/projects/proj/jobs/job_1"))
            .and(query_param("location", "EU"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobReference": {"projectId": "proj", "jobId": "job_1", "location": "EU"},
                "status": {"state": "DONE"},
                "statistics": {"load": {"outputRows": "42"}}
            })))
            .mount(&server)
            .await;

        let summary = warehouse(&server)
            .load_csv(
                "gs://landing/orders_data.csv",
                &TableRef::parse("proj.ds.orders")?,
                &schema(),
                WriteMode::Truncate,
            )
            .await?;
        assert_eq!(summary.rows_loaded, Some(42));
        Ok(())
    }

    #[tokio::test]
    async fn test_job_error_result_is_job_failed() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigquery/v2/projects/proj/jobs"))
            .and(body_partial_json(json!({
                "configuration": {"load": {"writeDisposition": "WRITE_APPEND"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobReference": {"projectId": "proj", "jobId": "job_2"},
                "status": {
                    "state": "DONE",
                    "errorResult": {"reason": "invalid", "message": "Too many errors"},
                    "errors": [{"reason": "invalid", "message": "Could not parse 'x' as INT64"}]
                }
            })))
            .mount(&server)
            .await;

        let err = warehouse(&server)
            .load_csv(
                "gs://landing/orders_data.csv",
                &TableRef::parse("proj.ds.orders")?,
                &schema(),
                WriteMode::Append,
            )
            .await
            .unwrap_err();

        match err {
            InfrastructureError::JobFailed { job_id, message } => {
                assert_eq!(job_id, "job_2");
                assert!(message.contains("Too many errors"));
                assert!(message.contains("Could not parse"));
            }
            other => anyhow::bail!("expected JobFailed, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_load_rejects_local_uris() -> Result<()> {
        let server = MockServer::start().await;
        let result = warehouse(&server)
            .load_csv(
                "file:///tmp/orders_data.csv",
                &TableRef::parse("proj.ds.orders")?,
                &schema(),
                WriteMode::Truncate,
            )
            .await;
        assert!(matches!(
            result,
            Err(InfrastructureError::UnsupportedUri { .. })
        ));
        Ok(())
    }
}
