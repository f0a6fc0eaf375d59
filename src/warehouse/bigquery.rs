//! BigQuery REST v2 implementation of [`Warehouse`].

use crate::utils::error_chain;
use crate::warehouse::auth::{fetch_access_token, ServiceAccountKey};
use crate::warehouse::client::{
    DatasetStatus, JobHandle, LoadJobConfig, TableRef, Warehouse, WarehouseConnector,
};
use crate::warehouse::error::WarehouseError;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com";

/// Passes successful responses through and turns everything else into
/// [`WarehouseError::HttpStatus`] carrying the service's error message.
pub(crate) async fn check_status(url: String, response: Response) -> Result<Response, WarehouseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("HTTP error for {}: {} {}", url, status, body);
    Err(WarehouseError::HttpStatus {
        url,
        status,
        detail: error_detail(&body),
    })
}

/// Extracts `error.message` from a Google API error body, falling back to the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: Option<JobStatus>,
}

impl JobResource {
    /// `None` while the job is still pending or running.
    fn outcome(&self) -> Option<Result<(), String>> {
        let status = self.status.as_ref()?;
        if status.state != "DONE" {
            return None;
        }
        Some(match &status.error_result {
            None => Ok(()),
            Some(err) => Err(match &err.reason {
                Some(reason) => format!("{}: {}", reason, err.message),
                None => err.message.clone(),
            }),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResource {
    #[serde(default)]
    num_rows: Option<String>,
}

fn parse_row_count(table: &TableRef, resource: &TableResource) -> Result<u64, WarehouseError> {
    let raw = resource.num_rows.as_deref().unwrap_or("0");
    raw.parse().map_err(|_| WarehouseError::InvalidRowCount {
        table: table.to_string(),
        value: raw.to_string(),
    })
}

/// Job resource posted as the metadata part of the upload.
fn load_job_metadata(table: &TableRef, config: &LoadJobConfig) -> Value {
    json!({
        "configuration": {
            "load": {
                "sourceFormat": config.source_format,
                "autodetect": config.autodetect,
                "writeDisposition": config.write_disposition,
                "destinationTable": {
                    "projectId": table.project_id,
                    "datasetId": table.dataset_id,
                    "tableId": table.table_id,
                },
            }
        }
    })
}

/// Builds a `multipart/related` body: JSON metadata first, then the raw file.
fn multipart_related_body(boundary: &str, metadata: &Value, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// An authenticated BigQuery client bound to one access token.
pub struct BigQueryClient {
    http: Client,
    token: String,
    api_base: String,
    poll_interval: Duration,
}

impl BigQueryClient {
    fn dataset_url(&self, table: &TableRef) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}",
            self.api_base, table.project_id, table.dataset_id
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, WarehouseError> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| WarehouseError::NetworkRequest(url.clone(), e))?;
        let response = check_status(url.clone(), response).await?;
        response
            .json()
            .await
            .map_err(|e| WarehouseError::ResponseDecode(url, e))
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn dataset_status(&self, table: &TableRef) -> DatasetStatus {
        let url = self.dataset_url(table);
        let response = match self.http.get(&url).bearer_auth(&self.token).send().await {
            Ok(response) => response,
            Err(e) => {
                return DatasetStatus::CheckFailed(error_chain(&WarehouseError::NetworkRequest(
                    url, e,
                )))
            }
        };
        match response.status() {
            status if status.is_success() => DatasetStatus::Exists,
            StatusCode::NOT_FOUND => DatasetStatus::NotFound,
            status => {
                let body = response.text().await.unwrap_or_default();
                DatasetStatus::CheckFailed(format!("{}: {}", status, error_detail(&body)))
            }
        }
    }

    async fn create_dataset(&self, table: &TableRef) -> Result<(), WarehouseError> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/datasets",
            self.api_base, table.project_id
        );
        let body = json!({
            "datasetReference": {
                "projectId": table.project_id,
                "datasetId": table.dataset_id,
            }
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| WarehouseError::NetworkRequest(url.clone(), e))?;
        if response.status() == StatusCode::CONFLICT {
            // created concurrently since the status check
            info!("Dataset {} already exists", table.dataset_path());
            return Ok(());
        }
        check_status(url, response).await?;
        Ok(())
    }

    async fn submit_load(
        &self,
        table: &TableRef,
        config: &LoadJobConfig,
        data: Vec<u8>,
    ) -> Result<JobHandle, WarehouseError> {
        let url = format!(
            "{}/upload/bigquery/v2/projects/{}/jobs?uploadType=multipart",
            self.api_base, table.project_id
        );
        let boundary = format!(
            "weather_ops_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let body = multipart_related_body(&boundary, &load_job_metadata(table, config), &data);
        debug!("Uploading {} bytes to {}", data.len(), url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await
            .map_err(|e| WarehouseError::NetworkRequest(url.clone(), e))?;
        let response = check_status(url.clone(), response).await?;
        let job: JobResource = response
            .json()
            .await
            .map_err(|e| WarehouseError::ResponseDecode(url, e))?;

        Ok(JobHandle {
            project_id: job.job_reference.project_id,
            job_id: job.job_reference.job_id,
            location: job.job_reference.location,
        })
    }

    async fn wait_for_job(&self, job: &JobHandle) -> Result<(), WarehouseError> {
        let mut url = format!(
            "{}/bigquery/v2/projects/{}/jobs/{}",
            self.api_base, job.project_id, job.job_id
        );
        if let Some(location) = &job.location {
            url.push_str(&format!("?location={location}"));
        }
        loop {
            let resource: JobResource = self.get_json(url.clone()).await?;
            if let Some(outcome) = resource.outcome() {
                return outcome.map_err(|detail| WarehouseError::JobFailed {
                    job_id: job.job_id.clone(),
                    detail,
                });
            }
            debug!("Load job {} still running", job.job_id);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn table_row_count(&self, table: &TableRef) -> Result<u64, WarehouseError> {
        let url = format!("{}/tables/{}", self.dataset_url(table), table.table_id);
        let resource: TableResource = self.get_json(url).await?;
        parse_row_count(table, &resource)
    }
}

/// Authenticates with a service-account key and hands out [`BigQueryClient`]s.
#[derive(Debug, Clone)]
pub struct BigQueryConnector {
    http: Client,
    api_base: String,
    poll_interval: Duration,
}

impl BigQueryConnector {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            http: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval,
        }
    }
}

#[async_trait]
impl WarehouseConnector for BigQueryConnector {
    async fn connect(
        &self,
        credential_path: &Path,
        project_id: &str,
    ) -> Result<Box<dyn Warehouse>, WarehouseError> {
        let key = ServiceAccountKey::from_file(credential_path).await?;
        let token = fetch_access_token(&self.http, &key).await?;
        info!("Connected to BigQuery project {}", project_id);
        Ok(Box::new(BigQueryClient {
            http: self.http.clone(),
            token,
            api_base: self.api_base.clone(),
            poll_interval: self.poll_interval,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableRef {
        TableRef {
            project_id: "wagon-bootcamp-470119".into(),
            dataset_id: "weather_data_lake".into(),
            table_id: "weather_forecast_history".into(),
        }
    }

    #[test]
    fn job_metadata_targets_the_destination_table() {
        let metadata = load_job_metadata(&table(), &LoadJobConfig::default());
        let load = &metadata["configuration"]["load"];
        assert_eq!(load["sourceFormat"], "PARQUET");
        assert_eq!(load["writeDisposition"], "WRITE_TRUNCATE");
        assert_eq!(load["autodetect"], true);
        assert_eq!(load["destinationTable"]["tableId"], "weather_forecast_history");
    }

    #[test]
    fn multipart_body_wraps_metadata_and_payload() {
        let body = multipart_related_body("b", &json!({"k": 1}), b"PAR1");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b\r\nContent-Type: application/json"));
        assert!(text.contains("{\"k\":1}"));
        assert!(text.contains("application/octet-stream\r\n\r\nPAR1\r\n--b--"));
    }

    #[test]
    fn job_outcome_reflects_state_and_error() {
        let running: JobResource = serde_json::from_value(json!({
            "jobReference": {"projectId": "p", "jobId": "j1"},
            "status": {"state": "RUNNING"}
        }))
        .unwrap();
        assert_eq!(running.outcome(), None);

        let failed: JobResource = serde_json::from_value(json!({
            "jobReference": {"projectId": "p", "jobId": "j1", "location": "EU"},
            "status": {"state": "DONE", "errorResult": {"reason": "invalid", "message": "bad parquet"}}
        }))
        .unwrap();
        assert_eq!(failed.outcome(), Some(Err("invalid: bad parquet".to_string())));

        let done: JobResource = serde_json::from_value(json!({
            "jobReference": {"projectId": "p", "jobId": "j1"},
            "status": {"state": "DONE"}
        }))
        .unwrap();
        assert_eq!(done.outcome(), Some(Ok(())));
    }

    #[test]
    fn row_count_is_parsed_from_the_string_field() {
        let resource = TableResource {
            num_rows: Some("96453".into()),
        };
        assert_eq!(parse_row_count(&table(), &resource).unwrap(), 96453);

        let broken = TableResource {
            num_rows: Some("many".into()),
        };
        assert!(matches!(
            parse_row_count(&table(), &broken),
            Err(WarehouseError::InvalidRowCount { .. })
        ));
    }

    #[test]
    fn error_detail_prefers_the_api_message() {
        let body = r#"{"error": {"code": 403, "message": "Access Denied: Dataset"}}"#;
        assert_eq!(error_detail(body), "Access Denied: Dataset");
        assert_eq!(error_detail("plain failure\n"), "plain failure");
    }
}
