use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Curated artifact '{0}' not found, run the transform stage first")]
    CuratedArtifactMissing(PathBuf),

    #[error("Failed to read curated artifact '{0}'")]
    CuratedArtifactRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to read service account key '{0}'")]
    CredentialRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse service account key '{0}'")]
    CredentialParse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to sign token request")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}: {detail}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("Failed to decode response from {0}")]
    ResponseDecode(String, #[source] reqwest::Error),

    #[error("Could not determine whether dataset '{dataset}' exists: {detail}")]
    DatasetCheck { dataset: String, detail: String },

    #[error("Load job '{job_id}' failed: {detail}")]
    JobFailed { job_id: String, detail: String },

    #[error("Table '{table}' reported an invalid row count '{value}'")]
    InvalidRowCount { table: String, value: String },
}
