//! Google Cloud provider error types

use cloudscope_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("gcloud not found. Please install: https://cloud.google.com/sdk/docs/install")]
    GcloudNotFound,

    #[error("gcloud command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<GcpError> for CloudError {
    fn from(err: GcpError) -> Self {
        match err {
            GcpError::GcloudNotFound => {
                CloudError::ProviderNotFound("gcloud CLI is not installed".to_string())
            }
            GcpError::CommandFailed(stderr) => CloudError::CommandFailed(stderr),
            GcpError::JsonError(e) => CloudError::Json(e),
            GcpError::IoError(e) => CloudError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, GcpError>;
