//! Cloud engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the engine and by provider collaborators
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Missing required field '{field}' on {cloud} item {id}")]
    MissingField {
        cloud: String,
        id: String,
        field: &'static str,
    },

    #[error("Invalid identifiers: {0}")]
    InvalidIdentifiers(String),

    #[error("Inventory file {} not found. Run with --refresh first.", .0.display())]
    InventoryNotFound(PathBuf),

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
