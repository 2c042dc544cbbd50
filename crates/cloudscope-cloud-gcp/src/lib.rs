//! Google Cloud provider for CloudScope
//!
//! This crate implements the CloudProvider trait for Google Cloud,
//! discovering Compute Engine instances and VPC networks per project.
//!
//! # Requirements
//!
//! - `gcloud` CLI must be installed and authenticated
//!   (`gcloud auth login` or a service account)

pub mod error;
pub mod gcloud;
pub mod provider;

pub use error::{GcpError, Result};
pub use gcloud::Gcloud;
pub use provider::GcpProvider;
