//! Azure provider for CloudScope
//!
//! This crate implements the CloudProvider trait for Azure, discovering
//! virtual machines and virtual networks per subscription.
//!
//! # Requirements
//!
//! - `az` CLI must be installed and logged in (`az login`)
//! - VM protection is not available; Azure protects resources with locks,
//!   which are out of scope here

pub mod az;
pub mod error;
pub mod provider;

pub use az::AzCli;
pub use error::{AzureError, Result};
pub use provider::AzureProvider;
