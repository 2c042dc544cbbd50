//! AWS provider for CloudScope
//!
//! This crate implements the CloudProvider trait for AWS, discovering EC2
//! instances and VPCs across every configured profile and enabled region.
//!
//! # Features
//!
//! - Instance discovery, termination, tagging and API protection
//! - VPC discovery (with network interface counts), tagging and deletion
//!   including endpoints, subnets, security groups, route tables and
//!   internet gateways
//!
//! # Requirements
//!
//! - Each profile listed in the config must exist in the shared AWS config
//!   (`~/.aws/config` / `~/.aws/credentials`)
//!
//! # Example
//!
//! ```ignore
//! use cloudscope_cloud::{CloudProvider, ResourceKind};
//! use cloudscope_cloud_aws::AwsProvider;
//!
//! let provider = AwsProvider::new(vec!["prod".into()], 20);
//! let vms = provider.discover(ResourceKind::Vm).await?;
//! ```

pub mod ec2;
pub mod error;
pub mod provider;

pub use ec2::Ec2;
pub use error::{AwsError, Result};
pub use provider::AwsProvider;
