//! CloudScope Cloud Engine
//!
//! This crate provides the provider-agnostic core of CloudScope: concurrent
//! discovery of VMs and virtual networks across cloud accounts, bulk
//! operations over the discovered items, and the JSON inventory they live in.
//!
//! # Supported Providers
//!
//! - **AWS**: EC2 instances, VPCs (via aws-sdk-ec2)
//! - **Azure**: VMs, VNets (via az CLI)
//! - **GCP**: Compute instances, networks (via gcloud CLI)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  CloudScope CLI                  │
//! │               (csp vm / vpc / refresh)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               cloudscope-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Fleet + trait CloudProvider { ... }      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐ ┌──────────────┐ ┌─────────┐  │
//! │  │  Aggregator  │ │  Operation   │ │Inventory│  │
//! │  └──────┬───────┘ └──────────────┘ └─────────┘  │
//! │  ┌──────▼───────┐ ┌──────────────┐              │
//! │  │ TaskBuilder  │─│   Executor   │              │
//! │  └──────────────┘ └──────────────┘              │
//! └───────┬─────────────────┬─────────────┬─────────┘
//!         │                 │             │
//! ┌───────▼───────┐ ┌───────▼───────┐ ┌───▼───────────┐
//! │ aws provider  │ │azure provider │ │ gcp provider  │
//! └───────────────┘ └───────────────┘ └───────────────┘
//! ```

pub mod aggregator;
pub mod confirm;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod item;
pub mod operation;
pub mod provider;
pub mod resolver;
pub mod stats;
pub mod task;

// Re-exports
pub use aggregator::{
    CloudAggregator, DiscoveryEntry, DiscoveryResult, discovery_entry, log_discovery_stats,
};
pub use confirm::{AutoConfirm, Confirmation, TerminalConfirmation};
pub use error::{CloudError, Result};
pub use executor::{DiscoveryExecutor, DiscoveryReport, TaskOutcome};
pub use inventory::{InventoryStore, annotate_vm_counts};
pub use item::{Item, ResourceKind, normalize_tags, normalize_timestamp};
pub use operation::{
    ItemOperation, OperationHandler, OperationOutcome, OperationSummary, operation_handler,
};
pub use provider::{CloudProvider, Fleet, Operation};
pub use resolver::{Resolution, ResolveMiss, expand_identifier_input, resolve_identifiers};
pub use stats::{BranchStats, BranchStatus, BranchTimer, DiscoveryStats};
pub use task::{
    DiscoveryFn, Scope, ScopeEnumerator, SkippedAccount, Task, TaskBatch, TaskBuilder,
    TaskContext, discovery_fn,
};
