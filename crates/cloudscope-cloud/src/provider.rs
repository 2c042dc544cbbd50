//! Cloud provider trait definition

use crate::aggregator::{CloudAggregator, DiscoveryResult, discovery_entry};
use crate::confirm::Confirmation;
use crate::error::Result;
use crate::item::{Item, ResourceKind};
use crate::operation::{ItemOperation, OperationSummary, operation_handler};
use crate::stats::DiscoveryStats;
use async_trait::async_trait;
use std::sync::Arc;

/// Cloud provider abstraction trait
///
/// All cloud providers (AWS, Azure, GCP) implement this trait so that
/// discovery and bulk operations can fan out over them uniformly.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider tag stored on items (e.g., "aws", "gcp")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Discover every resource of `kind` across the configured accounts
    async fn discover(&self, kind: ResourceKind) -> Result<Vec<Item>>;

    /// Apply `operation` to a single item.
    ///
    /// `Ok(false)` means the operation did not succeed but the provider
    /// already reported why (missing fields, unsupported combination).
    async fn apply(&self, kind: ResourceKind, operation: &Operation, item: &Item) -> Result<bool>;
}

/// Bulk operation requested for a set of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Delete,
    AddTag { key: String, value: String },
    SetProtection(bool),
}

impl Operation {
    /// Description used in the confirmation prompt and final tally
    pub fn description(&self, kind: ResourceKind) -> String {
        match self {
            Operation::Delete => format!("Delete {}s", kind.label()),
            Operation::AddTag { .. } => format!("Tag {}s", kind.label()),
            Operation::SetProtection(true) => "Enable protection".to_string(),
            Operation::SetProtection(false) => "Disable protection".to_string(),
        }
    }
}

/// The set of enabled providers and their concurrency limits
#[derive(Clone)]
pub struct Fleet {
    providers: Vec<Arc<dyn CloudProvider>>,
    cloud_workers: usize,
    operation_workers: usize,
}

impl Fleet {
    pub fn new(cloud_workers: usize, operation_workers: usize) -> Self {
        Self {
            providers: Vec::new(),
            cloud_workers,
            operation_workers,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(&self) -> &[Arc<dyn CloudProvider>] {
        &self.providers
    }

    /// Discover `kind` on all providers concurrently
    pub async fn discover(&self, kind: ResourceKind) -> DiscoveryResult {
        let aggregator = self
            .providers
            .iter()
            .fold(CloudAggregator::new(self.cloud_workers), |agg, provider| {
                let provider = provider.clone();
                let tag = provider.name().to_string();
                agg.with_provider(
                    tag,
                    discovery_entry(move || {
                        let provider = provider.clone();
                        async move { provider.discover(kind).await }
                    }),
                )
            });

        aggregator.run().await
    }

    /// Display names of the providers whose discovery branch failed
    pub fn failed_providers(&self, stats: &DiscoveryStats) -> Vec<&str> {
        let failed = stats.failed_providers();
        self.providers
            .iter()
            .filter(|p| failed.contains(&p.name()))
            .map(|p| p.display_name())
            .collect()
    }

    /// Apply `operation` to `items`, routing each item to its provider
    pub async fn apply(
        &self,
        kind: ResourceKind,
        operation: &Operation,
        items: &[Item],
        confirm: bool,
        confirmation: &dyn Confirmation,
    ) -> OperationSummary {
        let mut bulk = ItemOperation::new(operation.description(kind))
            .confirm(confirm)
            .max_workers(self.operation_workers);

        for provider in &self.providers {
            let tag = provider.name().to_string();
            let provider = provider.clone();
            let operation = operation.clone();
            bulk = bulk.with_handler(
                &tag,
                operation_handler(move |item: Item| {
                    let provider = provider.clone();
                    let operation = operation.clone();
                    async move { provider.apply(kind, &operation, &item).await }
                }),
            );
        }

        bulk.execute(items, confirmation).await
    }
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("Fleet")
            .field("providers", &names)
            .field("cloud_workers", &self.cloud_workers)
            .field("operation_workers", &self.operation_workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AutoConfirm;
    use crate::error::CloudError;
    use crate::operation::OperationOutcome;
    use crate::stats::BranchStatus;
    use std::sync::Mutex;

    struct FakeProvider {
        tag: &'static str,
        fail: bool,
        applied: Mutex<Vec<(String, Operation)>>,
    }

    impl FakeProvider {
        fn new(tag: &'static str) -> Self {
            Self {
                tag,
                fail: false,
                applied: Mutex::new(Vec::new()),
            }
        }

        fn failing(tag: &'static str) -> Self {
            Self {
                fail: true,
                ..Self::new(tag)
            }
        }
    }

    #[async_trait]
    impl CloudProvider for FakeProvider {
        fn name(&self) -> &str {
            self.tag
        }

        fn display_name(&self) -> &str {
            match self.tag {
                "aws" => "Amazon Web Services",
                "azure" => "Microsoft Azure",
                _ => "Google Cloud",
            }
        }

        async fn discover(&self, kind: ResourceKind) -> Result<Vec<Item>> {
            if self.fail {
                return Err(CloudError::CommandFailed("no credentials".into()));
            }
            Ok(vec![Item::new(
                self.tag,
                format!("{}-{}", self.tag, kind.stem()),
                "one",
            )])
        }

        async fn apply(
            &self,
            _kind: ResourceKind,
            operation: &Operation,
            item: &Item,
        ) -> Result<bool> {
            self.applied
                .lock()
                .unwrap()
                .push((item.id.clone(), operation.clone()));
            Ok(!self.fail)
        }
    }

    #[test]
    fn test_operation_descriptions() {
        assert_eq!(Operation::Delete.description(ResourceKind::Vm), "Delete VMs");
        let tag = Operation::AddTag {
            key: "env".into(),
            value: "prod".into(),
        };
        assert_eq!(tag.description(ResourceKind::Vpc), "Tag VPCs");
        assert_eq!(
            Operation::SetProtection(false).description(ResourceKind::Vm),
            "Disable protection"
        );
    }

    #[tokio::test]
    async fn test_fleet_discover_merges_providers() {
        let fleet = Fleet::new(3, 10)
            .with_provider(Arc::new(FakeProvider::new("aws")))
            .with_provider(Arc::new(FakeProvider::failing("azure")))
            .with_provider(Arc::new(FakeProvider::new("gcp")));

        let result = fleet.discover(ResourceKind::Vpc).await;

        let mut ids: Vec<_> = result.items.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["aws-vpc", "gcp-vpc"]);
        assert_eq!(
            result.stats.get("azure").unwrap().status,
            BranchStatus::Failed
        );
        assert_eq!(result.stats.providers.len(), 3);
        assert_eq!(fleet.failed_providers(&result.stats), vec!["Microsoft Azure"]);
    }

    #[tokio::test]
    async fn test_fleet_apply_routes_by_cloud() {
        let aws = Arc::new(FakeProvider::new("aws"));
        let gcp = Arc::new(FakeProvider::new("gcp"));
        let fleet = Fleet::new(3, 4)
            .with_provider(aws.clone())
            .with_provider(gcp.clone());

        let items = vec![
            Item::new("aws", "i-1", "web"),
            Item::new("gcp", "vm-1", "db"),
            Item::new("aws", "i-2", "api"),
            Item::new("oracle", "x", "legacy"),
        ];
        let operation = Operation::SetProtection(true);
        let summary = fleet
            .apply(
                ResourceKind::Vm,
                &operation,
                &items,
                true,
                &AutoConfirm(true),
            )
            .await;

        assert_eq!(summary.outcome, OperationOutcome::Completed);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(aws.applied.lock().unwrap().len(), 2);
        assert_eq!(
            gcp.applied.lock().unwrap().as_slice(),
            &[("vm-1".to_string(), operation)]
        );
    }

    #[tokio::test]
    async fn test_fleet_apply_cancelled() {
        let aws = Arc::new(FakeProvider::new("aws"));
        let fleet = Fleet::new(3, 4).with_provider(aws.clone());

        let summary = fleet
            .apply(
                ResourceKind::Vm,
                &Operation::Delete,
                &[Item::new("aws", "i-1", "web")],
                true,
                &AutoConfirm(false),
            )
            .await;

        assert_eq!(summary.outcome, OperationOutcome::Cancelled);
        assert!(aws.applied.lock().unwrap().is_empty());
    }
}
