//! Parallel discovery across cloud providers

use crate::error::{CloudError, Result};
use crate::item::Item;
use crate::stats::{BranchTimer, DiscoveryStats};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Zero-argument discovery entry point of one provider
pub type DiscoveryEntry = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<Item>>> + Send + Sync>;

/// Wrap an async function as a [`DiscoveryEntry`]
pub fn discovery_entry<F, Fut>(f: F) -> DiscoveryEntry
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Item>>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Merged items and statistics of a multi-provider discovery
#[derive(Debug)]
pub struct DiscoveryResult {
    pub items: Vec<Item>,
    pub stats: DiscoveryStats,
}

/// Runs one discovery entry point per provider concurrently
pub struct CloudAggregator {
    max_workers: usize,
    providers: Vec<(String, DiscoveryEntry)>,
}

impl Default for CloudAggregator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl CloudAggregator {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            providers: Vec::new(),
        }
    }

    /// Register a provider; a repeated tag replaces the earlier entry
    pub fn with_provider(mut self, cloud: impl Into<String>, entry: DiscoveryEntry) -> Self {
        let cloud = cloud.into();
        self.providers.retain(|(name, _)| *name != cloud);
        self.providers.push((cloud, entry));
        self
    }

    pub async fn run(&self) -> DiscoveryResult {
        let overall = BranchTimer::start();

        // Start times are taken at submission, so queueing counts toward duration.
        let submissions: Vec<_> = self
            .providers
            .iter()
            .map(|(cloud, entry)| (cloud.clone(), entry.clone(), BranchTimer::start()))
            .collect();

        let mut completions = stream::iter(submissions)
            .map(|(cloud, entry, timer)| {
                let handle = tokio::spawn(entry());
                async move {
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(CloudError::TaskPanicked(e.to_string())),
                    };
                    (cloud, timer, result)
                }
            })
            .buffer_unordered(self.max_workers);

        let mut items = Vec::new();
        let mut providers = BTreeMap::new();

        while let Some((cloud, timer, result)) = completions.next().await {
            let stats = match result {
                Ok(found) => {
                    let stats = timer.success(found.len());
                    items.extend(found);
                    stats
                }
                Err(e) => {
                    error!("{} discovery failed: {}", cloud.to_uppercase(), e);
                    timer.failed(e.to_string())
                }
            };
            providers.insert(cloud, stats);
        }

        let all = overall.success(items.len());
        DiscoveryResult {
            items,
            stats: DiscoveryStats { providers, all },
        }
    }
}

/// Log the per-provider and overall discovery summary
pub fn log_discovery_stats(stats: &DiscoveryStats, label: &str) {
    info!("Resource Discovery Summary");
    info!("{}", "=".repeat(50));
    for (cloud, branch) in &stats.providers {
        info!(
            "{:<6}: {:>6.2}s | {:>3} {}(s)",
            cloud.to_uppercase(),
            branch.duration.as_secs_f64(),
            branch.count,
            label
        );
        if !branch.is_success() {
            error!(
                "    Error: {}",
                branch.error.as_deref().unwrap_or("Unknown")
            );
        }
    }
    info!("{}", "=".repeat(50));
    info!("Total {}s discovered: {}", label, stats.all.count);
    info!(
        "Total discovery time: {:.2}s",
        stats.all.duration.as_secs_f64()
    );
}
