//! Concurrent bulk operations over discovered items

use crate::confirm::Confirmation;
use crate::error::{CloudError, Result};
use crate::item::Item;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Per-item handler of one provider; `Ok(true)` means success
pub type OperationHandler = Arc<dyn Fn(Item) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Wrap an async function as an [`OperationHandler`]
pub fn operation_handler<F, Fut>(f: F) -> OperationHandler
where
    F: Fn(Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    Arc::new(move |item| Box::pin(f(item)))
}

/// How an operation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Every dispatched call finished
    Completed,
    /// The confirmation was declined; nothing was dispatched
    Cancelled,
    /// The target list was empty
    NothingToDo,
}

/// Tally of an operation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSummary {
    pub outcome: OperationOutcome,
    /// Size of the target list
    pub total: usize,
    /// Items handed to a provider handler
    pub dispatched: usize,
    /// Dispatched calls that finished
    pub processed: usize,
    /// Calls that returned `true`
    pub succeeded: usize,
    /// Items without a handler for their provider
    pub skipped: usize,
}

impl OperationSummary {
    fn new(total: usize, outcome: OperationOutcome) -> Self {
        Self {
            outcome,
            total,
            dispatched: 0,
            processed: 0,
            succeeded: 0,
            skipped: 0,
        }
    }

    pub fn failed(&self) -> usize {
        self.processed - self.succeeded
    }
}

/// Applies provider-specific handlers to a heterogeneous item list
pub struct ItemOperation {
    description: String,
    handlers: HashMap<String, OperationHandler>,
    confirm: bool,
    max_workers: usize,
}

impl ItemOperation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            handlers: HashMap::new(),
            confirm: true,
            max_workers: 10,
        }
    }

    /// Register the handler for a provider tag (matched case-insensitively)
    pub fn with_handler(mut self, cloud: &str, handler: OperationHandler) -> Self {
        self.handlers.insert(cloud.to_lowercase(), handler);
        self
    }

    pub fn confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub async fn execute(
        &self,
        items: &[Item],
        confirmation: &dyn Confirmation,
    ) -> OperationSummary {
        let total = items.len();

        if items.is_empty() {
            info!("No items to process.");
            return OperationSummary::new(0, OperationOutcome::NothingToDo);
        }

        if self.confirm {
            let prompt = format!("{} {} item(s)", self.description, total);
            if !confirmation.confirm(items, &prompt) {
                info!("Operation cancelled.");
                return OperationSummary::new(total, OperationOutcome::Cancelled);
            }
        }

        info!("{} {} item(s) in parallel...", self.description, total);

        let mut summary = OperationSummary::new(total, OperationOutcome::Completed);
        let mut dispatch = Vec::new();
        for item in items {
            match self.handlers.get(&item.cloud_key()) {
                Some(handler) => dispatch.push((handler.clone(), item.clone())),
                None => {
                    warn!(
                        "Unknown cloud provider '{}' for {}",
                        item.cloud,
                        item.display_name()
                    );
                    summary.skipped += 1;
                }
            }
        }
        summary.dispatched = dispatch.len();

        let mut completions = stream::iter(dispatch)
            .map(|(handler, item)| {
                let cloud = item.cloud.to_uppercase();
                let name = item.display_name().to_string();
                let handle = tokio::spawn(handler(item));
                async move { (cloud, name, handle.await) }
            })
            .buffer_unordered(self.max_workers);

        while let Some((cloud, name, joined)) = completions.next().await {
            summary.processed += 1;
            info!("{}", progress_line(summary.processed, total, &cloud, &name));

            let result = joined.unwrap_or_else(|e| Err(CloudError::TaskPanicked(e.to_string())));
            match result {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => {}
                Err(e) => error!("  Error: {}", e),
            }
        }

        info!(
            "{}: {} out of {} successful",
            self.description, summary.succeeded, total
        );
        summary
    }
}

/// `{processed}/{total} {CLOUD} - {name}`
fn progress_line(processed: usize, total: usize, cloud: &str, name: &str) -> String {
    format!("{}/{} {} - {}", processed, total, cloud, name)
}
