//! Bounded concurrent execution of discovery tasks

use crate::error::{CloudError, Result};
use crate::item::Item;
use crate::stats::{BranchStats, BranchTimer};
use crate::task::{Task, TaskBatch, TaskContext};
use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};

/// Outcome of one executed task
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub context: TaskContext,
    pub stats: BranchStats,
}

/// Merged result of a discovery run
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Union of all successful task results
    pub items: Vec<Item>,

    /// One entry per submitted task, in completion order
    pub outcomes: Vec<TaskOutcome>,
}

impl DiscoveryReport {
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.stats.is_success())
    }
}

/// Runs discovery tasks on a bounded worker pool
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryExecutor {
    max_workers: usize,
}

impl DiscoveryExecutor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Run every task and wait for all of them.
    ///
    /// A failing (or panicking) task contributes no items and never affects
    /// the other tasks. Progress is logged in completion order.
    pub async fn run(&self, tasks: Vec<Task>) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let total = tasks.len();
        if total == 0 {
            return report;
        }

        // Each task is spawned only once a worker slot frees up.
        let mut completions = stream::iter(tasks)
            .map(|task| {
                let (context, call) = task.into_call();
                let timer = BranchTimer::start();
                let handle = tokio::spawn(call);
                async move {
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(CloudError::TaskPanicked(e.to_string())),
                    };
                    (context, timer, result)
                }
            })
            .buffer_unordered(self.max_workers);

        let mut completed = 0;
        while let Some((context, timer, result)) = completions.next().await {
            completed += 1;
            let progress = progress_prefix(completed, total, &context);

            let stats = match result {
                Ok(items) => {
                    info!("{}", found_line(&progress, items.len(), &context));
                    let stats = timer.success(items.len());
                    report.items.extend(items);
                    stats
                }
                Err(e) => {
                    error!("{}: Error - {}", progress, e);
                    timer.failed(e.to_string())
                }
            };

            report.outcomes.push(TaskOutcome { context, stats });
        }

        report
    }

    /// Run a provider's task batch and return the merged items.
    ///
    /// Fails only when accounts were configured and none of them could be
    /// enumerated. Individual task failures are logged and contribute nothing.
    pub async fn discover(&self, cloud: &str, batch: TaskBatch) -> Result<Vec<Item>> {
        if batch.is_unconfigured() {
            info!("{}: no accounts configured", cloud.to_uppercase());
            return Ok(Vec::new());
        }

        if batch.all_skipped() {
            let reasons: Vec<String> = batch
                .skipped
                .iter()
                .map(|s| format!("{}: {}", s.account, s.error))
                .collect();
            return Err(CloudError::ApiError(format!(
                "{} scope enumeration failed ({})",
                cloud.to_uppercase(),
                reasons.join("; ")
            )));
        }

        let report = self.run(batch.tasks).await;
        let failed = report.failures().count();
        if failed > 0 {
            warn!(
                "{}: {} of {} discovery tasks failed",
                cloud.to_uppercase(),
                failed,
                report.outcomes.len()
            );
        }
        Ok(report.items)
    }
}

/// `{completed}/{total} {CLOUD} {location}`
fn progress_prefix(completed: usize, total: usize, context: &TaskContext) -> String {
    format!(
        "{}/{} {} {}",
        completed,
        total,
        context.cloud.to_uppercase(),
        context.location
    )
}

fn found_line(progress: &str, count: usize, context: &TaskContext) -> String {
    format!("{}: found {} {}(s)", progress, count, context.resource)
}
