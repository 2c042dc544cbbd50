//! Discovery tasks and per-provider task building
//!
//! A provider is split into independent discovery units (account, or
//! account x region) and every unit becomes one [`Task`] that the
//! [`DiscoveryExecutor`](crate::executor::DiscoveryExecutor) runs exactly once.

use crate::error::Result;
use crate::item::Item;
use async_trait::async_trait;
use futures_util::future::{BoxFuture, join_all};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Per-scope discovery function shared by all tasks of a provider
pub type DiscoveryFn = Arc<dyn Fn(Scope) -> BoxFuture<'static, Result<Vec<Item>>> + Send + Sync>;

/// Wrap an async function as a [`DiscoveryFn`]
pub fn discovery_fn<F, Fut>(f: F) -> DiscoveryFn
where
    F: Fn(Scope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Item>>> + Send + 'static,
{
    Arc::new(move |scope| Box::pin(f(scope)))
}

/// Administrative scope a task discovers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Profile, subscription or project
    pub account: String,

    /// Sub-scope within the account, when the provider has one
    pub region: Option<String>,
}

impl Scope {
    pub fn account(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: None,
        }
    }

    pub fn regional(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: Some(region.into()),
        }
    }

    /// Human-readable location label used in progress lines
    pub fn label(&self) -> String {
        match &self.region {
            Some(region) => format!("{} {}", self.account, region),
            None => self.account.clone(),
        }
    }
}

/// Logging context carried by a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub cloud: String,
    pub location: String,
    pub resource: String,
}

/// A bound discovery call ready for concurrent execution
pub struct Task {
    handler: DiscoveryFn,
    scope: Scope,
    context: TaskContext,
}

impl Task {
    pub fn new(handler: DiscoveryFn, scope: Scope, context: TaskContext) -> Self {
        Self {
            handler,
            scope,
            context,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// Consume the task, returning its context and the pending call
    pub(crate) fn into_call(self) -> (TaskContext, BoxFuture<'static, Result<Vec<Item>>>) {
        let call = (self.handler)(self.scope);
        (self.context, call)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("scope", &self.scope)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Lists the sub-scopes (e.g., regions) of one account
#[async_trait]
pub trait ScopeEnumerator: Send + Sync {
    async fn scopes(&self, account: &str) -> Result<Vec<String>>;
}

/// Account whose sub-scopes could not be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAccount {
    pub account: String,
    pub error: String,
}

/// Tasks built for one provider
#[derive(Debug, Default)]
pub struct TaskBatch {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedAccount>,
    accounts: usize,
}

impl TaskBatch {
    /// No accounts were configured at all
    pub fn is_unconfigured(&self) -> bool {
        self.accounts == 0
    }

    /// Accounts were configured but none of them could be enumerated
    pub fn all_skipped(&self) -> bool {
        self.accounts > 0 && self.skipped.len() == self.accounts
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Builds discovery tasks for a single provider
pub struct TaskBuilder {
    cloud: String,
    accounts: Vec<String>,
    enumerator: Option<Arc<dyn ScopeEnumerator>>,
}

impl TaskBuilder {
    pub fn new(cloud: impl Into<String>, accounts: Vec<String>) -> Self {
        Self {
            cloud: cloud.into(),
            accounts,
            enumerator: None,
        }
    }

    /// Expand every account into its sub-scopes
    pub fn with_enumerator(mut self, enumerator: Arc<dyn ScopeEnumerator>) -> Self {
        self.enumerator = Some(enumerator);
        self
    }

    pub async fn build(&self, handler: DiscoveryFn, resource: &str) -> TaskBatch {
        let mut batch = TaskBatch {
            accounts: self.accounts.len(),
            ..Default::default()
        };

        if self.accounts.is_empty() {
            return batch;
        }

        let scopes = match &self.enumerator {
            None => self
                .accounts
                .iter()
                .map(|account| Ok(vec![Scope::account(account.clone())]))
                .collect::<Vec<_>>(),
            Some(enumerator) => {
                join_all(self.accounts.iter().map(|account| {
                    let enumerator = enumerator.clone();
                    async move {
                        enumerator.scopes(account).await.map(|regions| {
                            regions
                                .into_iter()
                                .map(|region| Scope::regional(account.clone(), region))
                                .collect::<Vec<_>>()
                        })
                    }
                }))
                .await
            }
        };

        for (account, result) in self.accounts.iter().zip(scopes) {
            match result {
                Ok(scopes) => {
                    for scope in scopes {
                        let context = TaskContext {
                            cloud: self.cloud.clone(),
                            location: scope.label(),
                            resource: resource.to_string(),
                        };
                        batch.tasks.push(Task::new(handler.clone(), scope, context));
                    }
                }
                Err(e) => {
                    warn!(
                        "{} {}: Error getting scopes - {}",
                        self.cloud.to_uppercase(),
                        account,
                        e
                    );
                    batch.skipped.push(SkippedAccount {
                        account: account.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if batch.all_skipped() {
            warn!(
                "{}: scope enumeration failed for all {} account(s)",
                self.cloud.to_uppercase(),
                batch.accounts
            );
        }

        batch
    }
}
