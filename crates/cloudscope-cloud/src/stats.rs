//! Timing and outcome records for discovery branches

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Outcome of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Success,
    Failed,
}

impl std::fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchStatus::Success => write!(f, "success"),
            BranchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Stats record for one branch or for a whole run
#[derive(Debug, Clone, Serialize)]
pub struct BranchStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub count: usize,
    pub status: BranchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BranchStats {
    pub fn is_success(&self) -> bool {
        self.status == BranchStatus::Success
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Start marker for a branch; finished exactly once into a [`BranchStats`]
#[derive(Debug, Clone, Copy)]
pub struct BranchTimer {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl BranchTimer {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn success(self, count: usize) -> BranchStats {
        self.finish(count, BranchStatus::Success, None)
    }

    pub fn failed(self, error: impl Into<String>) -> BranchStats {
        self.finish(0, BranchStatus::Failed, Some(error.into()))
    }

    fn finish(self, count: usize, status: BranchStatus, error: Option<String>) -> BranchStats {
        BranchStats {
            start_time: self.started_at,
            end_time: Utc::now(),
            duration: self.started.elapsed(),
            count,
            status,
            error,
        }
    }
}

/// Per-provider stats plus the aggregate record under `all`
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryStats {
    #[serde(flatten)]
    pub providers: BTreeMap<String, BranchStats>,
    pub all: BranchStats,
}

impl DiscoveryStats {
    pub fn get(&self, provider: &str) -> Option<&BranchStats> {
        self.providers.get(provider)
    }

    pub fn failed_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|(_, s)| !s.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
