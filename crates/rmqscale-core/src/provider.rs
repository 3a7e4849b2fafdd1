//! Capability traits consumed by the reconciler.
//!
//! The reconciliation loop never talks to a broker or a control plane
//! directly — it is handed implementations of these traits, which keeps
//! the loop deterministic under test (stub providers) and leaves the
//! wire details to the edge crates.

use async_trait::async_trait;

use crate::types::{QueueMetrics, WorkloadMeta};

/// Source of live queue observations.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Fetch consumer count, backlog depth, and the publish-rate sample
    /// for one queue.
    ///
    /// `window_secs` is a sampling-window hint for the publish-rate
    /// derivation; providers treat anything below one second as one
    /// second. Errors are per-queue and never fatal to the caller.
    async fn queue_metrics(
        &self,
        queue: &str,
        vhost: &str,
        window_secs: u64,
    ) -> anyhow::Result<QueueMetrics>;
}

/// Applies a new desired replica count to a workload.
#[async_trait]
pub trait ReplicaUpdater: Send + Sync {
    /// Set the workload's desired replicas, returning the updated
    /// snapshot on success. Safe to call repeatedly with the same
    /// target value.
    async fn apply_replicas(
        &self,
        meta: &WorkloadMeta,
        replicas: i64,
    ) -> anyhow::Result<WorkloadMeta>;
}

/// Classification of one reconciliation outcome for a tracked workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// Positive delta applied (or attempted).
    ScaleUp,
    /// Negative delta applied (or attempted).
    ScaleDown,
    /// Negative delta suppressed by safe-unscale while messages remain
    /// queued or are still arriving.
    SafeCooldown,
    /// No change required this tick.
    Steady,
}

/// One observability event, emitted exactly once per tracked record per
/// evaluated tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleEvent {
    pub workload: String,
    pub outcome: ScaleOutcome,
    pub queue_depth: i64,
    pub published: i64,
    pub delta: i64,
}

/// Destination for [`ScaleEvent`]s (cluster events, logs, test capture).
pub trait EventSink: Send + Sync {
    fn record(&self, event: &ScaleEvent);
}
