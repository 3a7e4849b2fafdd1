//! Shared domain types crossing the discovery and metrics boundaries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Snapshot of a scalable workload as delivered by a discovery source.
///
/// This is the opaque external reference the reconciler holds on to:
/// enough to re-derive the policy (annotations), seed the local replica
/// cache, and address the workload when issuing an update. Discovery
/// sources must not retain or mutate a `WorkloadMeta` after handing it
/// over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadMeta {
    /// Stable identity key, unique within one registry (e.g. `ns/name`).
    pub id: String,
    /// Raw string annotations, including the `rmqscale.io/` policy keys.
    pub annotations: HashMap<String, String>,
    /// Desired replica count as last seen on the control plane.
    pub replicas: i64,
    /// Replicas currently reporting ready.
    pub ready_replicas: i64,
}

/// One observation of a queue, as returned by a [`MetricsProvider`].
///
/// `published` is rate-derived: the difference between two time-ordered
/// publish-counter samples spanning roughly the requested sampling
/// window. Providers report 0 until two samples exist.
///
/// [`MetricsProvider`]: crate::provider::MetricsProvider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Active consumer connections on the queue.
    pub consumers: i64,
    /// Undelivered messages currently queued.
    pub depth: i64,
    /// Messages published over the sampling window.
    pub published: i64,
}
