//! rmqscale-core — policy model and provider contracts for the autoscaler.
//!
//! A workload declares its scaling behaviour through string annotations
//! under the `rmqscale.io/` prefix. This crate parses those annotations
//! into a validated [`WorkloadPolicy`] and defines the capability traits
//! the reconciler consumes: a queue metrics provider, a replica updater,
//! and an observability event sink.
//!
//! The crate is deliberately free of I/O — everything here is pure
//! parsing or trait contracts, so the decision path stays testable
//! without a broker or a control plane.

pub mod duration;
pub mod error;
pub mod policy;
pub mod provider;
pub mod types;

pub use error::PolicyError;
pub use policy::{ANNOTATION_PREFIX, WorkloadPolicy};
pub use provider::{EventSink, MetricsProvider, ReplicaUpdater, ScaleEvent, ScaleOutcome};
pub use types::{QueueMetrics, WorkloadMeta};
