//! rmqscale-autoscale — queue-depth driven replica scaling.
//!
//! Tracks a registry of workloads, samples their queue metrics on a
//! fixed tick, and adjusts replica counts through a [`ReplicaUpdater`].
//!
//! # Scaling Algorithm
//!
//! ```text
//! if ready != replicas:            0   // still converging
//! if ready > max and !override:    max - replicas   // forced correction
//! if ready < min and !override:    min - replicas
//!
//! target = ceil(depth / messages_per_worker) - ready + offset
//!
//! target > 0: 0 at max, else min(target, steps)
//! target < 0: 0 at min, else max(target, -steps)
//! ```
//!
//! Safe-unscale holds any negative delta while the queue is non-empty
//! or messages are still arriving; cooldown skips a record entirely for
//! its dwell window after (re)registration. Both gates live in the
//! reconciler, not the sizing arithmetic.
//!
//! [`ReplicaUpdater`]: rmqscale_core::ReplicaUpdater

pub mod reconciler;
pub mod registry;
pub mod scaler;

pub use reconciler::{DiscoveryEvent, Reconciler};
pub use registry::{Registry, WorkloadRecord};
pub use scaler::decide;
