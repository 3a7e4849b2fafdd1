//! rmqscale-rabbit — queue metrics from the RabbitMQ management API.
//!
//! `RabbitClient` implements the `MetricsProvider` contract by polling
//! `GET /api/queues/{vhost}/{queue}` with basic auth. The management
//! API exposes the publish counter as a monotonically increasing total,
//! so the per-window published count is derived locally from successive
//! samples (see [`rate::RateTracker`]).

pub mod client;
pub mod rate;

pub use client::{RabbitClient, RabbitError};
