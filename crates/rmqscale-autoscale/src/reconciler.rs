//! The reconciliation loop.
//!
//! One tokio task owns the [`Registry`] and consumes three event
//! sources through a single `select!`: discovery events (register /
//! deregister), the fixed tick, and the shutdown signal. Events are
//! handled to completion one at a time, so no record's decision races a
//! concurrent mutation — a tick sweep performs its metric fetches and
//! replica updates sequentially from inside the handler.
//!
//! Register and deregister for one identity arrive on the same channel
//! and are therefore applied in arrival order.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use rmqscale_core::{
    EventSink, MetricsProvider, ReplicaUpdater, ScaleEvent, ScaleOutcome, WorkloadMeta,
    WorkloadPolicy,
};

use crate::registry::{Registry, WorkloadRecord, epoch_secs};
use crate::scaler;

/// Discovery events delivered by a workload source.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A workload appeared or its metadata changed.
    Register(WorkloadMeta),
    /// A workload went away; carries the identity key.
    Deregister(String),
}

/// Drives the observe → decide → act loop over all tracked workloads.
pub struct Reconciler<M, U, S> {
    registry: Registry,
    metrics: M,
    updater: U,
    sink: S,
}

impl<M, U, S> Reconciler<M, U, S>
where
    M: MetricsProvider,
    U: ReplicaUpdater,
    S: EventSink,
{
    pub fn new(metrics: M, updater: U, sink: S) -> Self {
        Self {
            registry: Registry::new(),
            metrics,
            updater,
            sink,
        }
    }

    /// The tracked workload set. Exposed for inspection; all mutation
    /// goes through events and sweeps.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run until the shutdown signal flips.
    ///
    /// The tick fires on a fixed cadence independent of event volume;
    /// ticks that would pile up behind a slow sweep are skipped rather
    /// than bursted.
    pub async fn run(
        mut self,
        tick: Duration,
        mut events: mpsc::Receiver<DiscoveryEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_secs = tick.as_secs(), "reconciler started");

        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_event(event),
                _ = ticker.tick() => self.sweep().await,
                _ = shutdown.changed() => {
                    info!("reconciler shutting down");
                    break;
                }
            }
        }
    }

    /// Apply one discovery event to the registry.
    pub fn handle_event(&mut self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::Register(meta) => self.register(meta),
            DiscoveryEvent::Deregister(id) => {
                if self.registry.remove(&id).is_some() {
                    info!(workload = %id, "workload deregistered");
                }
            }
        }
    }

    fn register(&mut self, meta: WorkloadMeta) {
        let id = meta.id.clone();
        match WorkloadPolicy::from_annotations(&id, &meta.annotations) {
            Ok(Some(policy)) => {
                // Metadata churn replaces the record wholesale but keeps
                // the original registration time, so routine updates do
                // not perpetually defer cooldown expiry.
                let created_at = match self.registry.get(&id) {
                    Some(existing) => {
                        info!(workload = %id, "updating tracked workload");
                        existing.created_at
                    }
                    None => {
                        info!(workload = %id, "tracking new workload");
                        epoch_secs()
                    }
                };
                let record = WorkloadRecord {
                    replicas: meta.replicas,
                    ready_workers: meta.ready_replicas,
                    meta,
                    policy,
                    created_at,
                };
                self.registry.insert(id, record);
            }
            Ok(None) => {
                // Not enabled for autoscaling. If it was tracked before,
                // the marker was removed and tracking stops.
                if self.registry.remove(&id).is_some() {
                    info!(workload = %id, "autoscaling disabled, workload untracked");
                } else {
                    debug!(workload = %id, "workload not enabled for autoscaling, skipping");
                }
            }
            Err(err) => {
                warn!(workload = %id, error = %err, "invalid scaling policy, workload not tracked");
                self.registry.remove(&id);
            }
        }
    }

    /// One tick: evaluate every tracked workload in insertion order.
    ///
    /// Per-record failures are logged and skipped; nothing here aborts
    /// the sweep or the loop.
    pub async fn sweep(&mut self) {
        let now = epoch_secs();
        for id in self.registry.ids() {
            self.evaluate(&id, now).await;
        }
    }

    async fn evaluate(&mut self, id: &str, now: u64) {
        let (queue, vhost, window_secs) = {
            let Some(record) = self.registry.get(id) else {
                return;
            };
            if record.is_cooling_down(now) {
                // Cooldown suppresses the whole evaluation, not just the
                // write-back: no fetch, no decision, no event.
                debug!(
                    workload = %id,
                    since = now.saturating_sub(record.created_at),
                    cooldown_secs = record.policy.cooldown.as_secs(),
                    "cooling down, skipping this tick"
                );
                return;
            }
            (
                record.policy.queue.clone(),
                record.policy.vhost.clone(),
                record.policy.cooldown.as_secs(),
            )
        };

        let metrics = match self.metrics.queue_metrics(&queue, &vhost, window_secs).await {
            Ok(m) => m,
            Err(err) => {
                warn!(
                    workload = %id,
                    queue = %queue,
                    error = %err,
                    "queue metrics fetch failed, retrying next tick"
                );
                return;
            }
        };

        let (delta, outcome, baseline, meta) = {
            let Some(record) = self.registry.get(id) else {
                return;
            };
            let delta = scaler::decide(record, metrics.consumers, metrics.depth);
            let suppressed = record.policy.safe_unscale
                && delta < 0
                && (metrics.depth > 0 || metrics.published > 0);
            let outcome = if delta > 0 {
                ScaleOutcome::ScaleUp
            } else if suppressed {
                ScaleOutcome::SafeCooldown
            } else if delta < 0 {
                ScaleOutcome::ScaleDown
            } else {
                ScaleOutcome::Steady
            };
            (delta, outcome, record.replicas, record.meta.clone())
        };

        self.sink.record(&ScaleEvent {
            workload: id.to_string(),
            outcome,
            queue_depth: metrics.depth,
            published: metrics.published,
            delta,
        });

        match outcome {
            ScaleOutcome::SafeCooldown => {
                info!(
                    workload = %id,
                    delta,
                    depth = metrics.depth,
                    published = metrics.published,
                    "safe unscale: holding scale-down while messages remain"
                );
            }
            ScaleOutcome::ScaleUp | ScaleOutcome::ScaleDown => {
                let target = baseline + delta;
                info!(workload = %id, from = baseline, to = target, "updating replicas");
                match self.updater.apply_replicas(&meta, target).await {
                    Ok(new_meta) => {
                        if let Some(record) = self.registry.get_mut(id) {
                            record.replicas = new_meta.replicas;
                            record.meta = new_meta;
                        }
                    }
                    Err(err) => {
                        // Leave the cached baseline untouched; next tick
                        // recomputes from the last confirmed state.
                        error!(
                            workload = %id,
                            error = %err,
                            "replica update failed, retrying next tick"
                        );
                    }
                }
            }
            ScaleOutcome::Steady => {}
        }
    }
}
