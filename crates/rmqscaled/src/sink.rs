//! Log-backed observability sink.

use tracing::info;

use rmqscale_core::{EventSink, ScaleEvent, ScaleOutcome};

/// Emits every reconciliation outcome as a structured log line, one per
/// tracked workload per tick.
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: &ScaleEvent) {
        let outcome = match event.outcome {
            ScaleOutcome::ScaleUp => "scale-up",
            ScaleOutcome::ScaleDown => "scale-down",
            ScaleOutcome::SafeCooldown => "safe-cooldown",
            ScaleOutcome::Steady => "steady",
        };
        info!(
            workload = %event.workload,
            outcome,
            queue_depth = event.queue_depth,
            published = event.published,
            delta = event.delta,
            "scaling outcome"
        );
    }
}
