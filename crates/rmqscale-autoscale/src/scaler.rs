//! The scaling decision function.
//!
//! Pure sizing arithmetic: no clocks, no I/O. Safe-unscale and cooldown
//! gating happen in the reconciler, which owns the externally observed
//! publish rate and wall-clock state.

use tracing::debug;

use crate::registry::WorkloadRecord;

/// Compute the signed replica delta for one workload given a fresh
/// queue observation.
///
/// In order: stability gate, out-of-bounds corrections (which ignore
/// the step limiter — they are corrections, not sizing), then
/// ceiling-division target sizing capped by `steps` on both sides.
pub fn decide(record: &WorkloadRecord, consumers: i64, depth: i64) -> i64 {
    let id = record.meta.id.as_str();
    let policy = &record.policy;
    let ready = record.ready_workers;

    if ready != record.replicas {
        debug!(
            workload = id,
            ready,
            wanted = record.replicas,
            "unstable, waiting for workers to converge"
        );
        return 0;
    }

    if ready > policy.max_workers {
        if policy.override_limits {
            debug!(workload = id, "limits overridden, leaving excess workers");
            return 0;
        }
        debug!(
            workload = id,
            ready,
            max = policy.max_workers,
            "too many workers, correcting down to max"
        );
        return policy.max_workers - record.replicas;
    }

    if ready < policy.min_workers {
        if policy.override_limits {
            debug!(workload = id, "limits overridden, leaving deficit");
            return 0;
        }
        debug!(
            workload = id,
            ready,
            min = policy.min_workers,
            "not enough workers, correcting up to min"
        );
        return policy.min_workers - record.replicas;
    }

    // Real-valued ceiling: one queued message still demands one worker
    // even when messages-per-worker exceeds the backlog. Values below 1
    // behave as 1. Depth is non-negative, so the add-then-divide form
    // is an exact ceiling.
    let per_worker = policy.messages_per_worker.max(1);
    let target = (depth + per_worker - 1) / per_worker - ready + policy.offset;

    if target > 0 {
        if ready == policy.max_workers {
            debug!(
                workload = id,
                max = policy.max_workers,
                depth,
                consumers,
                "saturated at max workers"
            );
            return 0;
        }
        let delta = target.min(policy.steps);
        debug!(workload = id, delta, target, steps = policy.steps, "scaling up");
        delta
    } else if target < 0 {
        if ready == policy.min_workers {
            debug!(
                workload = id,
                min = policy.min_workers,
                depth,
                consumers,
                "already at min workers"
            );
            return 0;
        }
        let delta = target.max(-policy.steps);
        debug!(workload = id, delta, target, steps = policy.steps, "scaling down");
        delta
    } else {
        debug!(workload = id, depth, consumers, offset = policy.offset, "steady");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmqscale_core::{WorkloadMeta, WorkloadPolicy};
    use std::collections::HashMap;
    use std::time::Duration;

    struct Setup {
        min: i64,
        max: i64,
        ready: i64,
        replicas: i64,
        steps: i64,
        per_worker: i64,
        offset: i64,
        override_limits: bool,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                min: 1,
                max: 10,
                ready: 1,
                replicas: 1,
                steps: 1,
                per_worker: 1,
                offset: 0,
                override_limits: false,
            }
        }
    }

    fn record(s: Setup) -> WorkloadRecord {
        WorkloadRecord {
            meta: WorkloadMeta {
                id: "ns/app".to_string(),
                annotations: HashMap::new(),
                replicas: s.replicas,
                ready_replicas: s.ready,
            },
            policy: WorkloadPolicy {
                queue: "jobs".to_string(),
                vhost: "/".to_string(),
                min_workers: s.min,
                max_workers: s.max,
                messages_per_worker: s.per_worker,
                steps: s.steps,
                offset: s.offset,
                override_limits: s.override_limits,
                safe_unscale: true,
                cooldown: Duration::ZERO,
            },
            replicas: s.replicas,
            ready_workers: s.ready,
            created_at: 0,
        }
    }

    #[test]
    fn stability_gate_dominates() {
        let r = record(Setup {
            ready: 2,
            replicas: 5,
            ..Setup::default()
        });
        // Huge backlog, still zero: the last request has not converged.
        assert_eq!(decide(&r, 2, 10_000), 0);
    }

    #[test]
    fn excess_workers_corrected_to_max_in_one_step() {
        let r = record(Setup {
            ready: 11,
            replicas: 11,
            ..Setup::default()
        });
        // steps=1 is ignored for corrections.
        assert_eq!(decide(&r, 11, 0), -1);

        let r = record(Setup {
            ready: 15,
            replicas: 15,
            ..Setup::default()
        });
        assert_eq!(decide(&r, 15, 0), -5);
    }

    #[test]
    fn excess_workers_left_alone_when_overridden() {
        let r = record(Setup {
            ready: 11,
            replicas: 11,
            override_limits: true,
            ..Setup::default()
        });
        assert_eq!(decide(&r, 11, 0), 0);
    }

    #[test]
    fn deficit_corrected_to_min() {
        let r = record(Setup {
            min: 3,
            ready: 1,
            replicas: 1,
            ..Setup::default()
        });
        assert_eq!(decide(&r, 1, 0), 2);

        let overridden = record(Setup {
            min: 3,
            ready: 1,
            replicas: 1,
            override_limits: true,
            ..Setup::default()
        });
        assert_eq!(decide(&overridden, 1, 0), 0);
    }

    #[test]
    fn one_message_backlog_scales_up_by_one() {
        let r = record(Setup::default());
        assert_eq!(decide(&r, 1, 2), 1);
    }

    #[test]
    fn growth_capped_by_steps() {
        let r = record(Setup {
            ready: 2,
            replicas: 2,
            steps: 2,
            ..Setup::default()
        });
        // Raw target = ceil(4/1) - 2 = 2, equal to steps.
        assert_eq!(decide(&r, 2, 4), 2);

        let r = record(Setup {
            ready: 2,
            replicas: 2,
            steps: 2,
            ..Setup::default()
        });
        // Raw target = 98, still capped at 2.
        assert_eq!(decide(&r, 2, 100), 2);
    }

    #[test]
    fn shrink_capped_by_steps() {
        let r = record(Setup {
            ready: 4,
            replicas: 4,
            steps: 2,
            ..Setup::default()
        });
        // Raw target = ceil(2/1) - 4 = -2.
        assert_eq!(decide(&r, 4, 2), -2);

        let r = record(Setup {
            ready: 8,
            replicas: 8,
            steps: 2,
            ..Setup::default()
        });
        // Raw target = -8, capped at -2.
        assert_eq!(decide(&r, 8, 0), -2);
    }

    #[test]
    fn saturated_at_max_is_a_noop() {
        let r = record(Setup {
            ready: 10,
            replicas: 10,
            ..Setup::default()
        });
        assert_eq!(decide(&r, 10, 1000), 0);
    }

    #[test]
    fn at_min_floor_is_a_noop() {
        let r = record(Setup::default());
        // Empty queue wants -1, but ready == min.
        assert_eq!(decide(&r, 1, 0), 0);
    }

    #[test]
    fn ceiling_division_boundary() {
        let r = record(Setup {
            ready: 4,
            replicas: 4,
            per_worker: 2,
            ..Setup::default()
        });
        // ceil(8/2) = 4 == ready.
        assert_eq!(decide(&r, 4, 8), 0);

        let r = record(Setup {
            ready: 4,
            replicas: 4,
            per_worker: 2,
            ..Setup::default()
        });
        // ceil(9/2) = 5, one more than ready.
        assert_eq!(decide(&r, 4, 9), 1);
    }

    #[test]
    fn fractional_backlog_still_demands_a_worker() {
        let r = record(Setup {
            min: 0,
            ready: 0,
            replicas: 0,
            per_worker: 2,
            ..Setup::default()
        });
        // ceil(1/2) = 1, not 0.
        assert_eq!(decide(&r, 0, 1), 1);
    }

    #[test]
    fn ceiling_matches_real_valued_division() {
        // The integer add-then-divide ceiling must agree with
        // ceil(depth / per_worker) over float division for every
        // non-negative backlog.
        for per_worker in 1..8 {
            for depth in 0..60 {
                let r = record(Setup {
                    min: 0,
                    max: 100,
                    ready: 10,
                    replicas: 10,
                    steps: 100,
                    per_worker,
                    ..Setup::default()
                });
                let expected = (depth as f64 / per_worker as f64).ceil() as i64 - 10;
                assert_eq!(decide(&r, 10, depth), expected);
            }
        }
    }

    #[test]
    fn offset_biases_the_target() {
        let r = record(Setup {
            ready: 2,
            replicas: 2,
            offset: 1,
            ..Setup::default()
        });
        // ceil(2/1) - 2 + 1 = 1.
        assert_eq!(decide(&r, 2, 2), 1);

        let r = record(Setup {
            ready: 2,
            replicas: 2,
            offset: -1,
            ..Setup::default()
        });
        // ceil(2/1) - 2 - 1 = -1.
        assert_eq!(decide(&r, 2, 2), -1);
    }

    #[test]
    fn growth_never_exceeds_steps_or_demand() {
        for depth in 0..40 {
            for steps in 1..5 {
                let r = record(Setup {
                    ready: 3,
                    replicas: 3,
                    steps,
                    ..Setup::default()
                });
                let delta = decide(&r, 3, depth);
                assert!(delta.abs() <= steps, "delta {delta} exceeds steps {steps}");
                let target = depth - 3;
                assert!(delta.abs() <= target.abs().max(0));
            }
        }
    }
}
