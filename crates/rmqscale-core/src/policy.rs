//! Annotation parsing — from raw workload metadata to a validated policy.

use std::collections::HashMap;
use std::time::Duration;

use crate::duration::parse_duration;
use crate::error::PolicyError;

/// Prefix namespacing every scaling annotation on a workload.
pub const ANNOTATION_PREFIX: &str = "rmqscale.io/";

/// Marker key enabling the scaler; presence only, value ignored.
pub const ENABLE: &str = "enable";
/// Queue to sample for backlog depth.
pub const QUEUE: &str = "queue";
/// Vhost the queue lives in.
pub const VHOST: &str = "vhost";
/// Lower replica bound.
pub const MIN_WORKERS: &str = "min-workers";
/// Upper replica bound.
pub const MAX_WORKERS: &str = "max-workers";
/// Messages one worker is expected to absorb (default 1).
pub const MESSAGES_PER_WORKER: &str = "messages-per-worker";
/// Maximum replica change per tick (default 1).
pub const STEPS: &str = "steps";
/// Additive bias on the demand-derived target (default 0).
pub const OFFSET: &str = "offset";
/// When true, min/max bounds are advisory and never force-corrected.
pub const OVERRIDE: &str = "override";
/// When true, scale-down is blocked while messages remain or arrive (default true).
pub const SAFE_UNSCALE: &str = "safe-unscale";
/// Dwell time after (re)registration before a record is evaluated again.
/// Compact integer-segment form only (`30s`, `5m0s`, `1h30m`); see
/// [`crate::duration::parse_duration`].
pub const COOLDOWN_DELAY: &str = "cooldown-delay";

/// Validated scaling policy for one workload, immutable once parsed.
///
/// Re-derived wholesale on every metadata change; there is no partial
/// merge of old and new policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadPolicy {
    pub queue: String,
    pub vhost: String,
    pub min_workers: i64,
    pub max_workers: i64,
    pub messages_per_worker: i64,
    pub steps: i64,
    pub offset: i64,
    pub override_limits: bool,
    pub safe_unscale: bool,
    pub cooldown: Duration,
}

impl WorkloadPolicy {
    /// Parse a workload's annotations into a policy.
    ///
    /// Returns `Ok(None)` when the enable marker is absent — the
    /// workload is simply not tracked, which is not an error. Required
    /// keys are validated before optional ones, and the first failure
    /// wins.
    pub fn from_annotations(
        workload: &str,
        annotations: &HashMap<String, String>,
    ) -> Result<Option<Self>, PolicyError> {
        let get = |key: &str| annotations.get(&format!("{ANNOTATION_PREFIX}{key}"));

        if get(ENABLE).is_none() {
            return Ok(None);
        }

        let queue = get(QUEUE)
            .ok_or_else(|| missing(workload, QUEUE))?
            .clone();
        let vhost = get(VHOST)
            .ok_or_else(|| missing(workload, VHOST))?
            .clone();

        let min_workers = get(MIN_WORKERS)
            .ok_or_else(|| missing(workload, MIN_WORKERS))
            .and_then(|v| int(workload, MIN_WORKERS, v))?;
        let max_workers = get(MAX_WORKERS)
            .ok_or_else(|| missing(workload, MAX_WORKERS))
            .and_then(|v| int(workload, MAX_WORKERS, v))?;

        // Both sizing divisors must be at least 1: zero steps would pin
        // the workload forever and a zero divisor has no ceiling.
        let messages_per_worker = match get(MESSAGES_PER_WORKER) {
            Some(v) => positive_int(workload, MESSAGES_PER_WORKER, v)?,
            None => 1,
        };
        let steps = match get(STEPS) {
            Some(v) => positive_int(workload, STEPS, v)?,
            None => 1,
        };
        let offset = match get(OFFSET) {
            Some(v) => int(workload, OFFSET, v)?,
            None => 0,
        };
        let override_limits = match get(OVERRIDE) {
            Some(v) => boolean(workload, OVERRIDE, v)?,
            None => false,
        };
        let safe_unscale = match get(SAFE_UNSCALE) {
            Some(v) => boolean(workload, SAFE_UNSCALE, v)?,
            None => true,
        };
        let cooldown = match get(COOLDOWN_DELAY) {
            Some(v) => parse_duration(v).ok_or(PolicyError::InvalidDuration {
                workload: workload.to_string(),
                key: COOLDOWN_DELAY,
            })?,
            None => Duration::ZERO,
        };

        // Inverted bounds would make the sizing clamps fight each other,
        // so they are rejected up front.
        if min_workers > max_workers {
            return Err(PolicyError::InvalidBounds {
                workload: workload.to_string(),
                min: min_workers,
                max: max_workers,
            });
        }

        Ok(Some(Self {
            queue,
            vhost,
            min_workers,
            max_workers,
            messages_per_worker,
            steps,
            offset,
            override_limits,
            safe_unscale,
            cooldown,
        }))
    }
}

fn missing(workload: &str, key: &'static str) -> PolicyError {
    PolicyError::MissingProperty {
        workload: workload.to_string(),
        key,
    }
}

fn int(workload: &str, key: &'static str, value: &str) -> Result<i64, PolicyError> {
    value.trim().parse().map_err(|_| PolicyError::InvalidInt {
        workload: workload.to_string(),
        key,
    })
}

fn positive_int(workload: &str, key: &'static str, value: &str) -> Result<i64, PolicyError> {
    let parsed = int(workload, key, value)?;
    if parsed < 1 {
        return Err(PolicyError::NotPositive {
            workload: workload.to_string(),
            key,
            value: parsed,
        });
    }
    Ok(parsed)
}

fn boolean(workload: &str, key: &'static str, value: &str) -> Result<bool, PolicyError> {
    value.trim().parse().map_err(|_| PolicyError::InvalidBool {
        workload: workload.to_string(),
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (format!("{ANNOTATION_PREFIX}{k}"), v.to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        annotations(&[
            ("enable", "true"),
            ("queue", "jobs"),
            ("vhost", "/"),
            ("min-workers", "1"),
            ("max-workers", "10"),
        ])
    }

    #[test]
    fn absent_enable_is_a_skip_not_an_error() {
        let mut ann = minimal();
        ann.remove(&format!("{ANNOTATION_PREFIX}enable"));
        assert_eq!(WorkloadPolicy::from_annotations("ns/app", &ann), Ok(None));
    }

    #[test]
    fn minimal_policy_gets_documented_defaults() {
        let policy = WorkloadPolicy::from_annotations("ns/app", &minimal())
            .unwrap()
            .unwrap();
        assert_eq!(policy.queue, "jobs");
        assert_eq!(policy.vhost, "/");
        assert_eq!(policy.min_workers, 1);
        assert_eq!(policy.max_workers, 10);
        assert_eq!(policy.messages_per_worker, 1);
        assert_eq!(policy.steps, 1);
        assert_eq!(policy.offset, 0);
        assert!(!policy.override_limits);
        assert!(policy.safe_unscale);
        assert_eq!(policy.cooldown, Duration::ZERO);
    }

    #[test]
    fn all_optionals_parsed() {
        let mut ann = minimal();
        for (k, v) in [
            ("messages-per-worker", "5"),
            ("steps", "3"),
            ("offset", "-2"),
            ("override", "true"),
            ("safe-unscale", "false"),
            ("cooldown-delay", "5m0s"),
        ] {
            ann.insert(format!("{ANNOTATION_PREFIX}{k}"), v.to_string());
        }
        let policy = WorkloadPolicy::from_annotations("ns/app", &ann)
            .unwrap()
            .unwrap();
        assert_eq!(policy.messages_per_worker, 5);
        assert_eq!(policy.steps, 3);
        assert_eq!(policy.offset, -2);
        assert!(policy.override_limits);
        assert!(!policy.safe_unscale);
        assert_eq!(policy.cooldown, Duration::from_secs(300));
    }

    #[test]
    fn missing_queue_names_the_key() {
        let mut ann = minimal();
        ann.remove(&format!("{ANNOTATION_PREFIX}queue"));
        assert_eq!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::MissingProperty {
                workload: "ns/app".to_string(),
                key: QUEUE,
            })
        );
    }

    #[test]
    fn required_keys_checked_in_order() {
        // Both queue and min-workers absent: queue is reported first.
        let mut ann = minimal();
        ann.remove(&format!("{ANNOTATION_PREFIX}queue"));
        ann.remove(&format!("{ANNOTATION_PREFIX}min-workers"));
        let err = WorkloadPolicy::from_annotations("ns/app", &ann).unwrap_err();
        assert!(matches!(err, PolicyError::MissingProperty { key: QUEUE, .. }));
    }

    #[test]
    fn non_integer_min_workers() {
        let mut ann = minimal();
        ann.insert(
            format!("{ANNOTATION_PREFIX}min-workers"),
            "two".to_string(),
        );
        assert!(matches!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::InvalidInt { key: MIN_WORKERS, .. })
        ));
    }

    #[test]
    fn non_boolean_override() {
        let mut ann = minimal();
        ann.insert(format!("{ANNOTATION_PREFIX}override"), "yes".to_string());
        assert!(matches!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::InvalidBool { key: OVERRIDE, .. })
        ));
    }

    #[test]
    fn bad_cooldown_duration() {
        let mut ann = minimal();
        ann.insert(
            format!("{ANNOTATION_PREFIX}cooldown-delay"),
            "soon".to_string(),
        );
        assert!(matches!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::InvalidDuration { key: COOLDOWN_DELAY, .. })
        ));
    }

    #[test]
    fn non_positive_sizing_values_rejected() {
        let mut ann = minimal();
        ann.insert(format!("{ANNOTATION_PREFIX}steps"), "0".to_string());
        assert_eq!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::NotPositive {
                workload: "ns/app".to_string(),
                key: STEPS,
                value: 0,
            })
        );

        let mut ann = minimal();
        ann.insert(
            format!("{ANNOTATION_PREFIX}messages-per-worker"),
            "-3".to_string(),
        );
        assert_eq!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::NotPositive {
                workload: "ns/app".to_string(),
                key: MESSAGES_PER_WORKER,
                value: -3,
            })
        );
    }

    #[test]
    fn inverted_bounds_rejected() {
        let mut ann = minimal();
        ann.insert(format!("{ANNOTATION_PREFIX}min-workers"), "10".to_string());
        ann.insert(format!("{ANNOTATION_PREFIX}max-workers"), "2".to_string());
        assert_eq!(
            WorkloadPolicy::from_annotations("ns/app", &ann),
            Err(PolicyError::InvalidBounds {
                workload: "ns/app".to_string(),
                min: 10,
                max: 2,
            })
        );
    }
}
