//! Error types for annotation policy parsing.

use thiserror::Error;

/// Errors raised while parsing a workload's scaling annotations.
///
/// Parsing is fail-fast: required keys are checked before optional ones
/// and only the first failure is reported. A policy error never takes
/// the process down — the workload is simply not tracked.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("workload {workload} has no property `{key}` filled")]
    MissingProperty { workload: String, key: &'static str },

    #[error("workload {workload} property `{key}` is not an int (ex: 1)")]
    InvalidInt { workload: String, key: &'static str },

    #[error("workload {workload} property `{key}` is not a boolean (ex: true)")]
    InvalidBool { workload: String, key: &'static str },

    #[error("workload {workload} property `{key}` is not a duration (ex: 5m0s)")]
    InvalidDuration { workload: String, key: &'static str },

    #[error("workload {workload} property `{key}` must be a positive int (got {value})")]
    NotPositive {
        workload: String,
        key: &'static str,
        value: i64,
    },

    #[error("workload {workload} has min-workers ({min}) greater than max-workers ({max})")]
    InvalidBounds { workload: String, min: i64, max: i64 },
}
