//! Workload registry — the in-memory set of tracked workloads.
//!
//! Owned exclusively by the reconciler task, so no locking: all reads
//! and writes happen on one logical thread of control. Iteration is in
//! insertion order, which keeps tick sweeps deterministic.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rmqscale_core::{WorkloadMeta, WorkloadPolicy};

/// One tracked workload: its parsed policy plus live bookkeeping.
#[derive(Debug, Clone)]
pub struct WorkloadRecord {
    /// Snapshot of the underlying workload object, used to issue updates.
    pub meta: WorkloadMeta,
    /// Validated scaling policy, re-derived on every metadata change.
    pub policy: WorkloadPolicy,
    /// Last known desired replica count (authoritative local cache).
    pub replicas: i64,
    /// Last observed ready replica count.
    pub ready_workers: i64,
    /// Epoch seconds when this workload first became tracked; drives
    /// the cooldown window.
    pub created_at: u64,
}

impl WorkloadRecord {
    /// True while the cooldown dwell window is still open.
    ///
    /// A zero cooldown disables the gate entirely; otherwise the record
    /// cools until `now - created_at` reaches the configured delay.
    pub fn is_cooling_down(&self, now: u64) -> bool {
        let cooldown = self.policy.cooldown.as_secs();
        cooldown > 0 && now.saturating_sub(self.created_at) < cooldown
    }
}

/// Identity-keyed, insertion-ordered map of workload records.
///
/// Purely in-memory; no operation blocks on external calls.
#[derive(Debug, Default)]
pub struct Registry {
    records: HashMap<String, WorkloadRecord>,
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace the record for `id`.
    ///
    /// Replacement keeps the original insertion position.
    pub fn insert(&mut self, id: String, record: WorkloadRecord) {
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }

    /// Remove the record for `id` if present; idempotent when absent.
    pub fn remove(&mut self, id: &str) -> Option<WorkloadRecord> {
        let removed = self.records.remove(id);
        if removed.is_some() {
            self.order.retain(|k| k != id);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&WorkloadRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut WorkloadRecord> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identity keys in insertion order, cloned so a sweep sees the
    /// registry as of the moment it began.
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
