//! Manifest-directory discovery source and replica updater.
//!
//! A control-plane-agnostic stand-in for a cluster watch: workloads
//! are described by TOML files in one directory, polled on an interval
//! and diffed into register/deregister events. The matching updater
//! persists replica changes back into the same files, so any cluster
//! integration only has to implement the same two traits.
//!
//! Manifest shape:
//!
//! ```toml
//! name = "default/mailer"
//! replicas = 2
//! ready-replicas = 2
//!
//! [annotations]
//! "rmqscale.io/enable" = "true"
//! "rmqscale.io/queue" = "mail-out"
//! "rmqscale.io/vhost" = "/"
//! "rmqscale.io/min-workers" = "1"
//! "rmqscale.io/max-workers" = "10"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use rmqscale_autoscale::DiscoveryEvent;
use rmqscale_core::{ReplicaUpdater, WorkloadMeta};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Manifest {
    name: String,
    #[serde(default)]
    replicas: i64,
    #[serde(default)]
    ready_replicas: i64,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

impl Manifest {
    fn into_meta(self) -> WorkloadMeta {
        WorkloadMeta {
            id: self.name,
            annotations: self.annotations,
            replicas: self.replicas,
            ready_replicas: self.ready_replicas,
        }
    }
}

/// Collect every parseable manifest under `dir`, keyed by workload id.
///
/// Unreadable or malformed files are logged and skipped — one broken
/// manifest must not hide the rest.
fn scan(dir: &Path) -> HashMap<String, (PathBuf, WorkloadMeta)> {
    let mut found = HashMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "manifest dir unreadable");
            return found;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let manifest = std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| toml::from_str::<Manifest>(&raw).map_err(Into::into));
        match manifest {
            Ok(manifest) => {
                let meta = manifest.into_meta();
                found.insert(meta.id.clone(), (path, meta));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping bad manifest");
            }
        }
    }
    found
}

/// Polls a manifest directory and emits discovery events on change.
pub struct ManifestSource {
    dir: PathBuf,
    seen: HashMap<String, WorkloadMeta>,
}

impl ManifestSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: HashMap::new(),
        }
    }

    /// Diff the directory against the last poll.
    ///
    /// New and changed workloads become `Register`, removed ones become
    /// `Deregister`. Unchanged workloads emit nothing.
    pub fn poll(&mut self) -> Vec<DiscoveryEvent> {
        let current: HashMap<String, WorkloadMeta> = scan(&self.dir)
            .into_iter()
            .map(|(id, (_path, meta))| (id, meta))
            .collect();

        let mut events = Vec::new();
        for (id, meta) in &current {
            if self.seen.get(id) != Some(meta) {
                events.push(DiscoveryEvent::Register(meta.clone()));
            }
        }
        for id in self.seen.keys() {
            if !current.contains_key(id) {
                events.push(DiscoveryEvent::Deregister(id.clone()));
            }
        }

        self.seen = current;
        events
    }

    /// Poll on `every` until shutdown, handing events to the reconciler.
    pub async fn run(
        mut self,
        every: Duration,
        events: mpsc::Sender<DiscoveryEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(dir = %self.dir.display(), every_secs = every.as_secs(), "manifest discovery started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(every) => {
                    for event in self.poll() {
                        debug!(?event, "discovery event");
                        if events.send(event).await.is_err() {
                            // Reconciler is gone; nothing left to feed.
                            return;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("manifest discovery shutting down");
                    return;
                }
            }
        }
    }
}

/// Persists replica changes back into the manifest directory.
pub struct ManifestUpdater {
    dir: PathBuf,
}

impl ManifestUpdater {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReplicaUpdater for ManifestUpdater {
    async fn apply_replicas(
        &self,
        meta: &WorkloadMeta,
        replicas: i64,
    ) -> anyhow::Result<WorkloadMeta> {
        let (path, current) = scan(&self.dir)
            .remove(&meta.id)
            .with_context(|| format!("no manifest for workload {}", meta.id))?;

        let manifest = Manifest {
            name: current.id.clone(),
            replicas,
            // Readiness converges on its own; the updater only states
            // desire.
            ready_replicas: current.ready_replicas,
            annotations: current.annotations.clone(),
        };
        let raw = toml::to_string_pretty(&manifest)?;
        std::fs::write(&path, raw)
            .with_context(|| format!("writing manifest {}", path.display()))?;

        let mut updated = current;
        updated.replicas = replicas;
        Ok(updated)
    }
}
