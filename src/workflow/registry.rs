/// Hot-reload workflow registry using ArcSwap
///
/// Provides lock-free, atomic updates to the in-memory set of workflow snapshots.
/// Each update swaps the entire map pointer, so a run that already captured its
/// `Arc<Workflow>` keeps executing against that snapshot while the registry moves on.

use crate::workflow::types::Workflow;
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, path::Path, sync::Arc};

/// Lock-free workflow registry for hot-reload capabilities
///
/// The definition store owns workflows; this registry only holds the latest
/// snapshot of each one for the engine to read at run start.
#[derive(Debug)]
pub struct WorkflowRegistry {
    /// Key: workflow_id, Value: immutable snapshot
    workflows: ArcSwap<HashMap<String, Arc<Workflow>>>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Load every `*.json` workflow definition from a directory
    ///
    /// Files that fail to parse are skipped with a warning so one broken
    /// definition doesn't take the others down. A missing directory yields an
    /// empty registry. Returns the number of workflows loaded.
    pub async fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        if !tokio::fs::try_exists(dir).await? {
            tracing::warn!("📂 Workflow directory '{}' does not exist, registry starts empty", dir.display());
            return Ok(0);
        }

        let mut loaded = HashMap::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let raw = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<Workflow>(&raw) {
                Ok(workflow) => {
                    tracing::debug!("📥 Loaded workflow '{}' from {}", workflow.id, path.display());
                    loaded.insert(workflow.id.clone(), Arc::new(workflow));
                }
                Err(e) => {
                    tracing::warn!("⚠️ Skipping invalid workflow file {}: {}", path.display(), e);
                }
            }
        }

        let count = loaded.len();
        let current = self.workflows.load();
        let mut new_registry = (**current).clone();
        new_registry.extend(loaded);
        self.workflows.store(Arc::new(new_registry));

        tracing::info!("Initialized workflow registry with {} workflows from {}", count, dir.display());
        Ok(count)
    }

    /// Insert or replace a workflow snapshot (atomic pointer swap)
    pub fn upsert(&self, workflow: Workflow) {
        let workflow_id = workflow.id.clone();
        let current = self.workflows.load();
        let mut new_registry = (**current).clone();
        new_registry.insert(workflow_id.clone(), Arc::new(workflow));
        self.workflows.store(Arc::new(new_registry));

        tracing::info!("Hot-reloaded workflow: {}", workflow_id);
    }

    /// Get the current snapshot of a workflow (lock-free read)
    pub fn get(&self, workflow_id: &str) -> Option<Arc<Workflow>> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// Remove a workflow from registry
    pub fn remove(&self, workflow_id: &str) -> bool {
        let current = self.workflows.load();
        let mut new_registry = (**current).clone();

        let removed = new_registry.remove(workflow_id).is_some();
        if removed {
            self.workflows.store(Arc::new(new_registry));
            tracing::info!("Removed workflow from registry: {}", workflow_id);
        }
        removed
    }

    /// List all active workflow IDs
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.load().keys().cloned().collect();
        ids.sort();
        ids
    }
}
