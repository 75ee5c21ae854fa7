use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::Utc;

use crate::error::{LibError, Result};
use crate::models::{HierarchyChange, OrgId, System};

/// The persistence collaborator owning the source of truth for catalog
/// entities. Commits are all-or-nothing: either every change in the batch is
/// applied or none is. Implementations may apply server-side side effects
/// (cascading re-parenting rules), which is why callers re-fetch after a
/// successful commit instead of inferring the new state locally.
pub trait HierarchyStore {
    fn fetch_entities(&self, org_id: OrgId) -> impl Future<Output = Result<Vec<System>>> + Send;

    fn commit_hierarchy_changes(
        &self,
        changes: Vec<HierarchyChange>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Reference collaborator backed by process memory. Useful for tests and for
/// driving the editing surface before a real backend exists.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entities: Arc<Mutex<Vec<System>>>,
}

impl InMemoryStore {
    pub fn new(entities: Vec<System>) -> Self {
        Self {
            entities: Arc::new(Mutex::new(entities)),
        }
    }

    pub fn snapshot(&self) -> Vec<System> {
        self.entities.lock().expect("store lock poisoned").clone()
    }
}

impl HierarchyStore for InMemoryStore {
    async fn fetch_entities(&self, org_id: OrgId) -> Result<Vec<System>> {
        let entities = self.entities.lock().expect("store lock poisoned");
        Ok(entities
            .iter()
            .filter(|system| system.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn commit_hierarchy_changes(&self, changes: Vec<HierarchyChange>) -> Result<()> {
        let mut entities = self.entities.lock().expect("store lock poisoned");

        // Validate the whole batch before touching anything.
        for change in &changes {
            if !entities
                .iter()
                .any(|system| system.id == change.system_id && !system.deleted)
            {
                return Err(LibError::commit(
                    "Commit referenced an unknown system",
                    anyhow!("no live entity with id {}", change.system_id),
                ));
            }
        }

        let now = Utc::now().naive_utc();
        for change in &changes {
            for system in entities.iter_mut() {
                if system.id == change.system_id {
                    system.parent_id = change.new_parent_id;
                    system.updated_at = now;
                }
            }
        }
        tracing::debug!(count = changes.len(), "applied hierarchy change batch");
        Ok(())
    }
}
