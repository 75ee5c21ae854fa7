use std::collections::{BTreeMap, HashMap};

use crate::models::{HierarchyChange, OrgId, PendingChange, System, SystemId};

/// Uncommitted parent reassignments for one editing session, keyed by entity.
///
/// The ledger is built against an immutable original-parent snapshot captured
/// when editing begins. Editing an entity back to its original value collapses
/// the entry; pending entries iterate in stable id order.
#[derive(Debug, Clone, Default)]
pub struct ChangeLedger {
    original: HashMap<SystemId, Option<SystemId>>,
    pending: BTreeMap<SystemId, PendingChange>,
}

impl ChangeLedger {
    /// Captures the committed parent of every tenant entity as the revert
    /// baseline.
    pub fn from_snapshot(entities: &[System], org_id: OrgId) -> Self {
        let original = entities
            .iter()
            .filter(|system| system.in_tenant(org_id))
            .map(|system| (system.id, system.parent_id))
            .collect();
        Self {
            original,
            pending: BTreeMap::new(),
        }
    }

    /// Records a parent edit. Returns the pending entry, or `None` when the
    /// edit restored the original value and collapsed to a no-op.
    pub fn edit(&mut self, system: &System, new_parent_id: Option<SystemId>) -> Option<&PendingChange> {
        // Entities the snapshot has never seen are captured on first edit.
        let original = *self
            .original
            .entry(system.id)
            .or_insert(system.parent_id);

        if new_parent_id == original {
            self.pending.remove(&system.id);
            return None;
        }

        let entry = self
            .pending
            .entry(system.id)
            .and_modify(|change| change.new_parent_id = new_parent_id)
            .or_insert(PendingChange {
                system_id: system.id,
                old_parent_id: original,
                new_parent_id,
                label: system.name.clone(),
            });
        Some(entry)
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn get(&self, system_id: SystemId) -> Option<&PendingChange> {
        self.pending.get(&system_id)
    }

    pub fn original_parent(&self, system_id: SystemId) -> Option<Option<SystemId>> {
        self.original.get(&system_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.pending.values()
    }

    /// The full change batch for the submitter, in stable id order.
    pub fn changes(&self) -> Vec<HierarchyChange> {
        self.pending
            .values()
            .map(|change| HierarchyChange {
                system_id: change.system_id,
                new_parent_id: change.new_parent_id,
            })
            .collect()
    }

    /// Restores every affected entity's parent to the snapshot value and
    /// clears the ledger.
    pub fn revert(&mut self, entities: &mut [System]) {
        for system in entities.iter_mut() {
            if self.pending.contains_key(&system.id) {
                if let Some(original) = self.original.get(&system.id) {
                    system.parent_id = *original;
                }
            }
        }
        self.pending.clear();
    }

    /// Drops all pending entries. Called after a successful commit; a failed
    /// commit must leave the ledger untouched.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
