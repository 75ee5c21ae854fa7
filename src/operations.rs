use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::algorithms;
use crate::error::{LibError, Result};
use crate::invariants;
use crate::ledger::ChangeLedger;
use crate::models::{
    HierarchyStats, MoveValidation, OrgId, PendingChange, System, SystemId, TreeNode,
};
use crate::reorg::DropOutcome;
use crate::store::HierarchyStore;

/// View-layer-friendly hierarchy actions, dispatched over one session.
///
/// A bridge (IPC, wasm, test harness) can deserialize these and call
/// [`HierarchySession::execute`] without bespoke glue per action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum HierarchyOperation {
    Refresh,
    Forest,
    Stats,
    ValidateMove {
        system_id: SystemId,
        new_parent_id: Option<SystemId>,
    },
    PossibleParents {
        system_id: SystemId,
    },
    EditParent {
        system_id: SystemId,
        new_parent_id: Option<SystemId>,
    },
    PendingChanges,
    Revert,
    Commit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HierarchyOperationResult {
    Forest {
        roots: Vec<TreeNode>,
    },
    Stats {
        stats: HierarchyStats,
    },
    Validation {
        validation: MoveValidation,
    },
    Candidates {
        systems: Vec<System>,
    },
    Pending {
        changes: Vec<PendingChange>,
        dirty: bool,
    },
    Committed {
        outcome: CommitOutcome,
    },
    Refreshed,
    Reverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Nothing was dirty; no request was dispatched.
    Clean,
    Committed {
        applied: usize,
    },
}

/// One tenant's editing session: the working snapshot, the pending-change
/// ledger, and the commit policy (at most one in-flight commit; structural
/// edits disabled while committing).
///
/// Read paths (`forest`, `stats`, `validate_move`, `possible_parents`) are
/// synchronous pure computations over the current snapshot and never mutate
/// shared state. Dropping the session discards pending changes without
/// committing them; an already-dispatched commit keeps running detached.
pub struct HierarchySession<S> {
    store: S,
    org_id: OrgId,
    entities: Vec<System>,
    ledger: ChangeLedger,
    commit_in_flight: bool,
}

impl<S> HierarchySession<S>
where
    S: HierarchyStore + Clone + Send + Sync + 'static,
{
    /// Opens a session by fetching the tenant's entities from the store.
    pub async fn connect(store: S, org_id: OrgId) -> Result<Self> {
        let entities = store.fetch_entities(org_id).await?;
        tracing::debug!(%org_id, count = entities.len(), "hierarchy session connected");
        let ledger = ChangeLedger::from_snapshot(&entities, org_id);
        Ok(Self {
            store,
            org_id,
            entities,
            ledger,
            commit_in_flight: false,
        })
    }

    /// Re-fetches from the source of truth, discarding pending edits and
    /// re-baselining the ledger. Also clears a stale in-flight marker left by
    /// an abandoned commit await.
    pub async fn refresh(&mut self) -> Result<()> {
        let entities = self.store.fetch_entities(self.org_id).await?;
        tracing::debug!(org_id = %self.org_id, count = entities.len(), "hierarchy session refreshed");
        self.ledger = ChangeLedger::from_snapshot(&entities, self.org_id);
        self.entities = entities;
        self.commit_in_flight = false;
        Ok(())
    }

    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    pub fn entities(&self) -> &[System] {
        &self.entities
    }

    pub fn is_dirty(&self) -> bool {
        self.ledger.is_dirty()
    }

    pub fn is_commit_in_flight(&self) -> bool {
        self.commit_in_flight
    }

    pub fn pending_changes(&self) -> Vec<PendingChange> {
        self.ledger.iter().cloned().collect()
    }

    /// Rebuilds the forest from the working snapshot. Pending edits are
    /// visible; committed state is not inferred.
    pub fn forest(&self) -> Vec<TreeNode> {
        algorithms::build_forest(&self.entities, self.org_id)
    }

    pub fn stats(&self) -> HierarchyStats {
        algorithms::compute_stats(&self.entities, self.org_id)
    }

    pub fn validate_move(
        &self,
        system_id: SystemId,
        new_parent_id: Option<SystemId>,
    ) -> MoveValidation {
        invariants::validate_move(system_id, new_parent_id, &self.entities)
    }

    pub fn possible_parents(&self, system_id: SystemId) -> Vec<System> {
        invariants::possible_parents(system_id, &self.entities)
    }

    /// Applies a parent edit to the working snapshot through the ledger.
    /// Validate-before-apply: a rejected move mutates nothing.
    pub fn edit_parent(
        &mut self,
        system_id: SystemId,
        new_parent_id: Option<SystemId>,
    ) -> Result<()> {
        if self.commit_in_flight {
            return Err(LibError::commit_in_flight());
        }
        invariants::ensure_move_valid(system_id, new_parent_id, &self.entities)?;

        let system = self
            .entities
            .iter()
            .find(|system| system.id == system_id)
            .cloned()
            .ok_or_else(|| {
                LibError::not_found(
                    "System does not exist",
                    anyhow!("no entity with id {system_id}"),
                )
            })?;
        self.ledger.edit(&system, new_parent_id);

        for entity in self.entities.iter_mut() {
            if entity.id == system_id {
                entity.parent_id = new_parent_id;
            }
        }
        Ok(())
    }

    /// Feeds a drag controller outcome into the ledger. Returns whether a
    /// move was recorded; a rejected drop surfaces the violation as an error
    /// and records nothing.
    pub fn apply_drop(&mut self, outcome: DropOutcome) -> Result<bool> {
        match outcome {
            DropOutcome::Ignored => Ok(false),
            DropOutcome::Rejected(violation) => Err(violation.into()),
            DropOutcome::Move(change) => {
                self.edit_parent(change.system_id, change.new_parent_id)?;
                Ok(true)
            }
        }
    }

    /// Restores every edited entity to its committed parent and empties the
    /// ledger.
    pub fn revert(&mut self) {
        self.ledger.revert(&mut self.entities);
    }

    /// Submits the ledger's change batch as a single all-or-nothing request.
    ///
    /// The request runs on a detached task: abandoning this future (surface
    /// teardown) never aborts a request that already went out. On success the
    /// ledger is cleared and the snapshot re-fetched from the source of
    /// truth. On failure the ledger is kept intact, so nothing is lost and
    /// retry is possible.
    pub async fn commit(&mut self) -> Result<CommitOutcome> {
        if self.commit_in_flight {
            return Err(LibError::commit_in_flight());
        }
        if !self.ledger.is_dirty() {
            return Ok(CommitOutcome::Clean);
        }

        let changes = self.ledger.changes();
        let applied = changes.len();
        self.commit_in_flight = true;

        let store = self.store.clone();
        let handle =
            tokio::spawn(async move { store.commit_hierarchy_changes(changes).await });

        let result = match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(LibError::commit(
                "Commit task failed",
                anyhow!(join_error),
            )),
        };
        self.commit_in_flight = false;

        match result {
            Ok(()) => {
                tracing::info!(org_id = %self.org_id, applied, "hierarchy commit applied");
                self.ledger.clear();
                self.refresh().await?;
                Ok(CommitOutcome::Committed { applied })
            }
            Err(error) => {
                tracing::warn!(org_id = %self.org_id, error = %error.source, "hierarchy commit failed; ledger kept");
                Err(error)
            }
        }
    }

    pub async fn execute(
        &mut self,
        operation: HierarchyOperation,
    ) -> Result<HierarchyOperationResult> {
        match operation {
            HierarchyOperation::Refresh => {
                self.refresh().await?;
                Ok(HierarchyOperationResult::Refreshed)
            }
            HierarchyOperation::Forest => Ok(HierarchyOperationResult::Forest {
                roots: self.forest(),
            }),
            HierarchyOperation::Stats => Ok(HierarchyOperationResult::Stats {
                stats: self.stats(),
            }),
            HierarchyOperation::ValidateMove {
                system_id,
                new_parent_id,
            } => Ok(HierarchyOperationResult::Validation {
                validation: self.validate_move(system_id, new_parent_id),
            }),
            HierarchyOperation::PossibleParents { system_id } => {
                Ok(HierarchyOperationResult::Candidates {
                    systems: self.possible_parents(system_id),
                })
            }
            HierarchyOperation::EditParent {
                system_id,
                new_parent_id,
            } => {
                self.edit_parent(system_id, new_parent_id)?;
                Ok(HierarchyOperationResult::Pending {
                    changes: self.pending_changes(),
                    dirty: self.is_dirty(),
                })
            }
            HierarchyOperation::PendingChanges => Ok(HierarchyOperationResult::Pending {
                changes: self.pending_changes(),
                dirty: self.is_dirty(),
            }),
            HierarchyOperation::Revert => {
                self.revert();
                Ok(HierarchyOperationResult::Reverted)
            }
            HierarchyOperation::Commit => {
                let outcome = self.commit().await?;
                Ok(HierarchyOperationResult::Committed { outcome })
            }
        }
    }
}
