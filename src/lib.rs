pub mod algorithms;
pub mod error;
pub mod invariants;
pub mod ledger;
pub mod models;
pub mod operations;
pub mod reorg;
pub mod store;

pub mod prelude {
    pub use crate::algorithms::{build_forest, child_index, compute_stats, level_stats, max_depth};
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::invariants::{
        descendant_ids, ensure_move_valid, move_violation, possible_parents, validate_move,
    };
    pub use crate::ledger::ChangeLedger;
    pub use crate::models::{
        HierarchyChange, HierarchyStats, LevelStat, MoveValidation, MoveViolation, OrgId,
        PendingChange, System, SystemFamily, SystemId, SystemKind, SystemState, TagDescriptor,
        TreeNode,
    };
    pub use crate::operations::{
        CommitOutcome, HierarchyOperation, HierarchyOperationResult, HierarchySession,
    };
    pub use crate::reorg::{DragController, DragState, DropOutcome, DropPosition};
    pub use crate::store::{HierarchyStore, InMemoryStore};
}
