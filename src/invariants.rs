use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::Result;
use crate::models::{MoveValidation, MoveViolation, System, SystemId};

/// Checks a proposed parent reassignment against the hierarchy invariants,
/// in order: self-reference, entity existence, target existence and tenancy,
/// then the ancestor walk. `None` means the move is legal. A `None` proposed
/// parent (promotion to root) is always legal for an existing entity.
pub fn move_violation(
    system_id: SystemId,
    proposed_parent_id: Option<SystemId>,
    entities: &[System],
) -> Option<MoveViolation> {
    if proposed_parent_id == Some(system_id) {
        return Some(MoveViolation::SelfReference { system_id });
    }

    let lookup = live_lookup(entities);
    let Some(system) = lookup.get(&system_id) else {
        return Some(MoveViolation::SystemNotFound { system_id });
    };
    let Some(parent_id) = proposed_parent_id else {
        return None;
    };
    let Some(parent) = lookup.get(&parent_id) else {
        return Some(MoveViolation::ParentNotFound { parent_id });
    };
    if parent.org_id != system.org_id {
        return Some(MoveViolation::CrossTenant { parent_id });
    }

    // Walk the ancestor chain upward from the proposed parent. The visited
    // set bounds the walk on already-corrupt chains; a pre-existing loop that
    // does not involve `system_id` is the stats calculator's problem, not a
    // reason to reject this move.
    let mut visited = HashSet::with_capacity(lookup.len());
    let mut cursor = Some(parent_id);
    while let Some(current) = cursor {
        if current == system_id {
            return Some(MoveViolation::Circular {
                system_id,
                parent_id,
            });
        }
        if !visited.insert(current) {
            break;
        }
        cursor = lookup.get(&current).and_then(|ancestor| ancestor.parent_id);
    }

    None
}

/// UI-facing wrapper around [`move_violation`].
pub fn validate_move(
    system_id: SystemId,
    proposed_parent_id: Option<SystemId>,
    entities: &[System],
) -> MoveValidation {
    match move_violation(system_id, proposed_parent_id, entities) {
        None => MoveValidation::ok(),
        Some(violation) => MoveValidation::rejected(violation),
    }
}

/// Validate-before-apply guard: converts a violation into a library error
/// carrying the violation's stable code and public message.
pub fn ensure_move_valid(
    system_id: SystemId,
    proposed_parent_id: Option<SystemId>,
    entities: &[System],
) -> Result<()> {
    match move_violation(system_id, proposed_parent_id, entities) {
        None => Ok(()),
        Some(violation) => Err(violation.into()),
    }
}

/// Every entity in `system_id`'s subtree, the entity itself excluded.
/// BFS over the downward child edges of the entity's own tenant.
pub fn descendant_ids(system_id: SystemId, entities: &[System]) -> HashSet<SystemId> {
    let lookup = live_lookup(entities);
    let Some(system) = lookup.get(&system_id) else {
        return HashSet::new();
    };

    let mut children: HashMap<SystemId, Vec<SystemId>> = HashMap::new();
    for candidate in lookup.values() {
        if candidate.org_id != system.org_id {
            continue;
        }
        if let Some(parent_id) = candidate.parent_id {
            children.entry(parent_id).or_default().push(candidate.id);
        }
    }

    let mut descendants = HashSet::new();
    let mut queue = VecDeque::from([system_id]);
    while let Some(current) = queue.pop_front() {
        if let Some(kids) = children.get(&current) {
            for kid in kids {
                if descendants.insert(*kid) {
                    queue.push_back(*kid);
                }
            }
        }
    }
    descendants
}

/// All legal reparenting targets for `system_id`: active, same-tenant,
/// non-deleted entities excluding the entity itself and its entire subtree.
/// Callers offering these never present an invalid target. Ordered by name
/// for stable pickers.
pub fn possible_parents(system_id: SystemId, entities: &[System]) -> Vec<System> {
    let lookup = live_lookup(entities);
    let Some(system) = lookup.get(&system_id) else {
        return Vec::new();
    };
    let org_id = system.org_id;
    let excluded = descendant_ids(system_id, entities);

    let mut candidates: Vec<System> = lookup
        .values()
        .filter(|candidate| {
            candidate.org_id == org_id
                && candidate.state.is_active()
                && candidate.id != system_id
                && !excluded.contains(&candidate.id)
        })
        .map(|candidate| (*candidate).clone())
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    candidates
}

fn live_lookup(entities: &[System]) -> HashMap<SystemId, &System> {
    entities
        .iter()
        .filter(|system| !system.deleted)
        .map(|system| (system.id, system))
        .collect()
}
