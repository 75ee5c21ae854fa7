use std::collections::{HashMap, HashSet};

use crate::models::{HierarchyStats, LevelStat, OrgId, System, SystemId, TreeNode};

/// Builds the `parent_id -> children` index for one tenant in a single pass.
/// Children are ordered by name, then id, so forest construction is
/// deterministic. Edges pointing at entities outside the filtered set are
/// dropped here; their children are promoted to roots by `build_forest`.
pub fn child_index(entities: &[System], org_id: OrgId) -> HashMap<SystemId, Vec<SystemId>> {
    let lookup = tenant_lookup(entities, org_id);
    let mut index: HashMap<SystemId, Vec<SystemId>> = HashMap::with_capacity(lookup.len());
    for system in lookup.values() {
        if let Some(parent_id) = system.parent_id {
            if lookup.contains_key(&parent_id) {
                index.entry(parent_id).or_default().push(system.id);
            }
        }
    }
    for children in index.values_mut() {
        sort_siblings(children, &lookup);
    }
    index
}

/// Assembles the validated forest for one tenant from the flat snapshot.
///
/// Filters to same-tenant, non-deleted entities, then recursively attaches
/// children from the roots downward with `level = parent.level + 1`. Roots
/// are entities with no parent plus entities whose recorded parent is absent
/// from the filtered set — already-persisted orphans must still render.
/// Entities on a parent cycle are unreachable from any root and are left out;
/// `compute_stats` accounts for them. Pure and idempotent, safe to call on
/// every query.
pub fn build_forest(entities: &[System], org_id: OrgId) -> Vec<TreeNode> {
    let lookup = tenant_lookup(entities, org_id);
    let index = child_index(entities, org_id);

    let mut root_ids: Vec<SystemId> = lookup
        .values()
        .filter(|system| match system.parent_id {
            None => true,
            Some(parent_id) => !lookup.contains_key(&parent_id),
        })
        .map(|system| system.id)
        .collect();
    sort_siblings(&mut root_ids, &lookup);

    let mut guard = HashSet::with_capacity(lookup.len());
    root_ids
        .into_iter()
        .filter_map(|root_id| assemble(root_id, 0, &lookup, &index, &mut guard))
        .collect()
}

fn tenant_lookup(entities: &[System], org_id: OrgId) -> HashMap<SystemId, &System> {
    entities
        .iter()
        .filter(|system| system.in_tenant(org_id))
        .map(|system| (system.id, system))
        .collect()
}

fn sort_siblings(ids: &mut [SystemId], lookup: &HashMap<SystemId, &System>) {
    ids.sort_by(|a, b| {
        let name_a = lookup.get(a).map(|system| system.name.as_str()).unwrap_or("");
        let name_b = lookup.get(b).map(|system| system.name.as_str()).unwrap_or("");
        name_a.cmp(name_b).then_with(|| a.cmp(b))
    });
}

fn assemble(
    id: SystemId,
    level: u32,
    lookup: &HashMap<SystemId, &System>,
    index: &HashMap<SystemId, Vec<SystemId>>,
    guard: &mut HashSet<SystemId>,
) -> Option<TreeNode> {
    // Guard against corrupt input; a well-formed snapshot never revisits.
    if !guard.insert(id) {
        return None;
    }
    let system = (*lookup.get(&id)?).clone();
    let mut node = TreeNode::new(system, level);
    if let Some(children) = index.get(&id) {
        for child_id in children {
            if let Some(child) = assemble(*child_id, level + 1, lookup, index, guard) {
                node.children.push(child);
            }
        }
    }
    Some(node)
}

/// Aggregates total/active/inactive counts per level over a built forest.
pub fn level_stats(forest: &[TreeNode]) -> Vec<LevelStat> {
    let mut by_level: HashMap<u32, LevelStat> = HashMap::new();
    let mut stack: Vec<&TreeNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        let stat = by_level.entry(node.level).or_insert(LevelStat {
            level: node.level,
            count: 0,
            active_count: 0,
            inactive_count: 0,
        });
        stat.count += 1;
        if node.system.state.is_active() {
            stat.active_count += 1;
        } else {
            stat.inactive_count += 1;
        }
        stack.extend(node.children.iter());
    }

    let mut stats: Vec<LevelStat> = by_level.into_values().collect();
    stats.sort_by_key(|stat| stat.level);
    stats
}

/// Depth of the deepest tree in the forest; a lone root counts as 1.
pub fn max_depth(forest: &[TreeNode]) -> u32 {
    let mut deepest = None;
    let mut stack: Vec<&TreeNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        deepest = Some(deepest.map_or(node.level, |level: u32| level.max(node.level)));
        stack.extend(node.children.iter());
    }
    deepest.map_or(0, |level| level + 1)
}

/// Derives the aggregate hierarchy report for one tenant.
///
/// Entities whose ancestor chain never reaches a root sit on (or below) a
/// parent cycle in already-persisted data. They are counted and reported
/// rather than raised, because the caller must still render the rest of the
/// catalog.
pub fn compute_stats(entities: &[System], org_id: OrgId) -> HierarchyStats {
    let forest = build_forest(entities, org_id);
    let per_level = level_stats(&forest);
    let depth = max_depth(&forest);

    let mut reachable = HashSet::new();
    let mut stack: Vec<&TreeNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        reachable.insert(node.id());
        stack.extend(node.children.iter());
    }

    let mut circular_system_ids: Vec<SystemId> = entities
        .iter()
        .filter(|system| system.in_tenant(org_id) && !reachable.contains(&system.id))
        .map(|system| system.id)
        .collect();
    circular_system_ids.sort();

    HierarchyStats {
        total: entities.iter().filter(|system| system.in_tenant(org_id)).count(),
        per_level,
        max_depth: depth,
        circular_dependencies: circular_system_ids.len(),
        circular_system_ids,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::{SystemFamily, SystemKind, SystemState};

    fn org() -> OrgId {
        OrgId(Uuid::from_u128(1))
    }

    fn system(id: u128, name: &str, parent: Option<u128>) -> System {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid datetime");
        System {
            id: SystemId(Uuid::from_u128(id)),
            org_id: org(),
            parent_id: parent.map(|p| SystemId(Uuid::from_u128(p))),
            name: name.to_string(),
            code: name.to_uppercase(),
            family: SystemFamily::Application,
            kind: SystemKind::Internal,
            state: SystemState::Active,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn find<'a>(forest: &'a [TreeNode], name: &str) -> Option<&'a TreeNode> {
        let mut stack: Vec<&TreeNode> = forest.iter().collect();
        while let Some(node) = stack.pop() {
            if node.system.name == name {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    #[test]
    fn levels_increase_by_one_from_root() {
        let entities = vec![
            system(1, "core", None),
            system(2, "billing", Some(1)),
            system(3, "invoicing", Some(2)),
            system(4, "ledger", Some(2)),
        ];
        let forest = build_forest(&entities, org());
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].level, 0);

        let billing = find(&forest, "billing").expect("billing should be in the forest");
        assert_eq!(billing.level, 1);
        for child in &billing.children {
            assert_eq!(child.level, billing.level + 1);
        }
    }

    #[test]
    fn siblings_are_ordered_by_name() {
        let entities = vec![
            system(1, "core", None),
            system(2, "zeta", Some(1)),
            system(3, "alpha", Some(1)),
            system(4, "mid", Some(1)),
        ];
        let forest = build_forest(&entities, org());
        let names: Vec<&str> = forest[0]
            .children
            .iter()
            .map(|child| child.system.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn filters_foreign_and_deleted_entities() {
        let mut foreign = system(5, "foreign", None);
        foreign.org_id = OrgId(Uuid::from_u128(99));
        let mut gone = system(6, "gone", None);
        gone.deleted = true;

        let entities = vec![system(1, "core", None), foreign, gone];
        let forest = build_forest(&entities, org());
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].system.name, "core");
    }

    #[test]
    fn orphans_are_promoted_to_roots() {
        // Parent 9 was deleted server-side but the child row still points at it.
        let entities = vec![system(1, "core", None), system(2, "orphan", Some(9))];
        let forest = build_forest(&entities, org());
        assert_eq!(forest.len(), 2);
        let orphan = find(&forest, "orphan").expect("orphan should render");
        assert_eq!(orphan.level, 0);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let entities = vec![
            system(1, "core", None),
            system(2, "billing", Some(1)),
            system(3, "invoicing", Some(2)),
        ];
        assert_eq!(build_forest(&entities, org()), build_forest(&entities, org()));
    }

    #[test]
    fn cycle_members_are_excluded_and_counted() {
        let entities = vec![
            system(1, "core", None),
            system(2, "loop-a", Some(3)),
            system(3, "loop-b", Some(2)),
        ];
        let forest = build_forest(&entities, org());
        assert_eq!(forest.len(), 1);
        assert!(find(&forest, "loop-a").is_none());

        let stats = compute_stats(&entities, org());
        assert_eq!(stats.total, 3);
        assert!(stats.circular_dependencies >= 1);
        assert_eq!(stats.circular_dependencies, 2);
        assert!(stats.circular_system_ids.contains(&SystemId(Uuid::from_u128(2))));
        assert!(stats.circular_system_ids.contains(&SystemId(Uuid::from_u128(3))));
    }

    #[test]
    fn self_parent_is_reported_as_circular() {
        let entities = vec![system(1, "core", None), system(2, "selfie", Some(2))];
        let stats = compute_stats(&entities, org());
        assert_eq!(stats.circular_dependencies, 1);
        assert_eq!(stats.circular_system_ids, vec![SystemId(Uuid::from_u128(2))]);
    }

    #[test]
    fn level_stats_split_by_state() {
        let mut idle = system(3, "idle", Some(1));
        idle.state = SystemState::Inactive;
        let entities = vec![system(1, "core", None), system(2, "billing", Some(1)), idle];

        let stats = compute_stats(&entities, org());
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.per_level.len(), 2);
        assert_eq!(stats.per_level[0].level, 0);
        assert_eq!(stats.per_level[0].count, 1);
        assert_eq!(stats.per_level[1].count, 2);
        assert_eq!(stats.per_level[1].active_count, 1);
        assert_eq!(stats.per_level[1].inactive_count, 1);
    }

    #[test]
    fn empty_tenant_yields_empty_report() {
        let stats = compute_stats(&[], org());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.max_depth, 0);
        assert!(stats.per_level.is_empty());
        assert_eq!(stats.circular_dependencies, 0);
    }
}
