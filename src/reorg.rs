use serde::{Deserialize, Serialize};

use crate::invariants;
use crate::models::{HierarchyChange, MoveValidation, MoveViolation, System, SystemId};

/// Where the pointer sits inside the hovered row's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Above,
    Below,
    Inside,
}

impl DropPosition {
    /// Top quartile drops above, bottom quartile below, the middle half
    /// nests inside. Degenerate bounds resolve to `Inside`.
    pub fn from_pointer(offset_y: f64, height: f64) -> Self {
        if height <= 0.0 {
            return DropPosition::Inside;
        }
        let ratio = (offset_y / height).clamp(0.0, 1.0);
        if ratio < 0.25 {
            DropPosition::Above
        } else if ratio > 0.75 {
            DropPosition::Below
        } else {
            DropPosition::Inside
        }
    }
}

/// The parent a drop at `position` on `target` would propose: dropping above
/// or below reorders among the target's siblings, dropping inside nests
/// under the target itself.
pub fn candidate_parent(
    target_id: SystemId,
    position: DropPosition,
    entities: &[System],
) -> Option<SystemId> {
    match position {
        DropPosition::Inside => Some(target_id),
        DropPosition::Above | DropPosition::Below => entities
            .iter()
            .find(|system| system.id == target_id && !system.deleted)
            .and_then(|system| system.parent_id),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: SystemId,
    },
    Hovering {
        source: SystemId,
        target: SystemId,
        position: DropPosition,
        validation: MoveValidation,
    },
}

/// What a completed gesture asks the caller to do. A `Move` is handed to the
/// pending-change ledger (or an async reorg callback); the controller itself
/// never mutates the snapshot and never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Pointer released with no hover target; nothing to do.
    Ignored,
    /// The hovered proposal was invalid; reject visually, mutate nothing.
    Rejected(MoveViolation),
    /// The hovered proposal was valid.
    Move(HierarchyChange),
}

/// Translates pointer gestures into validated move proposals. All transitions
/// are synchronous updates on an explicit state value; there is no ambient
/// mutable state and every drop path ends back at `Idle`.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Pointer went down on a row. Restarting while a gesture is live simply
    /// begins a new gesture.
    pub fn begin_drag(&mut self, source: SystemId) {
        self.state = DragState::Dragging { source };
    }

    /// Pointer moved over `target`. Revalidates on every target or position
    /// change so the UI can paint the drop indicator immediately.
    pub fn hover(
        &mut self,
        target: SystemId,
        offset_y: f64,
        height: f64,
        entities: &[System],
    ) -> Option<MoveValidation> {
        let source = match self.state {
            DragState::Idle => return None,
            DragState::Dragging { source } | DragState::Hovering { source, .. } => source,
        };

        let position = DropPosition::from_pointer(offset_y, height);
        if let DragState::Hovering {
            target: prev_target,
            position: prev_position,
            validation,
            ..
        } = self.state
        {
            if prev_target == target && prev_position == position {
                return Some(validation);
            }
        }

        let proposed_parent = candidate_parent(target, position, entities);
        let validation = invariants::validate_move(source, proposed_parent, entities);
        self.state = DragState::Hovering {
            source,
            target,
            position,
            validation,
        };
        Some(validation)
    }

    /// Pointer left the hovered row but the gesture is still live.
    pub fn leave_target(&mut self) {
        if let DragState::Hovering { source, .. } = self.state {
            self.state = DragState::Dragging { source };
        }
    }

    /// Pointer released. Returns to `Idle` unconditionally; the outcome tells
    /// the caller whether a move proposal survived validation.
    pub fn drop(&mut self, entities: &[System]) -> DropOutcome {
        let state = std::mem::take(&mut self.state);
        match state {
            DragState::Idle | DragState::Dragging { .. } => DropOutcome::Ignored,
            DragState::Hovering {
                source,
                target,
                position,
                validation,
            } => match validation.violation {
                Some(violation) => DropOutcome::Rejected(violation),
                None => {
                    let new_parent_id = candidate_parent(target, position, entities);
                    DropOutcome::Move(HierarchyChange {
                        system_id: source,
                        new_parent_id,
                    })
                }
            },
        }
    }

    /// Gesture aborted (Escape, pointer released outside every target).
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::{OrgId, SystemFamily, SystemKind, SystemState};

    fn system(id: u128, name: &str, parent: Option<u128>) -> System {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid datetime");
        System {
            id: SystemId(Uuid::from_u128(id)),
            org_id: OrgId(Uuid::from_u128(1)),
            parent_id: parent.map(|p| SystemId(Uuid::from_u128(p))),
            name: name.to_string(),
            code: name.to_uppercase(),
            family: SystemFamily::Service,
            kind: SystemKind::Internal,
            state: SystemState::Active,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn sid(id: u128) -> SystemId {
        SystemId(Uuid::from_u128(id))
    }

    /// A(root) <- B <- C, plus D(root).
    fn entities() -> Vec<System> {
        vec![
            system(1, "A", None),
            system(2, "B", Some(1)),
            system(3, "C", Some(2)),
            system(4, "D", None),
        ]
    }

    #[test]
    fn pointer_quartiles_map_to_positions() {
        assert_eq!(DropPosition::from_pointer(2.0, 40.0), DropPosition::Above);
        assert_eq!(DropPosition::from_pointer(20.0, 40.0), DropPosition::Inside);
        assert_eq!(DropPosition::from_pointer(39.0, 40.0), DropPosition::Below);
        assert_eq!(DropPosition::from_pointer(5.0, 0.0), DropPosition::Inside);
    }

    #[test]
    fn above_and_below_propose_the_targets_parent() {
        let entities = entities();
        assert_eq!(
            candidate_parent(sid(3), DropPosition::Above, &entities),
            Some(sid(2))
        );
        assert_eq!(
            candidate_parent(sid(3), DropPosition::Inside, &entities),
            Some(sid(3))
        );
        // Reordering next to a root proposes promotion to root.
        assert_eq!(candidate_parent(sid(1), DropPosition::Below, &entities), None);
    }

    #[test]
    fn hover_validates_on_each_target_change() {
        let entities = entities();
        let mut controller = DragController::new();
        controller.begin_drag(sid(4));

        let validation = controller
            .hover(sid(2), 20.0, 40.0, &entities)
            .expect("hover during a gesture should validate");
        assert!(validation.valid);

        // Hovering the dragged row itself flips to invalid.
        let validation = controller
            .hover(sid(4), 20.0, 40.0, &entities)
            .expect("hover during a gesture should validate");
        assert!(matches!(
            validation.violation,
            Some(MoveViolation::SelfReference { .. })
        ));
    }

    #[test]
    fn hover_without_gesture_is_inert() {
        let entities = entities();
        let mut controller = DragController::new();
        assert!(controller.hover(sid(1), 10.0, 40.0, &entities).is_none());
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn dropping_on_descendant_is_rejected_and_resets() {
        let entities = entities();
        let mut controller = DragController::new();
        controller.begin_drag(sid(2));
        controller.hover(sid(3), 20.0, 40.0, &entities);

        let outcome = controller.drop(&entities);
        assert!(matches!(
            outcome,
            DropOutcome::Rejected(MoveViolation::Circular { .. })
        ));
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn valid_drop_yields_a_move_proposal() {
        let entities = entities();
        let mut controller = DragController::new();
        controller.begin_drag(sid(3));
        controller.hover(sid(4), 20.0, 40.0, &entities);

        let outcome = controller.drop(&entities);
        assert_eq!(
            outcome,
            DropOutcome::Move(HierarchyChange {
                system_id: sid(3),
                new_parent_id: Some(sid(4)),
            })
        );
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn sibling_drop_near_a_root_promotes_to_root() {
        let entities = entities();
        let mut controller = DragController::new();
        controller.begin_drag(sid(3));
        controller.hover(sid(1), 1.0, 40.0, &entities);

        let outcome = controller.drop(&entities);
        assert_eq!(
            outcome,
            DropOutcome::Move(HierarchyChange {
                system_id: sid(3),
                new_parent_id: None,
            })
        );
    }

    #[test]
    fn release_outside_targets_is_clean() {
        let entities = entities();
        let mut controller = DragController::new();
        controller.begin_drag(sid(2));
        controller.leave_target();
        assert_eq!(controller.drop(&entities), DropOutcome::Ignored);
        assert_eq!(controller.state(), DragState::Idle);

        controller.begin_drag(sid(2));
        controller.cancel();
        assert_eq!(controller.state(), DragState::Idle);
    }
}
