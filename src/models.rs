use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct SystemId(pub Uuid);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SystemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for SystemId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct OrgId(pub Uuid);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for OrgId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Static presentation descriptor for a tag enum variant. The `descriptor`
/// tables below are exhaustive matches, so adding a variant without a
/// descriptor fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDescriptor {
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemFamily {
    #[default]
    Application,
    Service,
    DataStore,
    Integration,
    Infrastructure,
}

impl SystemFamily {
    pub const fn as_tag(self) -> &'static str {
        match self {
            SystemFamily::Application => "application",
            SystemFamily::Service => "service",
            SystemFamily::DataStore => "datastore",
            SystemFamily::Integration => "integration",
            SystemFamily::Infrastructure => "infrastructure",
        }
    }

    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "application" => Some(SystemFamily::Application),
            "service" => Some(SystemFamily::Service),
            "datastore" => Some(SystemFamily::DataStore),
            "integration" => Some(SystemFamily::Integration),
            "infrastructure" => Some(SystemFamily::Infrastructure),
            _ => None,
        }
    }

    pub const fn descriptor(self) -> TagDescriptor {
        match self {
            SystemFamily::Application => TagDescriptor {
                label: "Application",
                icon: "window",
                color: "#2563eb",
            },
            SystemFamily::Service => TagDescriptor {
                label: "Service",
                icon: "gear",
                color: "#7c3aed",
            },
            SystemFamily::DataStore => TagDescriptor {
                label: "Data store",
                icon: "database",
                color: "#059669",
            },
            SystemFamily::Integration => TagDescriptor {
                label: "Integration",
                icon: "plug",
                color: "#d97706",
            },
            SystemFamily::Infrastructure => TagDescriptor {
                label: "Infrastructure",
                icon: "server",
                color: "#64748b",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    #[default]
    Internal,
    External,
    Hybrid,
}

impl SystemKind {
    pub const fn as_tag(self) -> &'static str {
        match self {
            SystemKind::Internal => "internal",
            SystemKind::External => "external",
            SystemKind::Hybrid => "hybrid",
        }
    }

    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "internal" => Some(SystemKind::Internal),
            "external" => Some(SystemKind::External),
            "hybrid" => Some(SystemKind::Hybrid),
            _ => None,
        }
    }

    pub const fn descriptor(self) -> TagDescriptor {
        match self {
            SystemKind::Internal => TagDescriptor {
                label: "Internal",
                icon: "home",
                color: "#0ea5e9",
            },
            SystemKind::External => TagDescriptor {
                label: "External",
                icon: "globe",
                color: "#f43f5e",
            },
            SystemKind::Hybrid => TagDescriptor {
                label: "Hybrid",
                icon: "shuffle",
                color: "#a855f7",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemState {
    #[default]
    Active,
    Inactive,
}

impl SystemState {
    pub const fn as_tag(self) -> &'static str {
        match self {
            SystemState::Active => "active",
            SystemState::Inactive => "inactive",
        }
    }

    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SystemState::Active),
            "inactive" => Some(SystemState::Inactive),
            _ => None,
        }
    }

    pub const fn is_active(self) -> bool {
        matches!(self, SystemState::Active)
    }
}

/// A catalog entity as served by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub id: SystemId,
    pub org_id: OrgId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SystemId>,
    pub name: String,
    pub code: String,
    pub family: SystemFamily,
    pub kind: SystemKind,
    pub state: SystemState,
    pub deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl System {
    /// True for entities that participate in a tenant's hierarchy.
    pub fn in_tenant(&self, org_id: OrgId) -> bool {
        self.org_id == org_id && !self.deleted
    }
}

/// One node of a built forest. Children are owned, so a constructed forest
/// can never contain a reference cycle; cycle accounting happens against the
/// flat snapshot instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(flatten)]
    pub system: System,
    pub level: u32,
    pub expanded: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(system: System, level: u32) -> Self {
        Self {
            system,
            level,
            expanded: false,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> SystemId {
        self.system.id
    }
}

/// An uncommitted, revertible parent reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub system_id: SystemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_parent_id: Option<SystemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_parent_id: Option<SystemId>,
    pub label: String,
}

/// Wire payload for the collaborator's batch commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyChange {
    pub system_id: SystemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_parent_id: Option<SystemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStat {
    pub level: u32,
    pub count: usize,
    pub active_count: usize,
    pub inactive_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStats {
    pub total: usize,
    pub per_level: Vec<LevelStat>,
    pub max_depth: u32,
    pub circular_dependencies: usize,
    pub circular_system_ids: Vec<SystemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveViolation {
    SelfReference {
        system_id: SystemId,
    },
    SystemNotFound {
        system_id: SystemId,
    },
    ParentNotFound {
        parent_id: SystemId,
    },
    CrossTenant {
        parent_id: SystemId,
    },
    Circular {
        system_id: SystemId,
        parent_id: SystemId,
    },
}

impl MoveViolation {
    pub const fn error_code(&self) -> &'static str {
        match self {
            MoveViolation::SelfReference { .. } => "hierarchy_self_reference",
            MoveViolation::SystemNotFound { .. } => "hierarchy_system_not_found",
            MoveViolation::ParentNotFound { .. } => "hierarchy_parent_not_found",
            MoveViolation::CrossTenant { .. } => "hierarchy_cross_tenant",
            MoveViolation::Circular { .. } => "hierarchy_circular_dependency",
        }
    }

    pub const fn public_message(&self) -> &'static str {
        match self {
            MoveViolation::SelfReference { .. } => "A system cannot be its own parent",
            MoveViolation::SystemNotFound { .. } => "System does not exist",
            MoveViolation::ParentNotFound { .. } => "Target parent does not exist",
            MoveViolation::CrossTenant { .. } => {
                "Target parent belongs to a different organization"
            }
            MoveViolation::Circular { .. } => "Move would create a cycle in the hierarchy",
        }
    }
}

/// Outcome of checking a proposed parent reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<MoveViolation>,
}

impl MoveValidation {
    pub const fn ok() -> Self {
        Self {
            valid: true,
            violation: None,
        }
    }

    pub const fn rejected(violation: MoveViolation) -> Self {
        Self {
            valid: false,
            violation: Some(violation),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;

    fn sample_system() -> System {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid datetime");
        System {
            id: SystemId(Uuid::new_v4()),
            org_id: OrgId(Uuid::new_v4()),
            parent_id: None,
            name: "Billing".to_string(),
            code: "BIL".to_string(),
            family: SystemFamily::Application,
            kind: SystemKind::Internal,
            state: SystemState::Active,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tag_round_trips() {
        for family in [
            SystemFamily::Application,
            SystemFamily::Service,
            SystemFamily::DataStore,
            SystemFamily::Integration,
            SystemFamily::Infrastructure,
        ] {
            assert_eq!(SystemFamily::from_tag(family.as_tag()), Some(family));
        }
        for kind in [SystemKind::Internal, SystemKind::External, SystemKind::Hybrid] {
            assert_eq!(SystemKind::from_tag(kind.as_tag()), Some(kind));
        }
        for state in [SystemState::Active, SystemState::Inactive] {
            assert_eq!(SystemState::from_tag(state.as_tag()), Some(state));
        }
        assert_eq!(SystemFamily::from_tag("mainframe"), None);
    }

    #[test]
    fn descriptors_carry_presentation_data() {
        let descriptor = SystemFamily::DataStore.descriptor();
        assert_eq!(descriptor.label, "Data store");
        assert!(!descriptor.icon.is_empty());
        assert!(descriptor.color.starts_with('#'));
    }

    #[test]
    fn in_tenant_excludes_deleted_and_foreign() {
        let system = sample_system();
        assert!(system.in_tenant(system.org_id));
        assert!(!system.in_tenant(OrgId(Uuid::new_v4())));

        let mut deleted = sample_system();
        deleted.deleted = true;
        assert!(!deleted.in_tenant(deleted.org_id));
    }

    #[test]
    fn system_serializes_camel_case() {
        let system = sample_system();
        let value = serde_json::to_value(&system).expect("system should serialize");
        assert!(value.get("orgId").is_some());
        assert!(value.get("createdAt").is_some());
        // Root systems omit the parent pointer entirely.
        assert!(value.get("parentId").is_none());
    }

    #[test]
    fn violation_codes_are_stable() {
        let id = SystemId(Uuid::new_v4());
        let violation = MoveViolation::SelfReference { system_id: id };
        assert_eq!(violation.error_code(), "hierarchy_self_reference");
        assert_eq!(
            MoveViolation::Circular {
                system_id: id,
                parent_id: id,
            }
            .error_code(),
            "hierarchy_circular_dependency"
        );
    }
}
