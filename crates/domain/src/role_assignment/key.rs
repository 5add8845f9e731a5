use super::{OrganizationRoleAssignment, RoleId, ScopedRoleAssignment};

/// Logical identity of a role assignment within its category.
///
/// Assignments with equal keys are the same grant regardless of list order.
/// Application roles are not part of the key: two assignments that only differ
/// in application roles compare equal, so such a change never shows up in a
/// diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentKey {
    role_id: RoleId,
    all: bool,
    scope_ids: Vec<String>,
}

impl AssignmentKey {
    /// Builds a key identified by the role alone.
    #[must_use]
    pub fn role_only(role_id: &RoleId) -> Self {
        Self {
            role_id: role_id.clone(),
            all: false,
            scope_ids: Vec::new(),
        }
    }

    /// Builds a key for a scoped grant.
    ///
    /// Scope ids are a set: they are sorted and deduplicated here.
    #[must_use]
    pub fn scoped(role_id: &RoleId, all: bool, scope_ids: &[String]) -> Self {
        let mut scope_ids = scope_ids.to_vec();
        scope_ids.sort_unstable();
        scope_ids.dedup();

        Self {
            role_id: role_id.clone(),
            all,
            scope_ids,
        }
    }

    /// Returns the normalized scope ids.
    #[must_use]
    pub fn scope_ids(&self) -> &[String] {
        self.scope_ids.as_slice()
    }
}

impl OrganizationRoleAssignment {
    /// Returns the identity of this assignment.
    #[must_use]
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::role_only(self.role_id())
    }
}

impl ScopedRoleAssignment {
    /// Returns the identity of this assignment.
    #[must_use]
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::scoped(self.role_id(), self.all(), self.scope_ids())
    }
}
