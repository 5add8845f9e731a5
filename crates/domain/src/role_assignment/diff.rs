use std::collections::HashSet;
use std::hash::Hash;

use super::{OrganizationRoleAssignment, RoleAssignments, ScopedCategory, ScopedRoleAssignment};

/// Returns the items of `kept` whose key does not occur in `subtracted`.
///
/// Items keep their order from `kept`. Repeated items in `kept` are all
/// returned when their key is missing from `subtracted`.
pub fn subtract_by_key<T, K, F>(kept: &[T], subtracted: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let present: HashSet<K> = subtracted.iter().map(&key).collect();

    kept.iter()
        .filter(|&item| !present.contains(&key(item)))
        .cloned()
        .collect()
}

/// Assignments to grant and to revoke to move a member between two states.
///
/// Identity is decided by [`super::AssignmentKey`], so this is a key presence
/// diff: an assignment present on both sides is left alone even when its
/// application roles differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignmentDiff {
    /// Assignments present in the desired state only.
    pub to_add: RoleAssignments,
    /// Assignments present in the current state only.
    pub to_remove: RoleAssignments,
}

impl RoleAssignmentDiff {
    /// Computes the deltas from `current` to `desired`.
    #[must_use]
    pub fn compute(current: &RoleAssignments, desired: &RoleAssignments) -> Self {
        Self {
            to_add: subtract_assignments(desired, current),
            to_remove: subtract_assignments(current, desired),
        }
    }

    /// Returns whether nothing has to be granted or revoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

fn subtract_assignments(kept: &RoleAssignments, subtracted: &RoleAssignments) -> RoleAssignments {
    let mut remaining = RoleAssignments {
        organization: subtract_by_key(
            &kept.organization,
            &subtracted.organization,
            OrganizationRoleAssignment::key,
        ),
        ..RoleAssignments::default()
    };

    for category in ScopedCategory::all() {
        *remaining.scoped_mut(*category) = subtract_by_key(
            kept.scoped(*category),
            subtracted.scoped(*category),
            ScopedRoleAssignment::key,
        );
    }

    remaining
}
