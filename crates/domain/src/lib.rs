//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod member;
mod project;
mod role_assignment;

pub use member::EmailAddress;
pub use project::ProjectKind;
pub use role_assignment::{
    AssignmentKey, DeploymentRoleAssignment, OrganizationRoleAssignment, ProjectRoleAssignment,
    RoleAssignmentDiff, RoleAssignments, RoleId, ScopedCategory, ScopedRoleAssignment,
    subtract_by_key,
};
