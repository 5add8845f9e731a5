//! Role assignments held by an organization member.
//!
//! Assignments are grouped in five independent categories: organization-wide
//! roles, deployment roles and one list per serverless project kind.
//! Deployment and project assignments share the [`ScopedRoleAssignment`]
//! shape: a role granted either on every resource of the kind (`all`) or on an
//! explicit set of resource ids, optionally carrying application roles that
//! are passed through to the resources untouched.

mod diff;
mod key;


use std::fmt::{Display, Formatter};

use orgsync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::ProjectKind;

pub use diff::{RoleAssignmentDiff, subtract_by_key};
pub use key::AssignmentKey;

/// Identifier of a role granted by an assignment.
///
/// Every assignment carries one. Construction and deserialization both reject
/// empty values with [`AppError::InvalidAssignment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleId(String);

impl RoleId {
    /// Creates a validated role identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::InvalidAssignment(
                "role_id must not be empty".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RoleId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleId> for String {
    fn from(value: RoleId) -> Self {
        value.0
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Role granted across the whole organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationRoleAssignment {
    role_id: RoleId,
}

impl OrganizationRoleAssignment {
    /// Creates an organization-wide assignment.
    #[must_use]
    pub fn new(role_id: RoleId) -> Self {
        Self { role_id }
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role_id(&self) -> &RoleId {
        &self.role_id
    }
}

/// Role granted on all resources of a kind or on an explicit id set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopedRoleAssignment {
    role_id: RoleId,
    #[serde(default)]
    all: bool,
    #[serde(default)]
    scope_ids: Vec<String>,
    #[serde(default)]
    application_roles: Vec<String>,
}

/// Deployment role assignment.
pub type DeploymentRoleAssignment = ScopedRoleAssignment;

/// Serverless project role assignment.
pub type ProjectRoleAssignment = ScopedRoleAssignment;

impl ScopedRoleAssignment {
    /// Creates an assignment without explicit scope ids.
    ///
    /// With `all` set the role applies to every resource of the kind.
    #[must_use]
    pub fn new(role_id: RoleId, all: bool) -> Self {
        Self {
            role_id,
            all,
            scope_ids: Vec::new(),
            application_roles: Vec::new(),
        }
    }

    /// Replaces the explicit resource ids the role applies to.
    #[must_use]
    pub fn with_scope_ids<I, S>(mut self, scope_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_ids = scope_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the application roles passed through to the resources.
    #[must_use]
    pub fn with_application_roles<I, S>(mut self, application_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.application_roles = application_roles.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role_id(&self) -> &RoleId {
        &self.role_id
    }

    /// Returns whether the role applies to every resource of the kind.
    #[must_use]
    pub fn all(&self) -> bool {
        self.all
    }

    /// Returns the explicit resource ids in input order.
    #[must_use]
    pub fn scope_ids(&self) -> &[String] {
        self.scope_ids.as_slice()
    }

    /// Returns the application roles in input order.
    #[must_use]
    pub fn application_roles(&self) -> &[String] {
        self.application_roles.as_slice()
    }
}

/// Category of scoped role assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopedCategory {
    /// Deployment role assignments.
    Deployment,
    /// Role assignments on serverless projects of one kind.
    Project(ProjectKind),
}

impl ScopedCategory {
    /// Returns every scoped category.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ScopedCategory] = &[
            ScopedCategory::Deployment,
            ScopedCategory::Project(ProjectKind::Elasticsearch),
            ScopedCategory::Project(ProjectKind::Observability),
            ScopedCategory::Project(ProjectKind::Security),
        ];

        ALL
    }

    /// Returns a stable label for logs and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Project(ProjectKind::Elasticsearch) => "elasticsearch_project",
            Self::Project(ProjectKind::Observability) => "observability_project",
            Self::Project(ProjectKind::Security) => "security_project",
        }
    }
}

/// All role assignments of one member, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleAssignments {
    /// Organization-wide roles.
    pub organization: Vec<OrganizationRoleAssignment>,
    /// Deployment roles.
    pub deployment: Vec<DeploymentRoleAssignment>,
    /// Elasticsearch project roles.
    pub elasticsearch_projects: Vec<ProjectRoleAssignment>,
    /// Observability project roles.
    pub observability_projects: Vec<ProjectRoleAssignment>,
    /// Security project roles.
    pub security_projects: Vec<ProjectRoleAssignment>,
}

impl RoleAssignments {
    /// Returns whether no category holds an assignment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.organization.is_empty()
            && ScopedCategory::all()
                .iter()
                .all(|category| self.scoped(*category).is_empty())
    }

    /// Returns the total number of assignments across categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.organization.len()
            + ScopedCategory::all()
                .iter()
                .map(|category| self.scoped(*category).len())
                .sum::<usize>()
    }

    /// Returns the assignments of a scoped category.
    #[must_use]
    pub fn scoped(&self, category: ScopedCategory) -> &[ScopedRoleAssignment] {
        match category {
            ScopedCategory::Deployment => &self.deployment,
            ScopedCategory::Project(kind) => self.projects(kind),
        }
    }

    /// Returns the assignments of a scoped category for modification.
    pub fn scoped_mut(&mut self, category: ScopedCategory) -> &mut Vec<ScopedRoleAssignment> {
        match category {
            ScopedCategory::Deployment => &mut self.deployment,
            ScopedCategory::Project(kind) => self.projects_mut(kind),
        }
    }

    /// Returns the project assignments of one project kind.
    #[must_use]
    pub fn projects(&self, kind: ProjectKind) -> &[ProjectRoleAssignment] {
        match kind {
            ProjectKind::Elasticsearch => &self.elasticsearch_projects,
            ProjectKind::Observability => &self.observability_projects,
            ProjectKind::Security => &self.security_projects,
        }
    }

    /// Returns the project assignments of one project kind for modification.
    pub fn projects_mut(&mut self, kind: ProjectKind) -> &mut Vec<ProjectRoleAssignment> {
        match kind {
            ProjectKind::Elasticsearch => &mut self.elasticsearch_projects,
            ProjectKind::Observability => &mut self.observability_projects,
            ProjectKind::Security => &mut self.security_projects,
        }
    }
}
