use orgsync_core::{AppError, AppResult};
use orgsync_domain::{
    EmailAddress, OrganizationRoleAssignment, ProjectKind, RoleAssignments, RoleId,
    ScopedCategory, ScopedRoleAssignment,
};
use serde::{Deserialize, Serialize};

use orgsync_application::{OrganizationInvitation, OrganizationMember};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RoleAssignmentsBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) organization: Option<Vec<OrganizationRoleAssignmentBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deployment: Option<Vec<DeploymentRoleAssignmentBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) project: Option<ProjectRoleAssignmentsBody>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct OrganizationRoleAssignmentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) organization_id: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DeploymentRoleAssignmentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) deployment_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) application_roles: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProjectRoleAssignmentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) project_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) application_roles: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProjectRoleAssignmentsBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) elasticsearch: Option<Vec<ProjectRoleAssignmentBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) observability: Option<Vec<ProjectRoleAssignmentBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) security: Option<Vec<ProjectRoleAssignmentBody>>,
}

impl ProjectRoleAssignmentsBody {
    fn kind_mut(&mut self, kind: ProjectKind) -> &mut Option<Vec<ProjectRoleAssignmentBody>> {
        match kind {
            ProjectKind::Elasticsearch => &mut self.elasticsearch,
            ProjectKind::Observability => &mut self.observability,
            ProjectKind::Security => &mut self.security,
        }
    }
}

fn required_role_id(role_id: Option<String>, category: &str) -> AppResult<RoleId> {
    let role_id = role_id.ok_or_else(|| {
        AppError::InvalidAssignment(format!("{category} role assignment has no role_id"))
    })?;

    RoleId::new(role_id).map_err(|_| {
        AppError::InvalidAssignment(format!("{category} role assignment has an empty role_id"))
    })
}

fn scoped_from_wire(
    category: ScopedCategory,
    role_id: Option<String>,
    all: Option<bool>,
    scope_ids: Option<Vec<String>>,
    application_roles: Option<Vec<String>>,
) -> AppResult<ScopedRoleAssignment> {
    let role_id = required_role_id(role_id, category.as_str())?;

    Ok(ScopedRoleAssignment::new(role_id, all.unwrap_or(false))
        .with_scope_ids(scope_ids.unwrap_or_default())
        .with_application_roles(application_roles.unwrap_or_default()))
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

impl RoleAssignmentsBody {
    /// Converts an API payload into the domain model.
    ///
    /// Fails with `InvalidAssignment` when any record lacks a role id.
    pub(crate) fn into_domain(self) -> AppResult<RoleAssignments> {
        let mut assignments = RoleAssignments::default();

        for body in self.organization.unwrap_or_default() {
            let role_id = required_role_id(body.role_id, "organization")?;
            assignments
                .organization
                .push(OrganizationRoleAssignment::new(role_id));
        }

        for body in self.deployment.unwrap_or_default() {
            assignments.deployment.push(scoped_from_wire(
                ScopedCategory::Deployment,
                body.role_id,
                body.all,
                body.deployment_ids,
                body.application_roles,
            )?);
        }

        if let Some(mut project) = self.project {
            for kind in ProjectKind::all() {
                for body in project.kind_mut(*kind).take().unwrap_or_default() {
                    assignments.projects_mut(*kind).push(scoped_from_wire(
                        ScopedCategory::Project(*kind),
                        body.role_id,
                        body.all,
                        body.project_ids,
                        body.application_roles,
                    )?);
                }
            }
        }

        Ok(assignments)
    }

    /// Builds an API payload, omitting empty categories.
    pub(crate) fn from_domain(assignments: &RoleAssignments, organization_id: &str) -> Self {
        let organization = assignments
            .organization
            .iter()
            .map(|assignment| OrganizationRoleAssignmentBody {
                role_id: Some(assignment.role_id().as_str().to_owned()),
                organization_id: Some(organization_id.to_owned()),
            })
            .collect::<Vec<_>>();

        let deployment = assignments
            .deployment
            .iter()
            .map(|assignment| DeploymentRoleAssignmentBody {
                role_id: Some(assignment.role_id().as_str().to_owned()),
                organization_id: Some(organization_id.to_owned()),
                all: Some(assignment.all()),
                deployment_ids: non_empty(assignment.scope_ids()),
                application_roles: non_empty(assignment.application_roles()),
            })
            .collect::<Vec<_>>();

        let mut project = ProjectRoleAssignmentsBody::default();
        for kind in ProjectKind::all() {
            let bodies = assignments
                .projects(*kind)
                .iter()
                .map(|assignment| ProjectRoleAssignmentBody {
                    role_id: Some(assignment.role_id().as_str().to_owned()),
                    organization_id: Some(organization_id.to_owned()),
                    all: Some(assignment.all()),
                    project_ids: non_empty(assignment.scope_ids()),
                    application_roles: non_empty(assignment.application_roles()),
                })
                .collect::<Vec<_>>();
            *project.kind_mut(*kind) = (!bodies.is_empty()).then_some(bodies);
        }
        let has_projects = project != ProjectRoleAssignmentsBody::default();

        Self {
            organization: (!organization.is_empty()).then_some(organization),
            deployment: (!deployment.is_empty()).then_some(deployment),
            project: has_projects.then_some(project),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MembersResponse {
    #[serde(default)]
    pub(crate) members: Vec<MemberBody>,
}

impl MembersResponse {
    /// Converts the record registered under `email`, leaving the others raw.
    pub(crate) fn into_member_for(
        self,
        email: &EmailAddress,
        organization_id: &str,
    ) -> AppResult<Option<OrganizationMember>> {
        self.members
            .into_iter()
            .find(|member| member.email.as_deref().is_some_and(|value| email.matches(value)))
            .map(|member| member.into_member(organization_id))
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberBody {
    pub(crate) user_id: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) organization_id: Option<String>,
    #[serde(default)]
    pub(crate) member_since: Option<String>,
    #[serde(default)]
    pub(crate) role_assignments: Option<RoleAssignmentsBody>,
}

impl MemberBody {
    pub(crate) fn into_member(self, organization_id: &str) -> AppResult<OrganizationMember> {
        Ok(OrganizationMember {
            user_id: self.user_id,
            email: self.email.unwrap_or_default(),
            organization_id: self
                .organization_id
                .unwrap_or_else(|| organization_id.to_owned()),
            member_since: self.member_since,
            role_assignments: self.role_assignments.unwrap_or_default().into_domain()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationsResponse {
    #[serde(default)]
    pub(crate) invitations: Vec<InvitationBody>,
}

impl InvitationsResponse {
    /// Converts the first non-expired invitation addressed to `email`.
    pub(crate) fn into_pending_for(
        self,
        email: &EmailAddress,
        organization_id: &str,
    ) -> AppResult<Option<OrganizationInvitation>> {
        self.invitations
            .into_iter()
            .find(|invitation| !invitation.expired && email.matches(invitation.email.as_str()))
            .map(|invitation| invitation.into_invitation(organization_id))
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationRef {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationBody {
    pub(crate) token: String,
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) organization: Option<OrganizationRef>,
    #[serde(default)]
    pub(crate) expired: bool,
    #[serde(default)]
    pub(crate) role_assignments: Option<RoleAssignmentsBody>,
}

impl InvitationBody {
    pub(crate) fn into_invitation(self, organization_id: &str) -> AppResult<OrganizationInvitation> {
        Ok(OrganizationInvitation {
            token: self.token,
            email: self.email,
            organization_id: self
                .organization
                .map(|organization| organization.id)
                .unwrap_or_else(|| organization_id.to_owned()),
            role_assignments: self.role_assignments.unwrap_or_default().into_domain()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct InvitationRequest {
    pub(crate) emails: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) expires_in: Option<String>,
    pub(crate) role_assignments: RoleAssignmentsBody,
}
