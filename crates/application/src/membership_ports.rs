use async_trait::async_trait;

use orgsync_core::AppResult;
use orgsync_domain::{EmailAddress, RoleAssignments};

/// Accepted organization member returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationMember {
    /// Stable user identifier used by role-assignment endpoints.
    pub user_id: String,
    /// Email address as reported by the API.
    pub email: String,
    /// Organization the member belongs to.
    pub organization_id: String,
    /// Membership start timestamp, when reported.
    pub member_since: Option<String>,
    /// Role assignments currently held by the member.
    pub role_assignments: RoleAssignments,
}

/// Pending invitation returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationInvitation {
    /// Invitation token used to cancel the invitation.
    pub token: String,
    /// Invited email address.
    pub email: String,
    /// Organization issuing the invitation.
    pub organization_id: String,
    /// Role assignments granted when the invitation is accepted.
    pub role_assignments: RoleAssignments,
}

/// Input payload for inviting a new member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteMemberInput {
    /// Email address to invite.
    pub email: EmailAddress,
    /// Optional invitation lifetime understood by the API, e.g. `7d`.
    pub expires_in: Option<String>,
    /// Role assignments granted on acceptance.
    pub role_assignments: RoleAssignments,
}

/// Port to the organization membership endpoints of the control-plane API.
#[async_trait]
pub trait OrganizationMembershipApi: Send + Sync {
    /// Finds the accepted member registered under an email address.
    ///
    /// Only the matching record is validated, so malformed assignments held by
    /// other members do not fail the lookup.
    async fn find_member(
        &self,
        organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<OrganizationMember>>;

    /// Finds the pending invitation of an email address.
    ///
    /// Expired invitations are skipped.
    async fn find_invitation(
        &self,
        organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<OrganizationInvitation>>;

    /// Invites an email address into an organization.
    async fn create_invitation(
        &self,
        organization_id: &str,
        input: InviteMemberInput,
    ) -> AppResult<OrganizationInvitation>;

    /// Cancels a pending invitation.
    async fn delete_invitation(&self, organization_id: &str, token: &str) -> AppResult<()>;

    /// Grants role assignments to a member.
    async fn grant_role_assignments(
        &self,
        organization_id: &str,
        user_id: &str,
        assignments: &RoleAssignments,
    ) -> AppResult<()>;

    /// Revokes role assignments from a member.
    async fn revoke_role_assignments(
        &self,
        organization_id: &str,
        user_id: &str,
        assignments: &RoleAssignments,
    ) -> AppResult<()>;

    /// Removes a member from an organization.
    async fn remove_member(&self, organization_id: &str, user_id: &str) -> AppResult<()>;
}
