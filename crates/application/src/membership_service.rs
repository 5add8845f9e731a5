use std::sync::Arc;

use orgsync_core::{AppError, AppResult};
use orgsync_domain::{EmailAddress, RoleAssignmentDiff, RoleAssignments};

use crate::membership_ports::{
    InviteMemberInput, OrganizationInvitation, OrganizationMember, OrganizationMembershipApi,
};

#[cfg(test)]
mod tests;

/// Current relationship between an email address and an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// The invitation was accepted.
    Active(OrganizationMember),
    /// An invitation is pending.
    Invited(OrganizationInvitation),
}

impl Membership {
    /// Returns the role assignments currently attached to the membership.
    #[must_use]
    pub fn role_assignments(&self) -> &RoleAssignments {
        match self {
            Self::Active(member) => &member.role_assignments,
            Self::Invited(invitation) => &invitation.role_assignments,
        }
    }

    /// Computes the deltas that move this membership to `desired`.
    #[must_use]
    pub fn diff_to(&self, desired: &RoleAssignments) -> RoleAssignmentDiff {
        RoleAssignmentDiff::compute(self.role_assignments(), desired)
    }
}

/// Outcome of an update, describing which API writes were issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChange {
    /// Deltas between the stored and desired assignments.
    pub diff: RoleAssignmentDiff,
    /// A grant call was sent for `diff.to_add`.
    pub granted: bool,
    /// A revoke call was sent for `diff.to_remove`.
    pub revoked: bool,
    /// The pending invitation was cancelled and issued again.
    pub reinvited: bool,
}

/// Outcome of converging a membership onto the desired assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// No membership existed, an invitation was issued.
    Invited(OrganizationInvitation),
    /// The existing membership was updated.
    Updated(MembershipChange),
}

/// Application service for the organization membership lifecycle.
#[derive(Clone)]
pub struct MembershipService {
    api: Arc<dyn OrganizationMembershipApi>,
}

impl MembershipService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(api: Arc<dyn OrganizationMembershipApi>) -> Self {
        Self { api }
    }

    /// Looks up the membership of an email address.
    ///
    /// Accepted members take precedence over invitations. Expired invitations
    /// are ignored so the membership reads as absent.
    pub async fn read(
        &self,
        organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<Membership>> {
        if let Some(member) = self.api.find_member(organization_id, email).await? {
            return Ok(Some(Membership::Active(member)));
        }

        Ok(self
            .api
            .find_invitation(organization_id, email)
            .await?
            .map(Membership::Invited))
    }

    /// Invites an email address with the desired role assignments.
    pub async fn create(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        desired: RoleAssignments,
        expires_in: Option<String>,
    ) -> AppResult<OrganizationInvitation> {
        if let Some(existing) = self.read(organization_id, email).await? {
            let state = match existing {
                Membership::Active(_) => "a member",
                Membership::Invited(_) => "already invited",
            };
            return Err(AppError::Conflict(format!(
                "'{email}' is {state} in organization '{organization_id}'"
            )));
        }

        self.invite(organization_id, email, desired, expires_in).await
    }

    /// Computes the deltas an update would apply, without writing.
    pub async fn plan(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        desired: &RoleAssignments,
    ) -> AppResult<RoleAssignmentDiff> {
        let membership = self.require(organization_id, email).await?;
        Ok(membership.diff_to(desired))
    }

    /// Moves the membership to the desired role assignments.
    ///
    /// For an accepted member the grant call is sent before the revoke call.
    /// The two calls are independent: when the revoke fails after a successful
    /// grant the error is returned and the granted assignments stay in place.
    pub async fn update(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        desired: RoleAssignments,
        expires_in: Option<String>,
    ) -> AppResult<MembershipChange> {
        let membership = self.require(organization_id, email).await?;
        self.apply_changes(organization_id, email, membership, desired, expires_in)
            .await
    }

    /// Invites the email address when no membership exists, otherwise
    /// updates the existing membership.
    ///
    /// The membership is read once. Errors raised by the writes that follow
    /// are returned unchanged.
    pub async fn reconcile(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        desired: RoleAssignments,
        expires_in: Option<String>,
    ) -> AppResult<Reconciliation> {
        match self.read(organization_id, email).await? {
            Some(membership) => self
                .apply_changes(organization_id, email, membership, desired, expires_in)
                .await
                .map(Reconciliation::Updated),
            None => self
                .invite(organization_id, email, desired, expires_in)
                .await
                .map(Reconciliation::Invited),
        }
    }

    /// Removes the member or cancels the pending invitation.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn delete(&self, organization_id: &str, email: &EmailAddress) -> AppResult<bool> {
        match self.read(organization_id, email).await? {
            Some(Membership::Active(member)) => {
                self.api
                    .remove_member(organization_id, member.user_id.as_str())
                    .await?;
                Ok(true)
            }
            Some(Membership::Invited(invitation)) => {
                self.api
                    .delete_invitation(organization_id, invitation.token.as_str())
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn require(&self, organization_id: &str, email: &EmailAddress) -> AppResult<Membership> {
        self.read(organization_id, email).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "no member or pending invitation for '{email}' in organization '{organization_id}'"
            ))
        })
    }

    async fn invite(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        desired: RoleAssignments,
        expires_in: Option<String>,
    ) -> AppResult<OrganizationInvitation> {
        self.api
            .create_invitation(
                organization_id,
                InviteMemberInput {
                    email: email.clone(),
                    expires_in,
                    role_assignments: desired,
                },
            )
            .await
    }

    async fn apply_changes(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        membership: Membership,
        desired: RoleAssignments,
        expires_in: Option<String>,
    ) -> AppResult<MembershipChange> {
        match membership {
            Membership::Active(member) => {
                self.update_member(organization_id, &member, &desired).await
            }
            Membership::Invited(invitation) => {
                self.update_invitation(organization_id, email, invitation, desired, expires_in)
                    .await
            }
        }
    }

    async fn update_member(
        &self,
        organization_id: &str,
        member: &OrganizationMember,
        desired: &RoleAssignments,
    ) -> AppResult<MembershipChange> {
        let diff = RoleAssignmentDiff::compute(&member.role_assignments, desired);
        let mut change = MembershipChange::default();

        if !diff.to_add.is_empty() {
            self.api
                .grant_role_assignments(organization_id, member.user_id.as_str(), &diff.to_add)
                .await?;
            change.granted = true;
        }

        if !diff.to_remove.is_empty() {
            self.api
                .revoke_role_assignments(
                    organization_id,
                    member.user_id.as_str(),
                    &diff.to_remove,
                )
                .await?;
            change.revoked = true;
        }

        change.diff = diff;
        Ok(change)
    }

    // Invitations cannot be edited in place.
    async fn update_invitation(
        &self,
        organization_id: &str,
        email: &EmailAddress,
        invitation: OrganizationInvitation,
        desired: RoleAssignments,
        expires_in: Option<String>,
    ) -> AppResult<MembershipChange> {
        let diff = RoleAssignmentDiff::compute(&invitation.role_assignments, &desired);
        if diff.is_empty() {
            return Ok(MembershipChange {
                diff,
                ..MembershipChange::default()
            });
        }

        self.api
            .delete_invitation(organization_id, invitation.token.as_str())
            .await?;
        self.invite(organization_id, email, desired, expires_in).await?;

        Ok(MembershipChange {
            diff,
            reinvited: true,
            ..MembershipChange::default()
        })
    }
}
