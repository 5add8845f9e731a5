use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use orgsync_core::{AppError, AppResult};
use orgsync_domain::{
    EmailAddress, OrganizationRoleAssignment, RoleAssignments, RoleId, ScopedRoleAssignment,
};

use crate::membership_ports::{
    InviteMemberInput, OrganizationInvitation, OrganizationMember, OrganizationMembershipApi,
};

use super::{Membership, MembershipService, Reconciliation};

const ORGANIZATION_ID: &str = "org-1";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ApiCall {
    CreateInvitation(String, RoleAssignments),
    DeleteInvitation(String),
    Grant(String, RoleAssignments),
    Revoke(String, RoleAssignments),
    RemoveMember(String),
}

#[derive(Default)]
struct FakeMembershipApi {
    members: Mutex<Vec<OrganizationMember>>,
    invitations: Mutex<Vec<OrganizationInvitation>>,
    calls: Mutex<Vec<ApiCall>>,
    fail_grant: bool,
    fail_revoke: bool,
}

#[async_trait]
impl OrganizationMembershipApi for FakeMembershipApi {
    async fn find_member(
        &self,
        _organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<OrganizationMember>> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .find(|member| email.matches(member.email.as_str()))
            .cloned())
    }

    async fn find_invitation(
        &self,
        _organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<OrganizationInvitation>> {
        Ok(self
            .invitations
            .lock()
            .await
            .iter()
            .find(|invitation| email.matches(invitation.email.as_str()))
            .cloned())
    }

    async fn create_invitation(
        &self,
        organization_id: &str,
        input: InviteMemberInput,
    ) -> AppResult<OrganizationInvitation> {
        self.calls.lock().await.push(ApiCall::CreateInvitation(
            input.email.as_str().to_owned(),
            input.role_assignments.clone(),
        ));
        let invitation = OrganizationInvitation {
            token: format!("token-{}", self.invitations.lock().await.len() + 1),
            email: input.email.as_str().to_owned(),
            organization_id: organization_id.to_owned(),
            role_assignments: input.role_assignments,
        };
        self.invitations.lock().await.push(invitation.clone());
        Ok(invitation)
    }

    async fn delete_invitation(&self, _organization_id: &str, token: &str) -> AppResult<()> {
        self.calls
            .lock()
            .await
            .push(ApiCall::DeleteInvitation(token.to_owned()));
        self.invitations
            .lock()
            .await
            .retain(|invitation| invitation.token != token);
        Ok(())
    }

    async fn grant_role_assignments(
        &self,
        _organization_id: &str,
        user_id: &str,
        assignments: &RoleAssignments,
    ) -> AppResult<()> {
        if self.fail_grant {
            return Err(AppError::NotFound(format!("user '{user_id}' not found")));
        }
        self.calls
            .lock()
            .await
            .push(ApiCall::Grant(user_id.to_owned(), assignments.clone()));
        Ok(())
    }

    async fn revoke_role_assignments(
        &self,
        _organization_id: &str,
        user_id: &str,
        assignments: &RoleAssignments,
    ) -> AppResult<()> {
        if self.fail_revoke {
            return Err(AppError::Internal("revoke endpoint unavailable".to_owned()));
        }
        self.calls
            .lock()
            .await
            .push(ApiCall::Revoke(user_id.to_owned(), assignments.clone()));
        Ok(())
    }

    async fn remove_member(&self, _organization_id: &str, user_id: &str) -> AppResult<()> {
        self.calls
            .lock()
            .await
            .push(ApiCall::RemoveMember(user_id.to_owned()));
        Ok(())
    }
}

fn email() -> AppResult<EmailAddress> {
    EmailAddress::new("jane@example.com")
}

fn viewer_on_all_deployments() -> AppResult<ScopedRoleAssignment> {
    Ok(ScopedRoleAssignment::new(RoleId::new("viewer")?, true))
}

fn billing_admin() -> AppResult<OrganizationRoleAssignment> {
    Ok(OrganizationRoleAssignment::new(RoleId::new("billing-admin")?))
}

fn member(role_assignments: RoleAssignments) -> OrganizationMember {
    OrganizationMember {
        user_id: "user-1".to_owned(),
        email: "Jane@Example.com".to_owned(),
        organization_id: ORGANIZATION_ID.to_owned(),
        member_since: Some("2024-01-01T00:00:00Z".to_owned()),
        role_assignments,
    }
}

fn invitation(token: &str, role_assignments: RoleAssignments) -> OrganizationInvitation {
    OrganizationInvitation {
        token: token.to_owned(),
        email: "jane@example.com".to_owned(),
        organization_id: ORGANIZATION_ID.to_owned(),
        role_assignments,
    }
}

fn service(api: FakeMembershipApi) -> (MembershipService, Arc<FakeMembershipApi>) {
    let api = Arc::new(api);
    (MembershipService::new(api.clone()), api)
}

#[tokio::test]
async fn read_prefers_accepted_member() -> AppResult<()> {
    let (service, _) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        invitations: Mutex::new(vec![invitation("token-1", RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let membership = service.read(ORGANIZATION_ID, &email()?).await?;

    assert!(matches!(membership, Some(Membership::Active(_))));
    Ok(())
}

#[tokio::test]
async fn read_of_unknown_email_is_none() -> AppResult<()> {
    let (service, _) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let membership = service
        .read(ORGANIZATION_ID, &EmailAddress::new("john@example.com")?)
        .await?;

    assert!(membership.is_none());
    Ok(())
}

#[tokio::test]
async fn create_invites_with_desired_assignments() -> AppResult<()> {
    let (service, api) = service(FakeMembershipApi::default());
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };

    let created = service
        .create(ORGANIZATION_ID, &email()?, desired.clone(), None)
        .await?;

    assert_eq!(created.role_assignments, desired);
    assert_eq!(
        *api.calls.lock().await,
        vec![ApiCall::CreateInvitation(
            "jane@example.com".to_owned(),
            desired
        )]
    );
    Ok(())
}

#[tokio::test]
async fn create_rejects_existing_member() -> AppResult<()> {
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let result = service
        .create(ORGANIZATION_ID, &email()?, RoleAssignments::default(), None)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_grants_then_revokes_deltas() -> AppResult<()> {
    let current = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let desired = RoleAssignments {
        deployment: vec![viewer_on_all_deployments()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(current.clone())]),
        ..FakeMembershipApi::default()
    });

    let change = service
        .update(ORGANIZATION_ID, &email()?, desired.clone(), None)
        .await?;

    assert!(change.granted);
    assert!(change.revoked);
    assert!(!change.reinvited);
    assert_eq!(
        *api.calls.lock().await,
        vec![
            ApiCall::Grant("user-1".to_owned(), desired),
            ApiCall::Revoke("user-1".to_owned(), current),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn update_skips_empty_directions() -> AppResult<()> {
    let current = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        deployment: vec![viewer_on_all_deployments()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(current)]),
        ..FakeMembershipApi::default()
    });

    let change = service
        .update(ORGANIZATION_ID, &email()?, desired, None)
        .await?;

    assert!(change.granted);
    assert!(!change.revoked);
    assert_eq!(api.calls.lock().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn update_without_changes_sends_nothing() -> AppResult<()> {
    let current = RoleAssignments {
        deployment: vec![viewer_on_all_deployments()?.with_application_roles(["reader"])],
        ..RoleAssignments::default()
    };
    let desired = RoleAssignments {
        deployment: vec![viewer_on_all_deployments()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(current)]),
        ..FakeMembershipApi::default()
    });

    let change = service
        .update(ORGANIZATION_ID, &email()?, desired, None)
        .await?;

    assert!(change.diff.is_empty());
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn revoke_failure_leaves_grant_applied() -> AppResult<()> {
    let current = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let desired = RoleAssignments {
        deployment: vec![viewer_on_all_deployments()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(current)]),
        fail_revoke: true,
        ..FakeMembershipApi::default()
    });

    let result = service
        .update(ORGANIZATION_ID, &email()?, desired.clone(), None)
        .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    assert_eq!(
        *api.calls.lock().await,
        vec![ApiCall::Grant("user-1".to_owned(), desired)]
    );
    Ok(())
}

#[tokio::test]
async fn update_reissues_changed_invitation() -> AppResult<()> {
    let desired = RoleAssignments {
        deployment: vec![viewer_on_all_deployments()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        invitations: Mutex::new(vec![invitation("token-9", RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let change = service
        .update(ORGANIZATION_ID, &email()?, desired.clone(), Some("7d".to_owned()))
        .await?;

    assert!(change.reinvited);
    assert!(!change.granted);
    assert_eq!(
        *api.calls.lock().await,
        vec![
            ApiCall::DeleteInvitation("token-9".to_owned()),
            ApiCall::CreateInvitation("jane@example.com".to_owned(), desired),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn update_of_missing_membership_is_not_found() -> AppResult<()> {
    let (service, _) = service(FakeMembershipApi::default());

    let result = service
        .update(ORGANIZATION_ID, &email()?, RoleAssignments::default(), None)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn plan_does_not_write() -> AppResult<()> {
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let diff = service.plan(ORGANIZATION_ID, &email()?, &desired).await?;

    assert_eq!(diff.to_add, desired);
    assert!(diff.to_remove.is_empty());
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_removes_member_or_cancels_invitation() -> AppResult<()> {
    let (member_service, member_api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });
    assert!(member_service.delete(ORGANIZATION_ID, &email()?).await?);
    assert_eq!(
        *member_api.calls.lock().await,
        vec![ApiCall::RemoveMember("user-1".to_owned())]
    );

    let (invited_service, invited_api) = service(FakeMembershipApi {
        invitations: Mutex::new(vec![invitation("token-3", RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });
    assert!(invited_service.delete(ORGANIZATION_ID, &email()?).await?);
    assert_eq!(
        *invited_api.calls.lock().await,
        vec![ApiCall::DeleteInvitation("token-3".to_owned())]
    );

    let (empty_service, empty_api) = service(FakeMembershipApi::default());
    assert!(!empty_service.delete(ORGANIZATION_ID, &email()?).await?);
    assert!(empty_api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn create_rejects_pending_invitation() -> AppResult<()> {
    let (service, api) = service(FakeMembershipApi {
        invitations: Mutex::new(vec![invitation("token-1", RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let result = service
        .create(ORGANIZATION_ID, &email()?, RoleAssignments::default(), None)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(message)) if message.contains("invited")));
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn grant_failure_skips_revoke() -> AppResult<()> {
    let current = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let desired = RoleAssignments {
        deployment: vec![viewer_on_all_deployments()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(current)]),
        fail_grant: true,
        ..FakeMembershipApi::default()
    });

    let result = service
        .update(ORGANIZATION_ID, &email()?, desired, None)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_of_unchanged_invitation_sends_nothing() -> AppResult<()> {
    let assignments = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        invitations: Mutex::new(vec![invitation("token-4", assignments.clone())]),
        ..FakeMembershipApi::default()
    });

    let change = service
        .update(ORGANIZATION_ID, &email()?, assignments, None)
        .await?;

    assert!(change.diff.is_empty());
    assert!(!change.reinvited);
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn reissued_invitation_uses_requested_address() -> AppResult<()> {
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let mut pending = invitation("token-5", RoleAssignments::default());
    pending.email = " JANE@Example.COM".to_owned();
    let (service, api) = service(FakeMembershipApi {
        invitations: Mutex::new(vec![pending]),
        ..FakeMembershipApi::default()
    });

    service
        .update(ORGANIZATION_ID, &email()?, desired.clone(), None)
        .await?;

    assert_eq!(
        *api.calls.lock().await,
        vec![
            ApiCall::DeleteInvitation("token-5".to_owned()),
            ApiCall::CreateInvitation("jane@example.com".to_owned(), desired),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn reconcile_invites_absent_membership() -> AppResult<()> {
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi::default());

    let outcome = service
        .reconcile(ORGANIZATION_ID, &email()?, desired.clone(), None)
        .await?;

    assert!(matches!(outcome, Reconciliation::Invited(_)));
    assert_eq!(
        *api.calls.lock().await,
        vec![ApiCall::CreateInvitation(
            "jane@example.com".to_owned(),
            desired
        )]
    );
    Ok(())
}

#[tokio::test]
async fn reconcile_updates_existing_member() -> AppResult<()> {
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        ..FakeMembershipApi::default()
    });

    let outcome = service
        .reconcile(ORGANIZATION_ID, &email()?, desired.clone(), None)
        .await?;

    assert!(matches!(outcome, Reconciliation::Updated(change) if change.granted));
    assert_eq!(
        *api.calls.lock().await,
        vec![ApiCall::Grant("user-1".to_owned(), desired)]
    );
    Ok(())
}

#[tokio::test]
async fn reconcile_returns_not_found_from_grant_without_inviting() -> AppResult<()> {
    let desired = RoleAssignments {
        organization: vec![billing_admin()?],
        ..RoleAssignments::default()
    };
    let (service, api) = service(FakeMembershipApi {
        members: Mutex::new(vec![member(RoleAssignments::default())]),
        fail_grant: true,
        ..FakeMembershipApi::default()
    });

    let result = service
        .reconcile(ORGANIZATION_ID, &email()?, desired, None)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(message)) if message.contains("user-1")));
    assert!(api.calls.lock().await.is_empty());
    Ok(())
}
