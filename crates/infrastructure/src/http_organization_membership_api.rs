use async_trait::async_trait;
use orgsync_application::{
    InviteMemberInput, OrganizationInvitation, OrganizationMember, OrganizationMembershipApi,
};
use orgsync_core::{AppError, AppResult};
use orgsync_domain::{EmailAddress, RoleAssignments};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

mod wire;


use wire::{InvitationRequest, InvitationsResponse, MembersResponse, RoleAssignmentsBody};

/// HTTP implementation of the organization membership port.
pub struct HttpOrganizationMembershipApi {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpOrganizationMembershipApi {
    /// Creates a new API adapter for the given endpoint.
    pub fn new(
        http_client: reqwest::Client,
        endpoint: &str,
        api_key: impl Into<String>,
    ) -> AppResult<Self> {
        let base_url = Url::parse(endpoint).map_err(|error| {
            AppError::Validation(format!("invalid API endpoint '{endpoint}': {error}"))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "API endpoint '{endpoint}' must be an http or https URL"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation(format!(
                    "API endpoint '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);

        Ok(url)
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> AppResult<reqwest::Response> {
        let response = request
            .header(AUTHORIZATION, format!("ApiKey {}", self.api_key))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("failed to {action}: {error}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(action, status = status.as_u16(), "API call succeeded");
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_owned());
        Err(status_error(status, action, body.as_str()))
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        action: &str,
    ) -> AppResult<T> {
        response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to parse response body to {action}: {error}"
            ))
        })
    }
}

/// Maps a non-success status into an application error category.
pub(crate) fn status_error(status: StatusCode, action: &str, body: &str) -> AppError {
    let message = format!(
        "failed to {action}: API returned status {}: {body}",
        status.as_u16()
    );

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::Internal(message),
    }
}

#[async_trait]
impl OrganizationMembershipApi for HttpOrganizationMembershipApi {
    async fn find_member(
        &self,
        organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<OrganizationMember>> {
        let action = "list organization members";
        let url = self.endpoint(&["organizations", organization_id, "members"])?;
        let response = self.execute(self.http_client.get(url), action).await?;
        let body: MembersResponse = Self::decode(response, action).await?;

        body.into_member_for(email, organization_id)
    }

    async fn find_invitation(
        &self,
        organization_id: &str,
        email: &EmailAddress,
    ) -> AppResult<Option<OrganizationInvitation>> {
        let action = "list organization invitations";
        let url = self.endpoint(&["organizations", organization_id, "invitations"])?;
        let response = self.execute(self.http_client.get(url), action).await?;
        let body: InvitationsResponse = Self::decode(response, action).await?;

        body.into_pending_for(email, organization_id)
    }

    async fn create_invitation(
        &self,
        organization_id: &str,
        input: InviteMemberInput,
    ) -> AppResult<OrganizationInvitation> {
        let action = "create organization invitation";
        let url = self.endpoint(&["organizations", organization_id, "invitations"])?;
        let request = InvitationRequest {
            emails: vec![input.email.as_str().to_owned()],
            expires_in: input.expires_in,
            role_assignments: RoleAssignmentsBody::from_domain(
                &input.role_assignments,
                organization_id,
            ),
        };

        let response = self
            .execute(self.http_client.post(url).json(&request), action)
            .await?;
        let body: InvitationsResponse = Self::decode(response, action).await?;

        let invitation = body
            .invitations
            .into_iter()
            .find(|invitation| input.email.matches(invitation.email.as_str()))
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "invitation response does not contain '{}'",
                    input.email
                ))
            })?
            .into_invitation(organization_id)?;

        info!(
            organization_id,
            email = %input.email,
            assignments = invitation.role_assignments.len(),
            "organization invitation created"
        );
        Ok(invitation)
    }

    async fn delete_invitation(&self, organization_id: &str, token: &str) -> AppResult<()> {
        let action = "delete organization invitation";
        let url = self.endpoint(&["organizations", organization_id, "invitations", token])?;
        self.execute(self.http_client.delete(url), action).await?;

        info!(organization_id, "organization invitation deleted");
        Ok(())
    }

    async fn grant_role_assignments(
        &self,
        organization_id: &str,
        user_id: &str,
        assignments: &RoleAssignments,
    ) -> AppResult<()> {
        let action = "grant role assignments";
        let url = self.endpoint(&["users", user_id, "role_assignments"])?;
        let body = RoleAssignmentsBody::from_domain(assignments, organization_id);
        self.execute(self.http_client.post(url).json(&body), action)
            .await?;

        info!(
            organization_id,
            user_id,
            assignments = assignments.len(),
            "role assignments granted"
        );
        Ok(())
    }

    async fn revoke_role_assignments(
        &self,
        organization_id: &str,
        user_id: &str,
        assignments: &RoleAssignments,
    ) -> AppResult<()> {
        let action = "revoke role assignments";
        let url = self.endpoint(&["users", user_id, "role_assignments"])?;
        let body = RoleAssignmentsBody::from_domain(assignments, organization_id);
        self.execute(self.http_client.delete(url).json(&body), action)
            .await?;

        info!(
            organization_id,
            user_id,
            assignments = assignments.len(),
            "role assignments revoked"
        );
        Ok(())
    }

    async fn remove_member(&self, organization_id: &str, user_id: &str) -> AppResult<()> {
        let action = "remove organization member";
        let url = self.endpoint(&["organizations", organization_id, "members", user_id])?;
        self.execute(self.http_client.delete(url), action).await?;

        info!(organization_id, user_id, "organization member removed");
        Ok(())
    }
}
