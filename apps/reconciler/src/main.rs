//! orgsync reconciler: converges one organization member onto a desired set
//! of role assignments.

#![forbid(unsafe_code)]

mod reconciler_config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use orgsync_application::{MembershipService, Reconciliation};
use orgsync_core::{AppError, AppResult};
use orgsync_domain::{RoleAssignmentDiff, RoleAssignments, ScopedCategory};
use orgsync_infrastructure::HttpOrganizationMembershipApi;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::reconciler_config::{ReconcileMode, ReconcilerConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ReconcilerConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let api = HttpOrganizationMembershipApi::new(
        http_client,
        config.api_endpoint.as_str(),
        config.api_key.as_str(),
    )?;
    let service = MembershipService::new(Arc::new(api));

    info!(
        mode = ?config.mode,
        api_endpoint = %config.api_endpoint,
        organization_id = %config.organization_id,
        member_email = %config.member_email,
        "orgsync-reconciler started"
    );

    match config.mode {
        ReconcileMode::Plan => plan(&service, &config).await,
        ReconcileMode::Apply => apply(&service, &config).await,
        ReconcileMode::Delete => delete(&service, &config).await,
    }
}

async fn plan(service: &MembershipService, config: &ReconcilerConfig) -> AppResult<()> {
    let desired = load_desired(config)?;

    match service
        .read(config.organization_id.as_str(), &config.member_email)
        .await?
    {
        Some(membership) => log_diff(&membership.diff_to(&desired)),
        None => info!(
            assignments = desired.len(),
            "membership absent, an invitation would be created"
        ),
    }

    Ok(())
}

async fn apply(service: &MembershipService, config: &ReconcilerConfig) -> AppResult<()> {
    let desired = load_desired(config)?;

    match service
        .reconcile(
            config.organization_id.as_str(),
            &config.member_email,
            desired,
            config.invitation_expires_in.clone(),
        )
        .await?
    {
        Reconciliation::Updated(change) => {
            log_diff(&change.diff);
            info!(
                granted = change.granted,
                revoked = change.revoked,
                reinvited = change.reinvited,
                "membership reconciled"
            );
        }
        Reconciliation::Invited(invitation) => info!(
            assignments = invitation.role_assignments.len(),
            "member invited"
        ),
    }

    Ok(())
}

async fn delete(service: &MembershipService, config: &ReconcilerConfig) -> AppResult<()> {
    let deleted = service
        .delete(config.organization_id.as_str(), &config.member_email)
        .await?;

    if deleted {
        info!("membership deleted");
    } else {
        info!("membership already absent");
    }

    Ok(())
}

fn load_desired(config: &ReconcilerConfig) -> AppResult<RoleAssignments> {
    let path = config.desired_assignments_path.as_deref().ok_or_else(|| {
        AppError::Validation("ORGSYNC_DESIRED_ASSIGNMENTS_PATH is required".to_owned())
    })?;

    read_desired_file(path)
}

fn read_desired_file(path: &Path) -> AppResult<RoleAssignments> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!(
            "failed to read desired assignments '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(contents.as_str()).map_err(|error| {
        AppError::InvalidAssignment(format!(
            "failed to parse desired assignments '{}': {error}",
            path.display()
        ))
    })
}

fn log_diff(diff: &RoleAssignmentDiff) {
    if diff.is_empty() {
        info!("role assignments up to date");
        return;
    }

    info!(
        category = "organization",
        to_add = diff.to_add.organization.len(),
        to_remove = diff.to_remove.organization.len(),
        "role assignment delta"
    );
    for category in ScopedCategory::all() {
        info!(
            category = category.as_str(),
            to_add = diff.to_add.scoped(*category).len(),
            to_remove = diff.to_remove.scoped(*category).len(),
            "role assignment delta"
        );
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
