use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use orgsync_core::{AppError, AppResult, NonEmptyString};
use orgsync_domain::EmailAddress;

const DEFAULT_API_ENDPOINT: &str = "https://api.elastic-cloud.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Lifecycle operation requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Report the deltas without writing.
    Plan,
    /// Invite or update the member.
    Apply,
    /// Remove the member or cancel the invitation.
    Delete,
}

impl FromStr for ReconcileMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "plan" => Ok(Self::Plan),
            "apply" => Ok(Self::Apply),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown mode '{value}', expected one of plan, apply, delete"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub mode: ReconcileMode,
    pub api_endpoint: String,
    pub api_key: NonEmptyString,
    pub organization_id: NonEmptyString,
    pub member_email: EmailAddress,
    pub desired_assignments_path: Option<PathBuf>,
    pub invitation_expires_in: Option<String>,
    pub http_timeout_secs: u64,
}

impl ReconcilerConfig {
    pub fn load() -> AppResult<Self> {
        let mode = env::args()
            .nth(1)
            .map(|value| ReconcileMode::from_str(value.as_str()))
            .transpose()?
            .unwrap_or(ReconcileMode::Apply);

        Self::from_lookup(mode, |name| env::var(name).ok())
    }

    fn from_lookup<F>(mode: ReconcileMode, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            optional(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };

        let api_endpoint = optional("ORGSYNC_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let api_key = NonEmptyString::new(required("ORGSYNC_API_KEY")?)?;
        let organization_id = NonEmptyString::new(required("ORGSYNC_ORGANIZATION_ID")?)?;
        let member_email = EmailAddress::new(required("ORGSYNC_MEMBER_EMAIL")?).map_err(
            |error| AppError::Validation(format!("invalid ORGSYNC_MEMBER_EMAIL: {error}")),
        )?;

        let desired_assignments_path = match mode {
            ReconcileMode::Plan | ReconcileMode::Apply => Some(PathBuf::from(required(
                "ORGSYNC_DESIRED_ASSIGNMENTS_PATH",
            )?)),
            ReconcileMode::Delete => optional("ORGSYNC_DESIRED_ASSIGNMENTS_PATH").map(PathBuf::from),
        };

        let invitation_expires_in = optional("ORGSYNC_INVITATION_EXPIRES_IN");

        let http_timeout_secs = match optional("ORGSYNC_HTTP_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid ORGSYNC_HTTP_TIMEOUT_SECS value '{value}': {error}"
                ))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        if http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "ORGSYNC_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            mode,
            api_endpoint,
            api_key,
            organization_id,
            member_email,
            desired_assignments_path,
            invitation_expires_in,
            http_timeout_secs,
        })
    }
}
