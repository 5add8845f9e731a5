//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_organization_membership_api;

pub use http_organization_membership_api::HttpOrganizationMembershipApi;
