//! Application services and ports.

#![forbid(unsafe_code)]

mod membership_ports;
mod membership_service;

pub use membership_ports::{
    InviteMemberInput, OrganizationInvitation, OrganizationMember, OrganizationMembershipApi,
};
pub use membership_service::{Membership, MembershipChange, MembershipService, Reconciliation};
