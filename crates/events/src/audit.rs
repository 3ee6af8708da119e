//! Audit events for privileged mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gabinete_core::{DomainError, OrgId, UserId};

use crate::OrgScoped;

/// Verb recorded in the audit log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Accept,
    Approve,
    Deny,
    Rotate,
    ResetPassword,
}

impl AuditAction {
    pub const ALL: [AuditAction; 8] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
        AuditAction::Accept,
        AuditAction::Approve,
        AuditAction::Deny,
        AuditAction::Rotate,
        AuditAction::ResetPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Accept => "ACCEPT",
            AuditAction::Approve => "APPROVE",
            AuditAction::Deny => "DENY",
            AuditAction::Rotate => "ROTATE",
            AuditAction::ResetPassword => "RESET_PASSWORD",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown audit action '{s}'")))
    }
}

/// Kind of entity an audit entry is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Membership,
    Invitation,
    JoinRequest,
    Organization,
    Profile,
    Voter,
    Tag,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Membership => "membership",
            AuditEntity::Invitation => "invitation",
            AuditEntity::JoinRequest => "join_request",
            AuditEntity::Organization => "organization",
            AuditEntity::Profile => "profile",
            AuditEntity::Voter => "voter",
            AuditEntity::Tag => "tag",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "membership" => Some(AuditEntity::Membership),
            "invitation" => Some(AuditEntity::Invitation),
            "join_request" => Some(AuditEntity::JoinRequest),
            "organization" => Some(AuditEntity::Organization),
            "profile" => Some(AuditEntity::Profile),
            "voter" => Some(AuditEntity::Voter),
            "tag" => Some(AuditEntity::Tag),
            _ => None,
        }
    }
}

/// A privileged mutation that happened, as published on the audit bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Organization the mutation belongs to (`None` for global actions).
    pub org_id: Option<OrgId>,
    pub actor: UserId,
    pub action: AuditAction,
    pub entity: AuditEntity,
    /// Free-form structured detail payload.
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        org_id: Option<OrgId>,
        actor: UserId,
        action: AuditAction,
        entity: AuditEntity,
        details: serde_json::Value,
    ) -> Self {
        Self {
            org_id,
            actor,
            action,
            entity,
            details,
            occurred_at: Utc::now(),
        }
    }
}

impl OrgScoped for AuditEvent {
    fn org_id(&self) -> Option<OrgId> {
        self.org_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_parse_case_insensitively() {
        assert_eq!("delete".parse::<AuditAction>().unwrap(), AuditAction::Delete);
        assert_eq!(
            "Reset_Password".parse::<AuditAction>().unwrap(),
            AuditAction::ResetPassword
        );
        assert!("PURGE".parse::<AuditAction>().is_err());
    }

    #[test]
    fn action_serializes_as_tag() {
        let json = serde_json::to_value(AuditAction::ResetPassword).unwrap();
        assert_eq!(json, "RESET_PASSWORD");
        let entity = serde_json::to_value(AuditEntity::JoinRequest).unwrap();
        assert_eq!(entity, "join_request");
    }
}
