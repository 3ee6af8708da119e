//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, lifecycle conflicts). Authorization and infrastructure concerns
/// belong elsewhere.
///
/// Every variant carries a machine-stable [`DomainError::reason`] string that
/// clients can switch on; the `Display` text is for humans and logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. missing field, malformed enum value).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A join code does not resolve to any organization.
    #[error("join code does not match any organization")]
    InvalidCode,

    /// The change would leave an organization without any admin.
    #[error("an organization must keep at least one admin")]
    LastAdminViolation,

    /// The requester already has a pending join request for the organization.
    #[error("a pending join request already exists for this organization")]
    DuplicatePending,

    /// The join request was already approved or denied.
    #[error("join request was already decided")]
    AlreadyDecided,

    /// The user already belongs to the organization.
    #[error("user is already a member of this organization")]
    AlreadyMember,

    /// The invitation belongs to a different organization than the one supplied.
    #[error("invitation belongs to a different organization")]
    OrgMismatch,

    /// The invitation is past its expiry.
    #[error("invitation has expired")]
    InviteExpired,

    /// The accepting identity's email differs from the invited email.
    #[error("invitation was issued to a different email")]
    EmailMismatch,

    /// Members never change their own role.
    #[error("members cannot change their own role")]
    SelfRoleChange,

    /// An identity with this email already exists.
    #[error("email is already registered")]
    EmailTaken,

    /// Email and password do not match a registered identity.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A requested resource was not found.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }

    /// Machine-stable reason tag for API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::InvalidCode => "invalid_code",
            DomainError::LastAdminViolation => "last_admin_violation",
            DomainError::DuplicatePending => "duplicate_pending",
            DomainError::AlreadyDecided => "already_decided",
            DomainError::AlreadyMember => "already_member",
            DomainError::OrgMismatch => "org_mismatch",
            DomainError::InviteExpired => "invite_expired",
            DomainError::EmailMismatch => "email_mismatch",
            DomainError::SelfRoleChange => "self_role_change",
            DomainError::EmailTaken => "email_taken",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::NotFound(_) => "not_found",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }
}
