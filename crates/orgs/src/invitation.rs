use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use gabinete_auth::Role;
use gabinete_core::{DomainError, DomainResult, OrgId, UserId};

/// Single-use bearer token identifying an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteToken(String);

impl InviteToken {
    const BYTES: usize = 32;

    /// 32 random bytes, URL-safe base64 without padding.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for InviteToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub token: InviteToken,
    pub org_id: OrgId,
    /// Lower-cased invited address.
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Facts about the accepting caller, checked against an invitation.
#[derive(Debug, Clone, Copy)]
pub struct AcceptCheck<'a> {
    pub now: DateTime<Utc>,
    pub org_hint: Option<OrgId>,
    pub caller_email: Option<&'a str>,
}

impl Invitation {
    pub fn issue(
        org_id: OrgId,
        email: &str,
        role: Role,
        created_by: UserId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DomainResult<Self> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(DomainError::validation("a valid email is required"));
        }
        Ok(Self {
            token: InviteToken::generate(),
            org_id,
            email,
            role,
            expires_at: now + ttl,
            created_by,
            created_at: now,
        })
    }

    /// An invitation whose expiry is at or before `now` can never be accepted.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Acceptance link, if a public site URL is configured.
    pub fn link(&self, site_url: Option<&str>) -> Option<String> {
        site_url.map(|base| {
            format!(
                "{}/accept-invite?token={}",
                base.trim_end_matches('/'),
                self.token
            )
        })
    }

    /// Checks run in order: expiry, organization hint, email.
    pub fn check_acceptable(&self, check: AcceptCheck<'_>) -> DomainResult<()> {
        if self.is_expired(check.now) {
            return Err(DomainError::InviteExpired);
        }
        if check.org_hint.is_some_and(|hint| hint != self.org_id) {
            return Err(DomainError::OrgMismatch);
        }
        match check.caller_email {
            Some(email) if normalize_email(email) == self.email => Ok(()),
            _ => Err(DomainError::EmailMismatch),
        }
    }
}
