use core::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use gabinete_auth::Role;
use gabinete_core::{DomainError, DomainResult, OrgId, TagId};
use gabinete_events::AuditAction;
use gabinete_infra::services::{AuditQuery, VoterListParams};
use gabinete_orgs::{Decision, JoinRequestStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CancelInvitationRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
    #[serde(default)]
    pub org_id: Option<OrgId>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJoinRequest {
    pub code: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecideJoinRequest {
    pub decision: Decision,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinRequestListParams {
    pub status: Option<String>,
}

impl JoinRequestListParams {
    pub fn status(&self) -> DomainResult<Option<JoinRequestStatus>> {
        self.status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(JoinRequestStatus::parse)
            .transpose()
    }
}

/// Raw `/audit` query string. Values are parsed by hand so that a bad filter
/// is a validation error rather than a framework rejection.
#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub org_id: Option<String>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl AuditParams {
    pub fn into_query(self) -> DomainResult<AuditQuery> {
        Ok(AuditQuery {
            org_id: parse_opt(self.org_id)?,
            actor: parse_opt(self.actor)?,
            action: parse_opt::<AuditAction>(self.action)?,
            from: parse_timestamp(self.from, "from")?,
            to: parse_timestamp(self.to, "to")?,
            page: parse_number(self.page, "page")?,
            page_size: parse_number(self.page_size, "page_size")?,
        })
    }
}

/// Raw voter listing query string, parsed like [`AuditParams`].
#[derive(Debug, Default, Deserialize)]
pub struct VoterParams {
    pub q: Option<String>,
    pub tag_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl VoterParams {
    pub fn into_params(self) -> DomainResult<VoterListParams> {
        Ok(VoterListParams {
            q: non_blank(self.q),
            tag_id: parse_opt::<TagId>(self.tag_id)?,
            page: parse_number(self.page, "page")?,
            limit: parse_number(self.limit, "limit")?,
        })
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

fn parse_opt<T: FromStr<Err = DomainError>>(raw: Option<String>) -> DomainResult<Option<T>> {
    non_blank(raw).map(|s| s.parse()).transpose()
}

fn parse_timestamp(raw: Option<String>, field: &str) -> DomainResult<Option<DateTime<Utc>>> {
    non_blank(raw)
        .map(|s| {
            DateTime::parse_from_rfc3339(s.trim())
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| DomainError::validation(format!("{field} must be an RFC 3339 timestamp")))
        })
        .transpose()
}

fn parse_number(raw: Option<String>, field: &str) -> DomainResult<Option<u32>> {
    non_blank(raw)
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| DomainError::validation(format!("{field} must be a non-negative integer")))
        })
        .transpose()
}

// -------------------------
// Path helpers
// -------------------------

/// Parse an id taken from the path; failures become a 400 `invalid_id`.
pub fn parse_id<T: FromStr<Err = DomainError>>(raw: &str) -> Result<T, axum::response::Response> {
    raw.parse::<T>().map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, e.reason(), e.to_string())
    })
}
