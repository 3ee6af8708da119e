//! Persistence boundary.
//!
//! One trait per aggregate family. Every operation that reads state and then
//! writes based on it (last-admin checks, duplicate-pending checks, invite
//! acceptance, join-request decisions, cascades) is a single trait method so
//! implementations can make it atomic: one write lock in memory, one
//! transaction with row locks in PostgreSQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gabinete_auth::Role;
use gabinete_core::{AuditEntryId, DomainError, JoinRequestId, OrgId, TagId, UserId, VoterId};
use gabinete_events::{AuditAction, AuditEntity, AuditEvent};
use gabinete_orgs::{
    AcceptCheck, Case, Decision, Invitation, InviteToken, JoinCode, JoinRequest, JoinRequestStatus,
    Organization, Tag, TagPatch, Voter, VoterPatch,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A domain rule evaluated inside the store rejected the operation.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    /// A uniqueness constraint was hit (e.g. a join code collision).
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Member row joined with the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// An organization the user belongs to, with the user's role there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyMembership {
    pub org: Organization,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestView {
    #[serde(flatten)]
    pub request: JoinRequest,
    pub org_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Identity created by an org admin through the bundled identity admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// Stored login material for an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,
    /// `None` for identities that only authenticate through the external provider.
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub organizations: u64,
    pub profiles: u64,
    pub memberships: u64,
    pub cases: u64,
    pub voters: u64,
}

/// Persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub org_id: Option<OrgId>,
    pub actor: UserId,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn from_event(event: &AuditEvent) -> Self {
        Self {
            id: AuditEntryId::new(),
            org_id: event.org_id,
            actor: event.actor,
            action: event.action,
            entity: event.entity,
            details: event.details.clone(),
            created_at: event.occurred_at,
        }
    }
}

/// Audit query criteria. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub org_id: Option<OrgId>,
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.org_id.is_none_or(|o| entry.org_id == Some(o))
            && self.actor.is_none_or(|a| entry.actor == a)
            && self.action.is_none_or(|a| entry.action == a)
            && self.from.is_none_or(|f| entry.created_at >= f)
            && self.to.is_none_or(|t| entry.created_at <= t)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 50;
    pub const MAX_SIZE: u32 = 200;

    /// Missing values take defaults; out-of-range values are clamped.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(Self::DEFAULT_SIZE)
                .clamp(1, Self::MAX_SIZE),
        }
    }

    /// Like [`PageRequest::new`] with a caller-chosen default and ceiling.
    pub fn bounded(page: Option<u32>, page_size: Option<u32>, default: u32, max: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(default).clamp(1, max),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Voter listing criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterQuery {
    /// Substring over name, phone, email and city.
    pub q: Option<String>,
    pub tag_id: Option<TagId>,
}

impl VoterQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn page(page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::bounded(page, limit, Self::DEFAULT_LIMIT, Self::MAX_LIMIT)
    }
}

#[async_trait::async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert the organization and its first admin membership atomically.
    /// A join code collision yields [`StoreError::Conflict`].
    async fn create_org_with_admin(&self, org: &Organization, admin: UserId) -> StoreResult<()>;

    async fn get_org(&self, org_id: OrgId) -> StoreResult<Option<Organization>>;

    async fn find_org_by_code(&self, code: &JoinCode) -> StoreResult<Option<Organization>>;

    /// Replace the join code. Unknown org: `Rejected(NotFound)`.
    async fn set_join_code(&self, org_id: OrgId, code: &JoinCode) -> StoreResult<()>;

    /// All organizations, newest first.
    async fn list_orgs(&self) -> StoreResult<Vec<Organization>>;

    /// Delete voter tags, voters, tags, cases, join requests, invitations,
    /// memberships, then the organization, all or nothing. Unknown org: `Rejected(NotFound)`.
    async fn delete_org_cascade(&self, org_id: OrgId) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    async fn role_of(&self, org_id: OrgId, user_id: UserId) -> StoreResult<Option<Role>>;

    /// Members of an organization with profile data, newest first.
    async fn list_members(&self, org_id: OrgId) -> StoreResult<Vec<MemberView>>;

    async fn memberships_of(&self, user_id: UserId) -> StoreResult<Vec<MyMembership>>;

    /// Upsert a role under the last-admin rule. Returns the previous role.
    async fn set_role_guarded(
        &self,
        org_id: OrgId,
        user_id: UserId,
        role: Role,
    ) -> StoreResult<Option<Role>>;

    /// Delete a membership under the last-admin rule. Returns whether a row
    /// was removed; an absent membership is not an error.
    async fn remove_member_guarded(&self, org_id: OrgId, user_id: UserId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait InvitationStore: Send + Sync {
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    /// All invitations of an organization (expired ones included), newest first.
    async fn list_invitations(&self, org_id: OrgId) -> StoreResult<Vec<Invitation>>;

    /// Delete by (token, org). Returns whether a row was removed.
    async fn delete_invitation(&self, token: &InviteToken, org_id: OrgId) -> StoreResult<bool>;

    /// Look up, check, upsert the membership (last-admin rule applies) and
    /// consume the invitation, atomically.
    async fn accept_invitation(
        &self,
        token: &InviteToken,
        user_id: UserId,
        check: AcceptCheck<'_>,
    ) -> StoreResult<Invitation>;
}

#[async_trait::async_trait]
pub trait JoinRequestStore: Send + Sync {
    /// Insert a pending request unless the requester is already a member or
    /// already has a pending request for the organization.
    async fn submit_join_request(&self, request: &JoinRequest) -> StoreResult<()>;

    async fn get_join_request(&self, id: JoinRequestId) -> StoreResult<Option<JoinRequest>>;

    /// Decide a pending request; approval adds a viewer membership when the
    /// requester has none.
    async fn decide_join_request(
        &self,
        id: JoinRequestId,
        decision: Decision,
        by: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinRequest>;

    /// Requests for an organization, oldest first.
    async fn list_join_requests(
        &self,
        org_id: OrgId,
        status: Option<JoinRequestStatus>,
    ) -> StoreResult<Vec<JoinRequest>>;

    /// A requester's own requests, newest first.
    async fn join_requests_of(&self, user_id: UserId) -> StoreResult<Vec<JoinRequestView>>;
}

#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: &AuditEntry) -> StoreResult<()>;

    /// Matching entries, newest first.
    async fn query_audit(&self, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEntry>>;
}

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create the profile on first sight; refreshes a missing email. An email
    /// already held by another profile is not recorded, and the call still
    /// succeeds.
    async fn ensure_profile(&self, user_id: UserId, email: Option<&str>) -> StoreResult<Profile>;

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>>;

    async fn is_super_admin(&self, user_id: UserId) -> StoreResult<bool>;

    /// Set the global flag, creating a bare profile when none exists.
    async fn set_super_admin(&self, user_id: UserId, flag: bool) -> StoreResult<()>;

    /// Register a new identity and give it a role in `org_id`, all or
    /// nothing. A taken email is `Rejected(EmailTaken)`.
    async fn create_user_with_membership(
        &self,
        user: &NewUser,
        org_id: OrgId,
        role: Role,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Login material for a normalized email.
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>>;

    /// Unknown user: `Rejected(NotFound)`.
    async fn set_password_hash(&self, user_id: UserId, hash: &str) -> StoreResult<()>;

    /// Remove every membership and the profile, unless the user is the only
    /// admin of some organization.
    async fn delete_account(&self, user_id: UserId) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<Stats>;
}

#[async_trait::async_trait]
pub trait CaseStore: Send + Sync {
    async fn insert_case(&self, case: &Case) -> StoreResult<()>;

    /// Cases of an organization, newest first.
    async fn list_cases(&self, org_id: OrgId) -> StoreResult<Vec<Case>>;
}

#[async_trait::async_trait]
pub trait VoterStore: Send + Sync {
    async fn insert_voter(&self, voter: &Voter) -> StoreResult<()>;

    async fn get_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<Option<Voter>>;

    /// Matching voters, newest first.
    async fn list_voters(
        &self,
        org_id: OrgId,
        query: &VoterQuery,
        page: PageRequest,
    ) -> StoreResult<Page<Voter>>;

    /// Apply the patch to the stored row atomically. Unknown voter:
    /// `Rejected(NotFound)`.
    async fn update_voter(&self, org_id: OrgId, voter_id: VoterId, patch: VoterPatch) -> StoreResult<Voter>;

    /// Delete the voter and its tag links. Returns whether a row was removed.
    async fn delete_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait TagStore: Send + Sync {
    async fn insert_tag(&self, tag: &Tag) -> StoreResult<()>;

    /// Tags of an organization, newest first.
    async fn list_tags(&self, org_id: OrgId) -> StoreResult<Vec<Tag>>;

    /// Unknown tag: `Rejected(NotFound)`.
    async fn update_tag(&self, org_id: OrgId, tag_id: TagId, patch: TagPatch) -> StoreResult<Tag>;

    /// Delete the tag and its voter links. Returns whether a row was removed.
    async fn delete_tag(&self, org_id: OrgId, tag_id: TagId) -> StoreResult<bool>;

    /// Link a voter and a tag of the same organization. Linking twice is a
    /// no-op. Either side missing from the organization: `Rejected(NotFound)`.
    async fn tag_voter(&self, org_id: OrgId, voter_id: VoterId, tag_id: TagId) -> StoreResult<()>;

    /// Returns whether a link was removed.
    async fn untag_voter(&self, org_id: OrgId, voter_id: VoterId, tag_id: TagId) -> StoreResult<bool>;

    /// Tags attached to a voter, by name.
    async fn tags_of_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<Vec<Tag>>;
}

/// Everything the lifecycle services need from persistence.
pub trait Store:
    OrganizationStore
    + MembershipStore
    + InvitationStore
    + JoinRequestStore
    + AuditStore
    + ProfileStore
    + CaseStore
    + VoterStore
    + TagStore
{
}

impl<T> Store for T where
    T: OrganizationStore
        + MembershipStore
        + InvitationStore
        + JoinRequestStore
        + AuditStore
        + ProfileStore
        + CaseStore
        + VoterStore
        + TagStore
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        let p = PageRequest::new(None, None);
        assert_eq!((p.page, p.page_size), (1, 50));

        let p = PageRequest::new(Some(0), Some(1000));
        assert_eq!((p.page, p.page_size), (1, 200));
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);

        let p = VoterQuery::page(None, None);
        assert_eq!((p.page, p.page_size), (1, 20));
        let p = VoterQuery::page(Some(2), Some(500));
        assert_eq!((p.page, p.page_size), (2, 100));
    }

    #[test]
    fn audit_filter_matches_every_given_field() {
        let org = OrgId::new();
        let actor = UserId::new();
        let entry = AuditEntry::from_event(&AuditEvent::new(
            Some(org),
            actor,
            AuditAction::Update,
            AuditEntity::Membership,
            serde_json::json!({}),
        ));

        assert!(AuditFilter::default().matches(&entry));
        assert!(
            AuditFilter {
                org_id: Some(org),
                actor: Some(actor),
                action: Some(AuditAction::Update),
                ..Default::default()
            }
            .matches(&entry)
        );
        assert!(
            !AuditFilter {
                action: Some(AuditAction::Delete),
                ..Default::default()
            }
            .matches(&entry)
        );
        assert!(
            !AuditFilter {
                from: Some(entry.created_at + chrono::Duration::seconds(1)),
                ..Default::default()
            }
            .matches(&entry)
        );
    }
}
