//! PostgreSQL-backed store.
//!
//! ## Atomicity
//!
//! Rules that read and then write run in one transaction. Membership changes
//! first lock every membership row of the organization with
//! `SELECT ... FOR UPDATE`, so two concurrent removals of the last two admins
//! serialize and the second one sees a single admin left. The duplicate
//! pending join-request check is backed by a partial unique index.
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` (or the domain rejection the index encodes) |
//! | Database (other) | any | `Storage` |
//! | PoolClosed / other | n/a | `Storage` |
//!
//! A unique violation on `profiles.email` surfaces as `EmailTaken` when
//! registering an identity; [`ProfileStore::ensure_profile`] instead retries
//! without the email.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use gabinete_auth::Role;
use gabinete_core::{AuditEntryId, CaseId, DomainError, JoinRequestId, OrgId, TagId, UserId, VoterId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::{
    AcceptCheck, Case, CaseStatus, Decision, Invitation, InviteToken, JoinCode, JoinRequest,
    JoinRequestStatus, OfficeKind, Organization, Tag, TagPatch, Voter, VoterPatch,
    ensure_admin_remains,
};

use super::{
    AuditEntry, AuditFilter, AuditStore, CaseStore, Credentials, InvitationStore, JoinRequestStore,
    JoinRequestView, MemberView, MembershipStore, MyMembership, NewUser, OrganizationStore, Page,
    PageRequest, Profile, ProfileStore, Stats, StoreError, StoreResult, TagStore, VoterQuery,
    VoterStore,
};

const SCHEMA: &str = include_str!("schema.sql");

const ORG_COLUMNS: &str = "o.id, o.name, o.office, o.state, o.city, o.join_code, o.created_at";
const INVITE_COLUMNS: &str = "token, org_id, email, role, expires_at, created_by, created_at";
const JOIN_COLUMNS: &str =
    "j.id, j.org_id, j.requester, j.note, j.status, j.created_at, j.decided_at, j.decided_by";
const PROFILE_COLUMNS: &str = "user_id, email, name, is_super_admin, created_at";
const VOTER_COLUMNS: &str = "v.id, v.org_id, v.name, v.phone, v.city, v.email, v.state, v.address, \
     v.zipcode, v.notes, v.created_by, v.created_at";
const TAG_COLUMNS: &str = "t.id, t.org_id, t.name, t.color, t.created_at";

/// PostgreSQL implementation of every store trait.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> StoreResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
}

/// Roll back and return the rejection.
async fn reject<T>(tx: Transaction<'_, Postgres>, err: impl Into<StoreError>) -> StoreResult<T> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))?;
    Err(err.into())
}

/// Lock the organization's membership rows and return (target role, admin count).
async fn lock_memberships(
    tx: &mut Transaction<'_, Postgres>,
    org_id: OrgId,
    user_id: UserId,
) -> StoreResult<(Option<Role>, usize)> {
    let rows = sqlx::query("SELECT user_id, role FROM memberships WHERE org_id = $1 FOR UPDATE")
        .bind(org_id.as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_memberships", e))?;

    let mut current = None;
    let mut admins = 0;
    for row in rows {
        let uid: Uuid = row.try_get("user_id").map_err(|e| map_sqlx_error("lock_memberships", e))?;
        let role = role_column(&row, "role").map_err(|e| map_sqlx_error("lock_memberships", e))?;
        if role.is_admin() {
            admins += 1;
        }
        if uid == *user_id.as_uuid() {
            current = Some(role);
        }
    }
    Ok((current, admins))
}

/// Guarded upsert inside an open transaction. Returns the previous role.
async fn upsert_guarded(
    tx: &mut Transaction<'_, Postgres>,
    org_id: OrgId,
    user_id: UserId,
    role: Role,
) -> StoreResult<Result<Option<Role>, DomainError>> {
    let (current, admins) = lock_memberships(tx, org_id, user_id).await?;
    if let Err(e) = ensure_admin_remains(current, Some(role), admins) {
        return Ok(Err(e));
    }
    sqlx::query(
        r#"
        INSERT INTO memberships (org_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (org_id, user_id) DO UPDATE SET role = EXCLUDED.role
        "#,
    )
    .bind(org_id.as_uuid())
    .bind(user_id.as_uuid())
    .bind(role.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("upsert_membership", e))?;
    Ok(Ok(current))
}

#[async_trait::async_trait]
impl OrganizationStore for PostgresStore {
    #[instrument(skip(self, org), fields(org_id = %org.id, admin = %admin), err)]
    async fn create_org_with_admin(&self, org: &Organization, admin: UserId) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orgs (id, name, office, state, city, join_code, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(org.id.as_uuid())
        .bind(&org.name)
        .bind(org.office.as_str())
        .bind(&org.state)
        .bind(org.city.as_deref())
        .bind(org.join_code.as_str())
        .bind(org.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_org", e))?;

        sqlx::query(
            "INSERT INTO memberships (org_id, user_id, role, created_at) VALUES ($1, $2, 'admin', $3)",
        )
        .bind(org.id.as_uuid())
        .bind(admin.as_uuid())
        .bind(org.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_admin_membership", e))?;

        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn get_org(&self, org_id: OrgId) -> StoreResult<Option<Organization>> {
        let row = sqlx::query(&format!("SELECT {ORG_COLUMNS} FROM orgs o WHERE o.id = $1"))
            .bind(org_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_org", e))?;
        row.map(|r| org_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_org", e))
    }

    #[instrument(skip(self), err)]
    async fn find_org_by_code(&self, code: &JoinCode) -> StoreResult<Option<Organization>> {
        let row = sqlx::query(&format!("SELECT {ORG_COLUMNS} FROM orgs o WHERE o.join_code = $1"))
            .bind(code.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_org_by_code", e))?;
        row.map(|r| org_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_org", e))
    }

    #[instrument(skip(self), err)]
    async fn set_join_code(&self, org_id: OrgId, code: &JoinCode) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orgs SET join_code = $2 WHERE id = $1")
            .bind(org_id.as_uuid())
            .bind(code.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_join_code", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("organization").into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_orgs(&self) -> StoreResult<Vec<Organization>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORG_COLUMNS} FROM orgs o ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orgs", e))?;
        rows.iter()
            .map(org_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_org", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_org_cascade(&self, org_id: OrgId) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let exists = sqlx::query("SELECT id FROM orgs WHERE id = $1 FOR UPDATE")
            .bind(org_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_org", e))?;
        if exists.is_none() {
            return reject(tx, DomainError::not_found("organization")).await;
        }

        for (operation, sql) in [
            (
                "delete_voter_tags",
                "DELETE FROM voter_tags WHERE voter_id IN (SELECT id FROM voters WHERE org_id = $1)",
            ),
            ("delete_voters", "DELETE FROM voters WHERE org_id = $1"),
            ("delete_tags", "DELETE FROM tags WHERE org_id = $1"),
            ("delete_cases", "DELETE FROM cases WHERE org_id = $1"),
            ("delete_join_requests", "DELETE FROM join_requests WHERE org_id = $1"),
            ("delete_invitations", "DELETE FROM invitations WHERE org_id = $1"),
            ("delete_memberships", "DELETE FROM memberships WHERE org_id = $1"),
            ("delete_org", "DELETE FROM orgs WHERE id = $1"),
        ] {
            sqlx::query(sql)
                .bind(org_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
        }

        commit(tx).await
    }
}

#[async_trait::async_trait]
impl MembershipStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn role_of(&self, org_id: OrgId, user_id: UserId) -> StoreResult<Option<Role>> {
        let row = sqlx::query("SELECT role FROM memberships WHERE org_id = $1 AND user_id = $2")
            .bind(org_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_of", e))?;
        row.map(|r| role_column(&r, "role"))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_role", e))
    }

    #[instrument(skip(self), err)]
    async fn list_members(&self, org_id: OrgId) -> StoreResult<Vec<MemberView>> {
        let rows = sqlx::query(
            r#"
            SELECT m.user_id, m.role, m.created_at, p.email, p.name
            FROM memberships m
            LEFT JOIN profiles p ON p.user_id = m.user_id
            WHERE m.org_id = $1
            ORDER BY m.created_at DESC, m.user_id DESC
            "#,
        )
        .bind(org_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_members", e))?;

        rows.iter()
            .map(|row| {
                Ok(MemberView {
                    user_id: UserId::from_uuid(row.try_get("user_id")?),
                    email: row.try_get("email")?,
                    name: row.try_get("name")?,
                    role: role_column(row, "role")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_member", e))
    }

    #[instrument(skip(self), err)]
    async fn memberships_of(&self, user_id: UserId) -> StoreResult<Vec<MyMembership>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORG_COLUMNS}, m.role
            FROM memberships m
            JOIN orgs o ON o.id = m.org_id
            WHERE m.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("memberships_of", e))?;

        rows.iter()
            .map(|row| {
                Ok(MyMembership {
                    org: org_from_row(row)?,
                    role: role_column(row, "role")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_membership", e))
    }

    #[instrument(skip(self), err)]
    async fn set_role_guarded(
        &self,
        org_id: OrgId,
        user_id: UserId,
        role: Role,
    ) -> StoreResult<Option<Role>> {
        let mut tx = self.begin().await?;
        match upsert_guarded(&mut tx, org_id, user_id, role).await? {
            Ok(previous) => {
                commit(tx).await?;
                Ok(previous)
            }
            Err(rejection) => reject(tx, rejection).await,
        }
    }

    #[instrument(skip(self), err)]
    async fn remove_member_guarded(&self, org_id: OrgId, user_id: UserId) -> StoreResult<bool> {
        let mut tx = self.begin().await?;
        let (current, admins) = lock_memberships(&mut tx, org_id, user_id).await?;
        if current.is_none() {
            commit(tx).await?;
            return Ok(false);
        }
        if let Err(rejection) = ensure_admin_remains(current, None, admins) {
            return reject(tx, rejection).await;
        }

        sqlx::query("DELETE FROM memberships WHERE org_id = $1 AND user_id = $2")
            .bind(org_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_membership", e))?;

        commit(tx).await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl InvitationStore for PostgresStore {
    #[instrument(skip(self, invitation), fields(org_id = %invitation.org_id), err)]
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO invitations ({INVITE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(invitation.token.as_str())
        .bind(invitation.org_id.as_uuid())
        .bind(&invitation.email)
        .bind(invitation.role.as_str())
        .bind(invitation.expires_at)
        .bind(invitation.created_by.as_uuid())
        .bind(invitation.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_invitation", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_invitations(&self, org_id: OrgId) -> StoreResult<Vec<Invitation>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVITE_COLUMNS} FROM invitations WHERE org_id = $1 ORDER BY created_at DESC"
        ))
        .bind(org_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_invitations", e))?;
        rows.iter()
            .map(invitation_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_invitation", e))
    }

    #[instrument(skip(self, token), err)]
    async fn delete_invitation(&self, token: &InviteToken, org_id: OrgId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM invitations WHERE token = $1 AND org_id = $2")
            .bind(token.as_str())
            .bind(org_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_invitation", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, token, check), err)]
    async fn accept_invitation(
        &self,
        token: &InviteToken,
        user_id: UserId,
        check: AcceptCheck<'_>,
    ) -> StoreResult<Invitation> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {INVITE_COLUMNS} FROM invitations WHERE token = $1 FOR UPDATE"
        ))
        .bind(token.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_invitation", e))?;

        let Some(row) = row else {
            return reject(tx, DomainError::not_found("invitation")).await;
        };
        let invitation = invitation_from_row(&row).map_err(|e| map_sqlx_error("decode_invitation", e))?;

        if let Err(rejection) = invitation.check_acceptable(check) {
            return reject(tx, rejection).await;
        }
        if let Err(rejection) =
            upsert_guarded(&mut tx, invitation.org_id, user_id, invitation.role).await?
        {
            return reject(tx, rejection).await;
        }

        sqlx::query("DELETE FROM invitations WHERE token = $1")
            .bind(token.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("consume_invitation", e))?;

        commit(tx).await?;
        Ok(invitation)
    }
}

#[async_trait::async_trait]
impl JoinRequestStore for PostgresStore {
    #[instrument(skip(self, request), fields(org_id = %request.org_id, requester = %request.requester), err)]
    async fn submit_join_request(&self, request: &JoinRequest) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let member = sqlx::query("SELECT 1 FROM memberships WHERE org_id = $1 AND user_id = $2")
            .bind(request.org_id.as_uuid())
            .bind(request.requester.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("check_membership", e))?;
        if member.is_some() {
            return reject(tx, DomainError::AlreadyMember).await;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO join_requests (id, org_id, requester, note, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.org_id.as_uuid())
        .bind(request.requester.as_uuid())
        .bind(request.note.as_deref())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => commit(tx).await,
            Err(e) if is_unique_violation(&e) => reject(tx, DomainError::DuplicatePending).await,
            Err(e) => Err(map_sqlx_error("insert_join_request", e)),
        }
    }

    #[instrument(skip(self), err)]
    async fn get_join_request(&self, id: JoinRequestId) -> StoreResult<Option<JoinRequest>> {
        let row = sqlx::query(&format!("SELECT {JOIN_COLUMNS} FROM join_requests j WHERE j.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_join_request", e))?;
        row.map(|r| join_request_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_join_request", e))
    }

    #[instrument(skip(self), err)]
    async fn decide_join_request(
        &self,
        id: JoinRequestId,
        decision: Decision,
        by: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinRequest> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {JOIN_COLUMNS} FROM join_requests j WHERE j.id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_join_request", e))?;
        let Some(row) = row else {
            return reject(tx, DomainError::not_found("join request")).await;
        };
        let mut request =
            join_request_from_row(&row).map_err(|e| map_sqlx_error("decode_join_request", e))?;

        if let Err(rejection) = request.decide(decision, by, now) {
            return reject(tx, rejection).await;
        }

        sqlx::query(
            "UPDATE join_requests SET status = $2, decided_at = $3, decided_by = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(request.status.as_str())
        .bind(now)
        .bind(by.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_join_request", e))?;

        if decision == Decision::Approved {
            sqlx::query(
                r#"
                INSERT INTO memberships (org_id, user_id, role, created_at)
                VALUES ($1, $2, 'viewer', $3)
                ON CONFLICT (org_id, user_id) DO NOTHING
                "#,
            )
            .bind(request.org_id.as_uuid())
            .bind(request.requester.as_uuid())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("approve_membership", e))?;
        }

        commit(tx).await?;
        Ok(request)
    }

    #[instrument(skip(self), err)]
    async fn list_join_requests(
        &self,
        org_id: OrgId,
        status: Option<JoinRequestStatus>,
    ) -> StoreResult<Vec<JoinRequest>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOIN_COLUMNS} FROM join_requests j
            WHERE j.org_id = $1 AND ($2::text IS NULL OR j.status = $2)
            ORDER BY j.created_at ASC, j.id ASC
            "#
        ))
        .bind(org_id.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_join_requests", e))?;
        rows.iter()
            .map(join_request_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_join_request", e))
    }

    #[instrument(skip(self), err)]
    async fn join_requests_of(&self, user_id: UserId) -> StoreResult<Vec<JoinRequestView>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOIN_COLUMNS}, o.name AS org_name
            FROM join_requests j
            JOIN orgs o ON o.id = j.org_id
            WHERE j.requester = $1
            ORDER BY j.created_at DESC, j.id DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("join_requests_of", e))?;
        rows.iter()
            .map(|row| {
                Ok(JoinRequestView {
                    request: join_request_from_row(row)?,
                    org_name: row.try_get("org_name")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_join_request", e))
    }
}

#[async_trait::async_trait]
impl AuditStore for PostgresStore {
    #[instrument(skip(self, entry), fields(action = %entry.action, entity = entry.entity.as_str()), err)]
    async fn append_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, org_id, actor, action, entity, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.org_id.map(Uuid::from))
        .bind(entry.actor.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn query_audit(&self, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEntry>> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR org_id = $1)
              AND ($2::uuid IS NULL OR actor = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_log {WHERE}"))
            .bind(filter.org_id.map(Uuid::from))
            .bind(filter.actor.map(Uuid::from))
            .bind(filter.action.map(|a| a.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_audit", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, org_id, actor, action, entity, details, created_at
            FROM audit_log {WHERE}
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.org_id.map(Uuid::from))
        .bind(filter.actor.map(Uuid::from))
        .bind(filter.action.map(|a| a.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(i64::from(page.page_size))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_audit", e))?;

        let items = rows
            .iter()
            .map(audit_entry_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_audit_entry", e))?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
            page: page.page,
            page_size: page.page_size,
        })
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgresStore {
    #[instrument(skip(self, email), err)]
    async fn ensure_profile(&self, user_id: UserId, email: Option<&str>) -> StoreResult<Profile> {
        let sql = format!(
            r#"
            INSERT INTO profiles (user_id, email) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET email = COALESCE(profiles.email, EXCLUDED.email)
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let first = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .bind(email)
            .fetch_one(&*self.pool)
            .await;

        // user_id conflicts are absorbed above; a unique violation here is
        // the email belonging to another profile.
        let row = match first {
            Ok(row) => row,
            Err(e) if email.is_some() && is_unique_violation(&e) => sqlx::query(&sql)
                .bind(user_id.as_uuid())
                .bind(None::<&str>)
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_profile", e))?,
            Err(e) => return Err(map_sqlx_error("ensure_profile", e)),
        };
        profile_from_row(&row).map_err(|e| map_sqlx_error("decode_profile", e))
    }

    #[instrument(skip(self), err)]
    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"))
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_profile", e))?;
        row.map(|r| profile_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_profile", e))
    }

    #[instrument(skip(self), err)]
    async fn is_super_admin(&self, user_id: UserId) -> StoreResult<bool> {
        let flag: Option<bool> =
            sqlx::query_scalar("SELECT is_super_admin FROM profiles WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("is_super_admin", e))?;
        Ok(flag.unwrap_or(false))
    }

    #[instrument(skip(self), err)]
    async fn set_super_admin(&self, user_id: UserId, flag: bool) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, is_super_admin) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET is_super_admin = EXCLUDED.is_super_admin
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(flag)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_super_admin", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id), err)]
    async fn create_user_with_membership(
        &self,
        user: &NewUser,
        org_id: OrgId,
        role: Role,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let org = sqlx::query("SELECT id FROM orgs WHERE id = $1 FOR SHARE")
            .bind(org_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_org", e))?;
        if org.is_none() {
            return reject(tx, DomainError::not_found("organization")).await;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO profiles (user_id, email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.email)
        .bind(user.name.as_deref())
        .bind(&user.password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return reject(tx, DomainError::EmailTaken).await,
            Err(e) => return Err(map_sqlx_error("create_user", e)),
        }

        if let Err(rejection) = upsert_guarded(&mut tx, org_id, user.user_id, role).await? {
            return reject(tx, rejection).await;
        }
        commit(tx).await
    }

    #[instrument(skip(self, email), err)]
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let row = sqlx::query("SELECT user_id, password_hash FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_credentials", e))?;
        row.map(|r| {
            Ok::<_, sqlx::Error>(Credentials {
                user_id: UserId::from_uuid(r.try_get("user_id")?),
                password_hash: r.try_get("password_hash")?,
            })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("decode_credentials", e))
    }

    #[instrument(skip(self, hash), err)]
    async fn set_password_hash(&self, user_id: UserId, hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE profiles SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .bind(hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password_hash", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user").into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_account(&self, user_id: UserId) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let admin_of: Vec<Uuid> = sqlx::query_scalar(
            "SELECT org_id FROM memberships WHERE user_id = $1 AND role = 'admin' ORDER BY org_id",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("admin_memberships", e))?;

        for org in admin_of {
            let (current, admins) = lock_memberships(&mut tx, OrgId::from_uuid(org), user_id).await?;
            if let Err(rejection) = ensure_admin_remains(current, None, admins) {
                return reject(tx, rejection).await;
            }
        }

        for (operation, sql) in [
            ("delete_memberships", "DELETE FROM memberships WHERE user_id = $1"),
            ("delete_join_requests", "DELETE FROM join_requests WHERE requester = $1"),
            ("delete_profile", "DELETE FROM profiles WHERE user_id = $1"),
        ] {
            sqlx::query(sql)
                .bind(user_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(operation, e))?;
        }

        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn stats(&self) -> StoreResult<Stats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM orgs) AS organizations,
                (SELECT COUNT(*) FROM profiles) AS profiles,
                (SELECT COUNT(*) FROM memberships) AS memberships,
                (SELECT COUNT(*) FROM cases) AS cases,
                (SELECT COUNT(*) FROM voters) AS voters
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stats", e))?;

        let count = |col: &str| -> Result<u64, sqlx::Error> {
            Ok(row.try_get::<i64, _>(col)?.max(0) as u64)
        };
        Ok(Stats {
            organizations: count("organizations").map_err(|e| map_sqlx_error("stats", e))?,
            profiles: count("profiles").map_err(|e| map_sqlx_error("stats", e))?,
            memberships: count("memberships").map_err(|e| map_sqlx_error("stats", e))?,
            cases: count("cases").map_err(|e| map_sqlx_error("stats", e))?,
            voters: count("voters").map_err(|e| map_sqlx_error("stats", e))?,
        })
    }
}

#[async_trait::async_trait]
impl CaseStore for PostgresStore {
    #[instrument(skip(self, case), fields(org_id = %case.org_id), err)]
    async fn insert_case(&self, case: &Case) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cases (id, org_id, title, description, status, due_at, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(case.id.as_uuid())
        .bind(case.org_id.as_uuid())
        .bind(&case.title)
        .bind(case.description.as_deref())
        .bind(case.status.as_str())
        .bind(case.due_at)
        .bind(case.created_by.as_uuid())
        .bind(case.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_case", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_cases(&self, org_id: OrgId) -> StoreResult<Vec<Case>> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, title, description, status, due_at, created_by, created_at
            FROM cases WHERE org_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(org_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_cases", e))?;

        rows.iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                Ok(Case {
                    id: CaseId::from_uuid(row.try_get("id")?),
                    org_id: OrgId::from_uuid(row.try_get("org_id")?),
                    title: row.try_get("title")?,
                    description: row.try_get("description")?,
                    status: decode(CaseStatus::parse(&status))?,
                    due_at: row.try_get("due_at")?,
                    created_by: UserId::from_uuid(row.try_get("created_by")?),
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_case", e))
    }
}

/// Lock a voter row of the organization inside an open transaction.
async fn lock_voter(
    tx: &mut Transaction<'_, Postgres>,
    org_id: OrgId,
    voter_id: VoterId,
) -> StoreResult<Option<Voter>> {
    let row = sqlx::query(&format!(
        "SELECT {VOTER_COLUMNS} FROM voters v WHERE v.id = $1 AND v.org_id = $2 FOR UPDATE"
    ))
    .bind(voter_id.as_uuid())
    .bind(org_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_voter", e))?;
    row.map(|r| voter_from_row(&r))
        .transpose()
        .map_err(|e| map_sqlx_error("decode_voter", e))
}

async fn lock_tag(
    tx: &mut Transaction<'_, Postgres>,
    org_id: OrgId,
    tag_id: TagId,
) -> StoreResult<Option<Tag>> {
    let row = sqlx::query(&format!(
        "SELECT {TAG_COLUMNS} FROM tags t WHERE t.id = $1 AND t.org_id = $2 FOR UPDATE"
    ))
    .bind(tag_id.as_uuid())
    .bind(org_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_tag", e))?;
    row.map(|r| tag_from_row(&r))
        .transpose()
        .map_err(|e| map_sqlx_error("decode_tag", e))
}

/// `%term%` for ILIKE, with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

#[async_trait::async_trait]
impl VoterStore for PostgresStore {
    #[instrument(skip(self, voter), fields(org_id = %voter.org_id), err)]
    async fn insert_voter(&self, voter: &Voter) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO voters (id, org_id, name, phone, city, email, state, address, zipcode, notes,
                                created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(voter.id.as_uuid())
        .bind(voter.org_id.as_uuid())
        .bind(&voter.name)
        .bind(&voter.phone)
        .bind(&voter.city)
        .bind(voter.email.as_deref())
        .bind(voter.state.as_deref())
        .bind(voter.address.as_deref())
        .bind(voter.zipcode.as_deref())
        .bind(voter.notes.as_deref())
        .bind(voter.created_by.as_uuid())
        .bind(voter.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_voter", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<Option<Voter>> {
        let row = sqlx::query(&format!(
            "SELECT {VOTER_COLUMNS} FROM voters v WHERE v.id = $1 AND v.org_id = $2"
        ))
        .bind(voter_id.as_uuid())
        .bind(org_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_voter", e))?;
        row.map(|r| voter_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_voter", e))
    }

    #[instrument(skip(self), err)]
    async fn list_voters(
        &self,
        org_id: OrgId,
        query: &VoterQuery,
        page: PageRequest,
    ) -> StoreResult<Page<Voter>> {
        const WHERE: &str = r#"
            WHERE v.org_id = $1
              AND ($2::text IS NULL
                   OR v.name ILIKE $2 OR v.phone ILIKE $2 OR v.email ILIKE $2 OR v.city ILIKE $2)
              AND ($3::uuid IS NULL
                   OR EXISTS (SELECT 1 FROM voter_tags vt WHERE vt.voter_id = v.id AND vt.tag_id = $3))
        "#;
        let pattern = query.q.as_deref().and_then(like_pattern);
        let tag = query.tag_id.map(Uuid::from);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM voters v {WHERE}"))
            .bind(org_id.as_uuid())
            .bind(pattern.as_deref())
            .bind(tag)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_voters", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {VOTER_COLUMNS} FROM voters v {WHERE}
            ORDER BY v.created_at DESC, v.id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(org_id.as_uuid())
        .bind(pattern.as_deref())
        .bind(tag)
        .bind(i64::from(page.page_size))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_voters", e))?;

        let items = rows
            .iter()
            .map(voter_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_voter", e))?;
        Ok(Page {
            items,
            total: total.max(0) as u64,
            page: page.page,
            page_size: page.page_size,
        })
    }

    #[instrument(skip(self, patch), err)]
    async fn update_voter(&self, org_id: OrgId, voter_id: VoterId, patch: VoterPatch) -> StoreResult<Voter> {
        let mut tx = self.begin().await?;
        let Some(mut voter) = lock_voter(&mut tx, org_id, voter_id).await? else {
            return reject(tx, DomainError::not_found("voter")).await;
        };
        if let Err(rejection) = voter.apply(patch) {
            return reject(tx, rejection).await;
        }

        sqlx::query(
            r#"
            UPDATE voters
            SET name = $2, phone = $3, city = $4, email = $5, state = $6, address = $7,
                zipcode = $8, notes = $9
            WHERE id = $1
            "#,
        )
        .bind(voter.id.as_uuid())
        .bind(&voter.name)
        .bind(&voter.phone)
        .bind(&voter.city)
        .bind(voter.email.as_deref())
        .bind(voter.state.as_deref())
        .bind(voter.address.as_deref())
        .bind(voter.zipcode.as_deref())
        .bind(voter.notes.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_voter", e))?;

        commit(tx).await?;
        Ok(voter)
    }

    #[instrument(skip(self), err)]
    async fn delete_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM voters WHERE id = $1 AND org_id = $2")
            .bind(voter_id.as_uuid())
            .bind(org_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_voter", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl TagStore for PostgresStore {
    #[instrument(skip(self, tag), fields(org_id = %tag.org_id), err)]
    async fn insert_tag(&self, tag: &Tag) -> StoreResult<()> {
        sqlx::query("INSERT INTO tags (id, org_id, name, color, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(tag.id.as_uuid())
            .bind(tag.org_id.as_uuid())
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(tag.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_tag", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_tags(&self, org_id: OrgId) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query(&format!(
            "SELECT {TAG_COLUMNS} FROM tags t WHERE t.org_id = $1 ORDER BY t.created_at DESC, t.id DESC"
        ))
        .bind(org_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tags", e))?;
        rows.iter()
            .map(tag_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_tag", e))
    }

    #[instrument(skip(self, patch), err)]
    async fn update_tag(&self, org_id: OrgId, tag_id: TagId, patch: TagPatch) -> StoreResult<Tag> {
        let mut tx = self.begin().await?;
        let Some(mut tag) = lock_tag(&mut tx, org_id, tag_id).await? else {
            return reject(tx, DomainError::not_found("tag")).await;
        };
        if let Err(rejection) = tag.apply(patch) {
            return reject(tx, rejection).await;
        }

        sqlx::query("UPDATE tags SET name = $2, color = $3 WHERE id = $1")
            .bind(tag.id.as_uuid())
            .bind(&tag.name)
            .bind(&tag.color)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_tag", e))?;

        commit(tx).await?;
        Ok(tag)
    }

    #[instrument(skip(self), err)]
    async fn delete_tag(&self, org_id: OrgId, tag_id: TagId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND org_id = $2")
            .bind(tag_id.as_uuid())
            .bind(org_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tag", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn tag_voter(&self, org_id: OrgId, voter_id: VoterId, tag_id: TagId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        if lock_voter(&mut tx, org_id, voter_id).await?.is_none() {
            return reject(tx, DomainError::not_found("voter")).await;
        }
        if lock_tag(&mut tx, org_id, tag_id).await?.is_none() {
            return reject(tx, DomainError::not_found("tag")).await;
        }

        sqlx::query("INSERT INTO voter_tags (voter_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(voter_id.as_uuid())
            .bind(tag_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("tag_voter", e))?;

        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn untag_voter(&self, org_id: OrgId, voter_id: VoterId, tag_id: TagId) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM voter_tags vt USING voters v
            WHERE vt.voter_id = v.id AND v.org_id = $1 AND vt.voter_id = $2 AND vt.tag_id = $3
            "#,
        )
        .bind(org_id.as_uuid())
        .bind(voter_id.as_uuid())
        .bind(tag_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("untag_voter", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn tags_of_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<Vec<Tag>> {
        if self.get_voter(org_id, voter_id).await?.is_none() {
            return Err(DomainError::not_found("voter").into());
        }
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TAG_COLUMNS}
            FROM voter_tags vt
            JOIN tags t ON t.id = vt.tag_id
            WHERE vt.voter_id = $1
            ORDER BY t.name ASC, t.id ASC
            "#
        ))
        .bind(voter_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tags_of_voter", e))?;
        rows.iter()
            .map(tag_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_tag", e))
    }
}

// Row decoding

fn decode<T>(result: Result<T, DomainError>) -> Result<T, sqlx::Error> {
    result.map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn role_column(row: &PgRow, column: &str) -> Result<Role, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    decode(raw.parse())
}

fn org_from_row(row: &PgRow) -> Result<Organization, sqlx::Error> {
    let office: String = row.try_get("office")?;
    let state: String = row.try_get("state")?;
    Ok(Organization {
        id: OrgId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        office: decode(office.parse::<OfficeKind>())?,
        state: state.trim().to_string(),
        city: row.try_get("city")?,
        join_code: JoinCode::from_stored(row.try_get("join_code")?),
        created_at: row.try_get("created_at")?,
    })
}

fn invitation_from_row(row: &PgRow) -> Result<Invitation, sqlx::Error> {
    Ok(Invitation {
        token: InviteToken::from_string(row.try_get::<String, _>("token")?),
        org_id: OrgId::from_uuid(row.try_get("org_id")?),
        email: row.try_get("email")?,
        role: role_column(row, "role")?,
        expires_at: row.try_get("expires_at")?,
        created_by: UserId::from_uuid(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
    })
}

fn join_request_from_row(row: &PgRow) -> Result<JoinRequest, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let decided_by: Option<Uuid> = row.try_get("decided_by")?;
    Ok(JoinRequest {
        id: JoinRequestId::from_uuid(row.try_get("id")?),
        org_id: OrgId::from_uuid(row.try_get("org_id")?),
        requester: UserId::from_uuid(row.try_get("requester")?),
        note: row.try_get("note")?,
        status: decode(JoinRequestStatus::parse(&status))?,
        created_at: row.try_get("created_at")?,
        decided_at: row.try_get("decided_at")?,
        decided_by: decided_by.map(UserId::from_uuid),
    })
}

fn profile_from_row(row: &PgRow) -> Result<Profile, sqlx::Error> {
    Ok(Profile {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        is_super_admin: row.try_get("is_super_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn voter_from_row(row: &PgRow) -> Result<Voter, sqlx::Error> {
    Ok(Voter {
        id: VoterId::from_uuid(row.try_get("id")?),
        org_id: OrgId::from_uuid(row.try_get("org_id")?),
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        city: row.try_get("city")?,
        email: row.try_get("email")?,
        state: row.try_get("state")?,
        address: row.try_get("address")?,
        zipcode: row.try_get("zipcode")?,
        notes: row.try_get("notes")?,
        created_by: UserId::from_uuid(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
    })
}

fn tag_from_row(row: &PgRow) -> Result<Tag, sqlx::Error> {
    Ok(Tag {
        id: TagId::from_uuid(row.try_get("id")?),
        org_id: OrgId::from_uuid(row.try_get("org_id")?),
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
    })
}

fn audit_entry_from_row(row: &PgRow) -> Result<AuditEntry, sqlx::Error> {
    let action: String = row.try_get("action")?;
    let entity: String = row.try_get("entity")?;
    let org_id: Option<Uuid> = row.try_get("org_id")?;
    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(row.try_get("id")?),
        org_id: org_id.map(OrgId::from_uuid),
        actor: UserId::from_uuid(row.try_get("actor")?),
        action: decode(action.parse::<AuditAction>())?,
        entity: AuditEntity::parse(&entity).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown audit entity '{entity}'").into())
        })?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("  "), None);
        assert_eq!(like_pattern(" silva ").as_deref(), Some("%silva%"));
        assert_eq!(like_pattern("50%_off").as_deref(), Some(r"%50\%\_off%"));
        assert_eq!(like_pattern(r"a\b").as_deref(), Some(r"%a\\b%"));
    }
}
