use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::{Identity, Role};
use gabinete_core::{DomainError, OrgId, UserId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::{AcceptCheck, Invitation, InviteToken};

use super::{ServiceResult, Services};
use crate::store::{InvitationStore, ProfileStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvitation {
    pub token: InviteToken,
    pub link: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationView {
    pub token: InviteToken,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub link: Option<String>,
    pub expired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcceptedInvitation {
    pub org_id: OrgId,
    pub role: Role,
}

impl Services {
    #[instrument(skip(self, email, caller), fields(caller = %caller.user_id), err)]
    pub async fn create_invitation(
        &self,
        org_id: OrgId,
        email: &str,
        role: Role,
        caller: &Identity,
    ) -> ServiceResult<IssuedInvitation> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        let invitation = Invitation::issue(
            org_id,
            email,
            role,
            caller.user_id,
            Utc::now(),
            self.config.invite_ttl,
        )?;
        self.store.insert_invitation(&invitation).await?;

        info!(%org_id, %role, expires_at = %invitation.expires_at, "invitation created");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Create,
            AuditEntity::Invitation,
            json!({ "email": invitation.email, "role": role }),
        );

        Ok(IssuedInvitation {
            link: invitation.link(self.config.site_url.as_deref()),
            token: invitation.token,
            expires_at: invitation.expires_at,
        })
    }

    /// Every invitation of the organization, expired ones included.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn list_invitations(&self, org_id: OrgId, caller: &Identity) -> ServiceResult<Vec<InvitationView>> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        let now = Utc::now();
        let site_url = self.config.site_url.as_deref();
        Ok(self
            .store
            .list_invitations(org_id)
            .await?
            .into_iter()
            .map(|inv| InvitationView {
                link: inv.link(site_url),
                expired: inv.is_expired(now),
                token: inv.token,
                email: inv.email,
                role: inv.role,
                expires_at: inv.expires_at,
                created_by: inv.created_by,
                created_at: inv.created_at,
            })
            .collect())
    }

    #[instrument(skip(self, token, caller), fields(caller = %caller.user_id), err)]
    pub async fn cancel_invitation(
        &self,
        token: &InviteToken,
        org_id: OrgId,
        caller: &Identity,
    ) -> ServiceResult<()> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        if !self.store.delete_invitation(token, org_id).await? {
            return Err(DomainError::not_found("invitation").into());
        }
        info!(%org_id, "invitation cancelled");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Delete,
            AuditEntity::Invitation,
            json!({}),
        );
        Ok(())
    }

    /// Any authenticated caller holding the token may accept, provided the
    /// invitation is live, matches `org_hint` when given, and was issued to
    /// the caller's email.
    #[instrument(skip(self, token, caller), fields(caller = %caller.user_id), err)]
    pub async fn accept_invitation(
        &self,
        token: &InviteToken,
        caller: &Identity,
        org_hint: Option<OrgId>,
    ) -> ServiceResult<AcceptedInvitation> {
        self.store
            .ensure_profile(caller.user_id, caller.email.as_deref())
            .await?;

        let check = AcceptCheck {
            now: Utc::now(),
            org_hint,
            caller_email: caller.email.as_deref(),
        };
        let invitation = self
            .store
            .accept_invitation(token, caller.user_id, check)
            .await?;

        info!(org_id = %invitation.org_id, role = %invitation.role, "invitation accepted");
        self.record(
            Some(invitation.org_id),
            caller.user_id,
            AuditAction::Accept,
            AuditEntity::Invitation,
            json!({ "email": invitation.email, "role": invitation.role }),
        );
        Ok(AcceptedInvitation {
            org_id: invitation.org_id,
            role: invitation.role,
        })
    }
}
