use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::{Identity, Role};
use gabinete_core::{DomainError, OrgId, UserId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::normalize_email;

use super::{ServiceResult, Services, blocking};
use crate::password::{hash_password, validate_password};
use crate::store::{MemberView, MembershipStore, NewUser, ProfileStore};

/// Identity an org admin creates directly, with its initial role.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

impl Services {
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn list_members(&self, org_id: OrgId, caller: &Identity) -> ServiceResult<Vec<MemberView>> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;
        Ok(self.store.list_members(org_id).await?)
    }

    #[instrument(skip(self, input, caller), fields(caller = %caller.user_id), err)]
    pub async fn create_member(
        &self,
        org_id: OrgId,
        input: NewMember,
        caller: &Identity,
    ) -> ServiceResult<UserId> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        let email = normalize_email(&input.email);
        if !email.contains('@') {
            return Err(DomainError::validation("a valid email is required").into());
        }
        validate_password(&input.password)?;

        let password = input.password;
        let password_hash = blocking(move || hash_password(&password)).await??;
        let user = NewUser {
            user_id: UserId::new(),
            email: email.clone(),
            name: input.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            password_hash,
        };
        self.store
            .create_user_with_membership(&user, org_id, input.role, Utc::now())
            .await?;

        info!(%org_id, user_id = %user.user_id, role = %input.role, "member created");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Create,
            AuditEntity::Membership,
            json!({ "user_id": user.user_id, "email": email, "role": input.role }),
        );
        Ok(user.user_id)
    }

    /// Removing someone who is not a member succeeds without doing anything.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn remove_member(&self, org_id: OrgId, target: UserId, caller: &Identity) -> ServiceResult<()> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        if self.store.remove_member_guarded(org_id, target).await? {
            info!(%org_id, user_id = %target, "member removed");
            self.record(
                Some(org_id),
                caller.user_id,
                AuditAction::Delete,
                AuditEntity::Membership,
                json!({ "user_id": target }),
            );
        }
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn set_role(
        &self,
        org_id: OrgId,
        target: UserId,
        role: Role,
        caller: &Identity,
    ) -> ServiceResult<()> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;
        if target == caller.user_id {
            return Err(DomainError::SelfRoleChange.into());
        }

        let previous = self.store.set_role_guarded(org_id, target, role).await?;

        info!(%org_id, user_id = %target, %role, "member role set");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Update,
            AuditEntity::Membership,
            json!({ "user_id": target, "from": previous, "to": role }),
        );
        Ok(())
    }
}
