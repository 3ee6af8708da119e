use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::Identity;
use gabinete_core::{OrgId, UserId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::Organization;

use super::{ServiceResult, Services, blocking};
use crate::password::{hash_password, validate_password};
use crate::store::{OrganizationStore, ProfileStore, Stats};

// Cross-organization operations. The super-admin gate runs first and no
// membership is consulted.
impl Services {
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn delete_organization(&self, org_id: OrgId, caller: &Identity) -> ServiceResult<()> {
        self.authz.require_super_admin(caller.user_id).await?;

        self.store.delete_org_cascade(org_id).await?;

        info!(%org_id, "organization deleted");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Delete,
            AuditEntity::Organization,
            json!({
                "cascade": ["voters", "tags", "cases", "join_requests", "invitations", "memberships"]
            }),
        );
        Ok(())
    }

    #[instrument(skip(self, new_password, caller), fields(caller = %caller.user_id), err)]
    pub async fn reset_user_password(
        &self,
        user_id: UserId,
        new_password: &str,
        caller: &Identity,
    ) -> ServiceResult<()> {
        self.authz.require_super_admin(caller.user_id).await?;
        validate_password(new_password)?;

        let password = new_password.to_string();
        let hash = blocking(move || hash_password(&password)).await??;
        self.store.set_password_hash(user_id, &hash).await?;

        info!(%user_id, "password reset");
        self.record(
            None,
            caller.user_id,
            AuditAction::ResetPassword,
            AuditEntity::Profile,
            json!({ "user_id": user_id }),
        );
        Ok(())
    }

    pub async fn list_organizations(&self, caller: &Identity) -> ServiceResult<Vec<Organization>> {
        self.authz.require_super_admin(caller.user_id).await?;
        Ok(self.store.list_orgs().await?)
    }

    pub async fn stats(&self, caller: &Identity) -> ServiceResult<Stats> {
        self.authz.require_super_admin(caller.user_id).await?;
        Ok(self.store.stats().await?)
    }
}
