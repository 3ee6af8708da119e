use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::{Identity, Role};
use gabinete_core::OrgId;
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::{JoinCode, NewOrganization, OfficeKind, Organization};

use super::{JOIN_CODE_ATTEMPTS, ServiceError, ServiceResult, Services};
use crate::store::{MembershipStore, OrganizationStore, Profile, ProfileStore, StoreError};

/// One of the caller's organizations. The join code is only shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipSummary {
    pub org_id: OrgId,
    pub name: String,
    pub office: OfficeKind,
    pub state: String,
    pub city: Option<String>,
    pub role: Role,
    pub join_code: Option<String>,
}

impl Services {
    /// Caller's profile, created on first call.
    pub async fn whoami(&self, caller: &Identity) -> ServiceResult<Profile> {
        Ok(self
            .store
            .ensure_profile(caller.user_id, caller.email.as_deref())
            .await?)
    }

    /// Any authenticated user may create an organization; the organization
    /// and the creator's admin membership are stored together or not at all.
    #[instrument(skip(self, input, creator), fields(creator = %creator.user_id), err)]
    pub async fn create_org_and_become_admin(
        &self,
        input: NewOrganization,
        creator: &Identity,
    ) -> ServiceResult<Organization> {
        let mut org = Organization::create(input, Utc::now())?;
        self.store
            .ensure_profile(creator.user_id, creator.email.as_deref())
            .await?;

        for attempt in 1..=JOIN_CODE_ATTEMPTS {
            match self.store.create_org_with_admin(&org, creator.user_id).await {
                Ok(()) => {
                    info!(org_id = %org.id, office = %org.office, "organization created");
                    self.record(
                        Some(org.id),
                        creator.user_id,
                        AuditAction::Create,
                        AuditEntity::Organization,
                        json!({ "name": org.name, "office": org.office, "state": org.state, "city": org.city }),
                    );
                    return Ok(org);
                }
                Err(StoreError::Conflict(detail)) => {
                    tracing::debug!(attempt, %detail, "join code collision, drawing a new one");
                    org.join_code = JoinCode::generate();
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::Internal(
            "could not allocate a unique join code".to_string(),
        ))
    }

    pub async fn my_memberships(&self, caller: &Identity) -> ServiceResult<Vec<MembershipSummary>> {
        let memberships = self.store.memberships_of(caller.user_id).await?;
        Ok(memberships
            .into_iter()
            .map(|m| MembershipSummary {
                org_id: m.org.id,
                name: m.org.name,
                office: m.org.office,
                state: m.org.state,
                city: m.org.city,
                join_code: m.role.is_admin().then(|| m.org.join_code.to_string()),
                role: m.role,
            })
            .collect())
    }

    /// Remove the caller's memberships and profile. Refused while the caller
    /// is the only admin of any organization.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id), err)]
    pub async fn delete_own_account(&self, caller: &Identity) -> ServiceResult<()> {
        self.store.delete_account(caller.user_id).await?;
        info!(user_id = %caller.user_id, "account deleted");
        self.record(
            None,
            caller.user_id,
            AuditAction::Delete,
            AuditEntity::Profile,
            json!({ "self": true }),
        );
        Ok(())
    }
}
