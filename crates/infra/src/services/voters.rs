use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::{Identity, Role};
use gabinete_core::{DomainError, OrgId, TagId, VoterId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::{NewVoter, Voter, VoterPatch};

use super::{ServiceResult, Services};
use crate::store::{Page, VoterQuery, VoterStore};

/// Voter listing input as it arrives from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterListParams {
    pub q: Option<String>,
    pub tag_id: Option<TagId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Services {
    /// Any member reads; newest first, 20 per page by default, 100 at most.
    pub async fn list_voters(
        &self,
        org_id: OrgId,
        params: VoterListParams,
        caller: &Identity,
    ) -> ServiceResult<Page<Voter>> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Viewer)
            .await?;
        let query = VoterQuery {
            q: params.q.filter(|q| !q.trim().is_empty()),
            tag_id: params.tag_id,
        };
        let page = VoterQuery::page(params.page, params.limit);
        Ok(self.store.list_voters(org_id, &query, page).await?)
    }

    pub async fn get_voter(&self, org_id: OrgId, voter_id: VoterId, caller: &Identity) -> ServiceResult<Voter> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Viewer)
            .await?;
        Ok(self
            .store
            .get_voter(org_id, voter_id)
            .await?
            .ok_or(DomainError::not_found("voter"))?)
    }

    #[instrument(skip(self, input, caller), fields(caller = %caller.user_id), err)]
    pub async fn create_voter(&self, org_id: OrgId, input: NewVoter, caller: &Identity) -> ServiceResult<Voter> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Assessor)
            .await?;

        let voter = Voter::register(org_id, input, caller.user_id, Utc::now())?;
        self.store.insert_voter(&voter).await?;

        info!(%org_id, voter_id = %voter.id, "voter registered");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Create,
            AuditEntity::Voter,
            json!({ "voter_id": voter.id }),
        );
        Ok(voter)
    }

    #[instrument(skip(self, patch, caller), fields(caller = %caller.user_id), err)]
    pub async fn update_voter(
        &self,
        org_id: OrgId,
        voter_id: VoterId,
        patch: VoterPatch,
        caller: &Identity,
    ) -> ServiceResult<Voter> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Assessor)
            .await?;

        let voter = self.store.update_voter(org_id, voter_id, patch).await?;
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Update,
            AuditEntity::Voter,
            json!({ "voter_id": voter_id }),
        );
        Ok(voter)
    }

    /// Deleting an unknown voter succeeds without doing anything.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn delete_voter(&self, org_id: OrgId, voter_id: VoterId, caller: &Identity) -> ServiceResult<()> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Assessor)
            .await?;

        if self.store.delete_voter(org_id, voter_id).await? {
            info!(%org_id, %voter_id, "voter deleted");
            self.record(
                Some(org_id),
                caller.user_id,
                AuditAction::Delete,
                AuditEntity::Voter,
                json!({ "voter_id": voter_id }),
            );
        }
        Ok(())
    }
}
