use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::{Identity, Role};
use gabinete_core::{OrgId, TagId, VoterId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::{NewTag, Tag, TagPatch};

use super::{ServiceResult, Services};
use crate::store::TagStore;

// Admins manage the tag set; assessors attach and detach tags; any member
// reads them.
impl Services {
    pub async fn list_tags(&self, org_id: OrgId, caller: &Identity) -> ServiceResult<Vec<Tag>> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Viewer)
            .await?;
        Ok(self.store.list_tags(org_id).await?)
    }

    #[instrument(skip(self, input, caller), fields(caller = %caller.user_id), err)]
    pub async fn create_tag(&self, org_id: OrgId, input: NewTag, caller: &Identity) -> ServiceResult<Tag> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        let tag = Tag::create(org_id, input, Utc::now())?;
        self.store.insert_tag(&tag).await?;

        info!(%org_id, tag_id = %tag.id, "tag created");
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Create,
            AuditEntity::Tag,
            json!({ "tag_id": tag.id, "name": tag.name }),
        );
        Ok(tag)
    }

    #[instrument(skip(self, patch, caller), fields(caller = %caller.user_id), err)]
    pub async fn update_tag(
        &self,
        org_id: OrgId,
        tag_id: TagId,
        patch: TagPatch,
        caller: &Identity,
    ) -> ServiceResult<Tag> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        let tag = self.store.update_tag(org_id, tag_id, patch).await?;
        self.record(
            Some(org_id),
            caller.user_id,
            AuditAction::Update,
            AuditEntity::Tag,
            json!({ "tag_id": tag_id, "name": tag.name, "color": tag.color }),
        );
        Ok(tag)
    }

    /// Deleting an unknown tag succeeds without doing anything.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn delete_tag(&self, org_id: OrgId, tag_id: TagId, caller: &Identity) -> ServiceResult<()> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        if self.store.delete_tag(org_id, tag_id).await? {
            info!(%org_id, %tag_id, "tag deleted");
            self.record(
                Some(org_id),
                caller.user_id,
                AuditAction::Delete,
                AuditEntity::Tag,
                json!({ "tag_id": tag_id }),
            );
        }
        Ok(())
    }

    pub async fn tag_voter(
        &self,
        org_id: OrgId,
        voter_id: VoterId,
        tag_id: TagId,
        caller: &Identity,
    ) -> ServiceResult<()> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Assessor)
            .await?;
        Ok(self.store.tag_voter(org_id, voter_id, tag_id).await?)
    }

    pub async fn untag_voter(
        &self,
        org_id: OrgId,
        voter_id: VoterId,
        tag_id: TagId,
        caller: &Identity,
    ) -> ServiceResult<()> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Assessor)
            .await?;
        self.store.untag_voter(org_id, voter_id, tag_id).await?;
        Ok(())
    }

    pub async fn voter_tags(&self, org_id: OrgId, voter_id: VoterId, caller: &Identity) -> ServiceResult<Vec<Tag>> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Viewer)
            .await?;
        Ok(self.store.tags_of_voter(org_id, voter_id).await?)
    }
}
