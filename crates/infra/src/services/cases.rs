use chrono::Utc;
use tracing::{info, instrument};

use gabinete_auth::{Identity, Role};
use gabinete_core::OrgId;
use gabinete_orgs::{Case, NewCase};

use super::{ServiceResult, Services};
use crate::store::CaseStore;

impl Services {
    /// Assessors and admins open cases.
    #[instrument(skip(self, input, caller), fields(caller = %caller.user_id), err)]
    pub async fn create_case(&self, org_id: OrgId, input: NewCase, caller: &Identity) -> ServiceResult<Case> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Assessor)
            .await?;

        let case = Case::open(org_id, input, caller.user_id, Utc::now())?;
        self.store.insert_case(&case).await?;
        info!(%org_id, case_id = %case.id, "case opened");
        Ok(case)
    }

    /// Any member may read the organization's cases.
    pub async fn list_cases(&self, org_id: OrgId, caller: &Identity) -> ServiceResult<Vec<Case>> {
        self.authz
            .require_role(org_id, caller.user_id, Role::Viewer)
            .await?;
        Ok(self.store.list_cases(org_id).await?)
    }
}
