use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use gabinete_auth::Identity;
use gabinete_core::{DomainError, JoinRequestId, OrgId};
use gabinete_events::{AuditAction, AuditEntity};
use gabinete_orgs::{Decision, JoinCode, JoinRequest, JoinRequestStatus};

use super::{JOIN_CODE_ATTEMPTS, ServiceError, ServiceResult, Services};
use crate::store::{JoinRequestStore, JoinRequestView, OrganizationStore, ProfileStore, StoreError};

impl Services {
    /// Ask to join the organization that owns `code`.
    #[instrument(skip(self, code, note, caller), fields(caller = %caller.user_id), err)]
    pub async fn submit_join_request(
        &self,
        code: &str,
        note: Option<String>,
        caller: &Identity,
    ) -> ServiceResult<JoinRequestId> {
        let code = JoinCode::normalize(code)?;
        let org = self
            .store
            .find_org_by_code(&code)
            .await?
            .ok_or(DomainError::InvalidCode)?;

        self.store
            .ensure_profile(caller.user_id, caller.email.as_deref())
            .await?;

        let request = JoinRequest::submit(org.id, caller.user_id, note, Utc::now());
        self.store.submit_join_request(&request).await?;

        info!(org_id = %org.id, request_id = %request.id, "join request submitted");
        self.record(
            Some(org.id),
            caller.user_id,
            AuditAction::Create,
            AuditEntity::JoinRequest,
            json!({ "request_id": request.id }),
        );
        Ok(request.id)
    }

    /// Approve or deny a pending request. The gate is evaluated for the
    /// request's own organization; an unknown id is `Forbidden` to everyone
    /// but super-admins.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn decide_join_request(
        &self,
        request_id: JoinRequestId,
        decision: Decision,
        caller: &Identity,
    ) -> ServiceResult<JoinRequest> {
        let Some(pending) = self.store.get_join_request(request_id).await? else {
            self.authz.require_super_admin(caller.user_id).await?;
            return Err(DomainError::not_found("join request").into());
        };
        self.authz
            .require_org_admin(pending.org_id, caller.user_id)
            .await?;

        let decided = self
            .store
            .decide_join_request(request_id, decision, caller.user_id, Utc::now())
            .await?;

        let action = match decision {
            Decision::Approved => AuditAction::Approve,
            Decision::Denied => AuditAction::Deny,
        };
        info!(org_id = %decided.org_id, %request_id, %action, "join request decided");
        self.record(
            Some(decided.org_id),
            caller.user_id,
            action,
            AuditEntity::JoinRequest,
            json!({ "request_id": request_id, "requester": decided.requester }),
        );
        Ok(decided)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn list_join_requests(
        &self,
        org_id: OrgId,
        status: Option<JoinRequestStatus>,
        caller: &Identity,
    ) -> ServiceResult<Vec<JoinRequest>> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;
        Ok(self.store.list_join_requests(org_id, status).await?)
    }

    pub async fn my_join_requests(&self, caller: &Identity) -> ServiceResult<Vec<JoinRequestView>> {
        Ok(self.store.join_requests_of(caller.user_id).await?)
    }

    /// Replace the organization's join code; the old one stops resolving.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err)]
    pub async fn rotate_join_code(&self, org_id: OrgId, caller: &Identity) -> ServiceResult<JoinCode> {
        self.authz.require_org_admin(org_id, caller.user_id).await?;

        for attempt in 1..=JOIN_CODE_ATTEMPTS {
            let code = JoinCode::generate();
            match self.store.set_join_code(org_id, &code).await {
                Ok(()) => {
                    info!(%org_id, "join code rotated");
                    self.record(
                        Some(org_id),
                        caller.user_id,
                        AuditAction::Rotate,
                        AuditEntity::Organization,
                        json!({}),
                    );
                    return Ok(code);
                }
                Err(StoreError::Conflict(detail)) => {
                    tracing::debug!(attempt, %detail, "join code collision, drawing a new one");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::Internal(
            "could not allocate a unique join code".to_string(),
        ))
    }
}
