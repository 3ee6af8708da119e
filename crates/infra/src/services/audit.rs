use chrono::{DateTime, Utc};
use serde::Deserialize;

use gabinete_auth::Identity;
use gabinete_core::{OrgId, UserId};
use gabinete_events::AuditAction;

use super::{ServiceError, ServiceResult, Services};
use crate::store::{AuditEntry, AuditFilter, AuditStore, Page, PageRequest};

/// Audit list parameters, as received from the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub org_id: Option<OrgId>,
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl Services {
    /// Super-admins see every entry (optionally narrowed to one
    /// organization); an org admin must name the organization and only sees
    /// that one.
    pub async fn list_audit(&self, query: AuditQuery, caller: &Identity) -> ServiceResult<Page<AuditEntry>> {
        let is_super = self.authz.is_super_admin(caller.user_id).await.map_err(|e| {
            ServiceError::Internal(e.to_string())
        })?;
        if !is_super {
            let org_id = query.org_id.ok_or(ServiceError::Forbidden)?;
            self.authz.require_org_admin(org_id, caller.user_id).await?;
        }

        let filter = AuditFilter {
            org_id: query.org_id,
            actor: query.actor,
            action: query.action,
            from: query.from,
            to: query.to,
        };
        let page = PageRequest::new(query.page, query.page_size);
        Ok(self.store.query_audit(&filter, page).await?)
    }
}
