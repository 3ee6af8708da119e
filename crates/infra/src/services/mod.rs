//! Lifecycle services.
//!
//! Each mutating operation runs exactly one authorization gate for the
//! organization named in the call, then performs a single store operation
//! (atomic where a rule spans a read and a write), then records an audit
//! event on the side channel.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use gabinete_auth::{Authorizer, AuthzError};
use gabinete_core::{DomainError, OrgId, UserId};
use gabinete_events::{AuditAction, AuditEntity, AuditEvent};

use crate::audit_sink::AuditSink;
use crate::directory::StoreDirectory;
use crate::password::HashError;
use crate::store::{Store, StoreError};

pub mod audit;
pub mod cases;
pub mod invitations;
pub mod join_requests;
pub mod members;
pub mod organizations;
pub mod sessions;
pub mod super_admin;
pub mod tags;
pub mod voters;

pub use audit::AuditQuery;
pub use invitations::{AcceptedInvitation, InvitationView, IssuedInvitation};
pub use members::NewMember;
pub use organizations::MembershipSummary;
pub use voters::VoterListParams;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden => ServiceError::Forbidden,
            AuthzError::Lookup(e) => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(e) => ServiceError::Domain(e),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<HashError> for ServiceError {
    fn from(err: HashError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

/// Run CPU-bound work (password hashing) on the blocking pool.
async fn blocking<T, F>(work: F) -> ServiceResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Internal(format!("blocking task failed: {e}")))
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Public base URL used to build invitation links.
    pub site_url: Option<String>,
    pub invite_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            invite_ttl: Duration::days(7),
        }
    }
}

/// Entry point for every lifecycle operation.
#[derive(Clone)]
pub struct Services {
    store: Arc<dyn Store>,
    authz: Authorizer<StoreDirectory>,
    audit: AuditSink,
    config: ServiceConfig,
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Attempts at drawing a fresh random join code before giving up.
const JOIN_CODE_ATTEMPTS: usize = 5;

impl Services {
    pub fn new(store: Arc<dyn Store>, audit: AuditSink, config: ServiceConfig) -> Self {
        Self {
            authz: Authorizer::new(StoreDirectory::new(store.clone())),
            store,
            audit,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn authorizer(&self) -> &Authorizer<StoreDirectory> {
        &self.authz
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn record(
        &self,
        org_id: Option<OrgId>,
        actor: UserId,
        action: AuditAction,
        entity: AuditEntity,
        details: serde_json::Value,
    ) {
        self.audit
            .record(AuditEvent::new(org_id, actor, action, entity, details));
    }
}
