use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use gabinete_core::{OrgId, UserId};

use crate::Role;

/// The directory could not answer (storage unreachable, query failed, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("access lookup failed: {0}")]
pub struct LookupError(pub String);

impl LookupError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Source of membership and super-admin facts.
///
/// Absence of a membership is `Ok(None)`, never an error.
#[async_trait::async_trait]
pub trait AccessDirectory: Send + Sync {
    async fn role_of(&self, org_id: OrgId, user_id: UserId) -> Result<Option<Role>, LookupError>;

    async fn is_super_admin(&self, user_id: UserId) -> Result<bool, LookupError>;
}

#[async_trait::async_trait]
impl<D> AccessDirectory for Arc<D>
where
    D: AccessDirectory + ?Sized,
{
    async fn role_of(&self, org_id: OrgId, user_id: UserId) -> Result<Option<Role>, LookupError> {
        (**self).role_of(org_id, user_id).await
    }

    async fn is_super_admin(&self, user_id: UserId) -> Result<bool, LookupError> {
        (**self).is_super_admin(user_id).await
    }
}

/// Record of one gate evaluation, emitted at debug level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionTrace {
    pub gate: &'static str,
    pub user_id: UserId,
    pub org_id: Option<OrgId>,
    pub required: Option<Role>,
    pub actual: Option<Role>,
    pub granted: bool,
}

impl DecisionTrace {
    fn emit(&self) {
        tracing::debug!(
            gate = self.gate,
            user_id = %self.user_id,
            org_id = ?self.org_id,
            required = ?self.required,
            actual = ?self.actual,
            granted = self.granted,
            "authorization decision"
        );
    }
}

/// Authorization engine.
///
/// Every decision is evaluated against the directory for the organization
/// given in the call; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Authorizer<D> {
    directory: D,
}

impl<D: AccessDirectory> Authorizer<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// True iff the user holds `admin` in the organization.
    pub async fn is_org_admin(&self, org_id: OrgId, user_id: UserId) -> Result<bool, LookupError> {
        Ok(self.explain_role(org_id, user_id, Role::Admin, "org_admin").await?.granted)
    }

    pub async fn is_super_admin(&self, user_id: UserId) -> Result<bool, LookupError> {
        self.directory.is_super_admin(user_id).await
    }

    /// True iff the user's role in the organization is `min` or higher.
    pub async fn has_at_least_role(
        &self,
        org_id: OrgId,
        user_id: UserId,
        min: Role,
    ) -> Result<bool, LookupError> {
        Ok(self.explain_role(org_id, user_id, min, "min_role").await?.granted)
    }

    pub async fn require_org_admin(&self, org_id: OrgId, user_id: UserId) -> Result<(), AuthzError> {
        self.require_role(org_id, user_id, Role::Admin).await
    }

    pub async fn require_role(&self, org_id: OrgId, user_id: UserId, min: Role) -> Result<(), AuthzError> {
        let trace = self.explain_role(org_id, user_id, min, "require_role").await?;
        trace.emit();
        if trace.granted { Ok(()) } else { Err(AuthzError::Forbidden) }
    }

    pub async fn require_super_admin(&self, user_id: UserId) -> Result<(), AuthzError> {
        let granted = self.directory.is_super_admin(user_id).await?;
        DecisionTrace {
            gate: "require_super_admin",
            user_id,
            org_id: None,
            required: None,
            actual: None,
            granted,
        }
        .emit();
        if granted { Ok(()) } else { Err(AuthzError::Forbidden) }
    }

    /// Evaluate a role gate without enforcing it.
    pub async fn explain_role(
        &self,
        org_id: OrgId,
        user_id: UserId,
        min: Role,
        gate: &'static str,
    ) -> Result<DecisionTrace, LookupError> {
        let actual = self.directory.role_of(org_id, user_id).await?;
        Ok(DecisionTrace {
            gate,
            user_id,
            org_id: Some(org_id),
            required: Some(min),
            actual,
            granted: actual.is_some_and(|r| r.at_least(min)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDirectory {
        roles: Mutex<HashMap<(OrgId, UserId), Role>>,
        supers: Mutex<HashSet<UserId>>,
        broken: bool,
    }

    impl FakeDirectory {
        fn grant(&self, org: OrgId, user: UserId, role: Role) {
            self.roles.lock().unwrap().insert((org, user), role);
        }
    }

    #[async_trait::async_trait]
    impl AccessDirectory for FakeDirectory {
        async fn role_of(&self, org_id: OrgId, user_id: UserId) -> Result<Option<Role>, LookupError> {
            if self.broken {
                return Err(LookupError::new("connection refused"));
            }
            Ok(self.roles.lock().unwrap().get(&(org_id, user_id)).copied())
        }

        async fn is_super_admin(&self, user_id: UserId) -> Result<bool, LookupError> {
            if self.broken {
                return Err(LookupError::new("connection refused"));
            }
            Ok(self.supers.lock().unwrap().contains(&user_id))
        }
    }

    #[tokio::test]
    async fn org_admin_requires_an_admin_membership_in_that_org() {
        let dir = Arc::new(FakeDirectory::default());
        let (o1, o2) = (OrgId::new(), OrgId::new());
        let (admin, viewer, stranger) = (UserId::new(), UserId::new(), UserId::new());
        dir.grant(o1, admin, Role::Admin);
        dir.grant(o1, viewer, Role::Viewer);
        let authz = Authorizer::new(dir);

        assert!(authz.is_org_admin(o1, admin).await.unwrap());
        assert!(!authz.is_org_admin(o2, admin).await.unwrap());
        assert!(!authz.is_org_admin(o1, viewer).await.unwrap());
        assert!(!authz.is_org_admin(o1, stranger).await.unwrap());
    }

    #[tokio::test]
    async fn role_gates_follow_the_order() {
        let dir = Arc::new(FakeDirectory::default());
        let org = OrgId::new();
        let assessor = UserId::new();
        dir.grant(org, assessor, Role::Assessor);
        let authz = Authorizer::new(dir);

        assert!(authz.has_at_least_role(org, assessor, Role::Viewer).await.unwrap());
        assert!(authz.has_at_least_role(org, assessor, Role::Assessor).await.unwrap());
        assert!(!authz.has_at_least_role(org, assessor, Role::Admin).await.unwrap());
        assert_eq!(
            authz.require_org_admin(org, assessor).await,
            Err(AuthzError::Forbidden)
        );
    }

    #[tokio::test]
    async fn super_admin_gate_uses_the_global_flag_only() {
        let dir = Arc::new(FakeDirectory::default());
        let root = UserId::new();
        dir.supers.lock().unwrap().insert(root);
        let authz = Authorizer::new(dir);

        assert!(authz.require_super_admin(root).await.is_ok());
        assert_eq!(
            authz.require_super_admin(UserId::new()).await,
            Err(AuthzError::Forbidden)
        );
    }

    #[tokio::test]
    async fn lookup_failures_fail_closed() {
        let dir = FakeDirectory {
            broken: true,
            ..Default::default()
        };
        let authz = Authorizer::new(Arc::new(dir));

        let err = authz.require_org_admin(OrgId::new(), UserId::new()).await.unwrap_err();
        assert!(matches!(err, AuthzError::Lookup(_)));
        assert!(authz.is_super_admin(UserId::new()).await.is_err());
    }
}
