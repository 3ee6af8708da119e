use gabinete_auth::Identity;
use gabinete_core::UserId;

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; present on every route except `/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity: Identity,
}

impl PrincipalContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}
