use serde::{Deserialize, Serialize};

use gabinete_core::UserId;

use crate::JwtClaims;

/// Authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    /// Lower-cased email from the credential, if the provider supplied one.
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self {
            user_id,
            email: email.map(|e| e.trim().to_ascii_lowercase()),
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.email.clone())
    }
}
