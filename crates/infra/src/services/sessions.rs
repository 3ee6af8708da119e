use tracing::{info, instrument, warn};

use gabinete_auth::Identity;
use gabinete_core::DomainError;
use gabinete_orgs::normalize_email;

use super::{ServiceResult, Services, blocking};
use crate::password::verify_password;
use crate::store::{Credentials, ProfileStore};

impl Services {
    /// Check an email and password against the stored hash.
    ///
    /// Unknown emails, identities without a password and wrong passwords all
    /// fail the same way.
    #[instrument(skip(self, email, password), err)]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<Identity> {
        let email = normalize_email(email);
        let Some(Credentials {
            user_id,
            password_hash: Some(hash),
        }) = self.store.find_credentials(&email).await?
        else {
            warn!("login for an email without a password");
            return Err(DomainError::InvalidCredentials.into());
        };

        let candidate = password.to_string();
        if !blocking(move || verify_password(&candidate, &hash)).await? {
            warn!(%user_id, "login with a wrong password");
            return Err(DomainError::InvalidCredentials.into());
        }

        info!(%user_id, "password login");
        Ok(Identity::new(user_id, Some(email)))
    }
}
