use std::sync::Arc;

use gabinete_auth::{AccessDirectory, LookupError, Role};
use gabinete_core::{OrgId, UserId};

use crate::store::{MembershipStore, ProfileStore, Store, StoreError};

/// [`AccessDirectory`] over the store, so every gate reads current rows.
#[derive(Clone)]
pub struct StoreDirectory {
    store: Arc<dyn Store>,
}

impl StoreDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl core::fmt::Debug for StoreDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreDirectory").finish_non_exhaustive()
    }
}

fn lookup_error(err: StoreError) -> LookupError {
    LookupError::new(err.to_string())
}

#[async_trait::async_trait]
impl AccessDirectory for StoreDirectory {
    async fn role_of(&self, org_id: OrgId, user_id: UserId) -> Result<Option<Role>, LookupError> {
        MembershipStore::role_of(&*self.store, org_id, user_id)
            .await
            .map_err(lookup_error)
    }

    async fn is_super_admin(&self, user_id: UserId) -> Result<bool, LookupError> {
        ProfileStore::is_super_admin(&*self.store, user_id)
            .await
            .map_err(lookup_error)
    }
}
