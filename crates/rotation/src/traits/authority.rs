//! The remote authority that owns credential pairs

use async_trait::async_trait;

use crate::core::{
    AccessCredentials, AuthorityError, CredentialPair, Identity, PairId, RemoteIdentityState,
};

/// Remote authority issuing and revoking credential pairs
///
/// Enforces a ceiling of two pairs per identity. Every mutating call is
/// authenticated with a pair the caller holds the secret for; an inactive
/// pair still authenticates.
///
/// Implementations must not retry mutating calls on their own: a retried
/// `create_pair` whose first attempt actually succeeded would burn the
/// identity's second slot.
#[async_trait]
pub trait KeyAuthority: Send + Sync {
    /// List every pair known for the identity, in no particular order
    async fn list_pairs(&self, identity: &Identity) -> Result<RemoteIdentityState, AuthorityError>;

    /// Create a new active pair; the returned pair carries its secret
    async fn create_pair(&self, auth: &AccessCredentials) -> Result<CredentialPair, AuthorityError>;

    /// Mark a pair inactive
    async fn deactivate_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError>;

    /// Permanently delete a pair
    async fn delete_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError>;
}

#[async_trait]
impl<T: KeyAuthority + ?Sized> KeyAuthority for std::sync::Arc<T> {
    async fn list_pairs(&self, identity: &Identity) -> Result<RemoteIdentityState, AuthorityError> {
        (**self).list_pairs(identity).await
    }

    async fn create_pair(&self, auth: &AccessCredentials) -> Result<CredentialPair, AuthorityError> {
        (**self).create_pair(auth).await
    }

    async fn deactivate_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError> {
        (**self).deactivate_pair(auth, pair_id).await
    }

    async fn delete_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError> {
        (**self).delete_pair(auth, pair_id).await
    }
}
