//! Destination for freshly created pairs

use async_trait::async_trait;

use crate::core::{CredentialPair, StoreError};

/// Persists a newly created pair for a profile
///
/// Called exactly once per successful creation, before any later action of
/// the plan runs. A failure is not retried: the pair already exists remotely.
#[async_trait]
pub trait PairSink: Send + Sync {
    async fn persist(&self, profile: &str, pair: &CredentialPair) -> Result<(), StoreError>;
}
