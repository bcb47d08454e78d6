//! Core types for credential pair rotation
mod error;
mod pair;

pub use error::{AuthorityError, ConfigurationError, RemoteOperation, StoreError, ValidationError};
pub use pair::{
    AccessCredentials, CredentialPair, Identity, LocalRecord, PairId, PairStatus,
    RemoteIdentityState,
};
