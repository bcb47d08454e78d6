//! Error types shared across the engine
//!
//! - [`ValidationError`]: malformed pair identifiers
//! - [`AuthorityError`]: a remote call to the key authority failed
//! - [`StoreError`]: reading, parsing or rewriting the credentials file failed
//! - [`ConfigurationError`]: the run cannot start at all
//!
//! Profile-scoped rotation failures live in
//! [`RotationError`](crate::rotation::RotationError).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::PairId;

/// Validation errors for identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Pair id cannot be empty
    #[error("credential pair id cannot be empty")]
    EmptyPairId,

    /// Pair id contains invalid characters or is too long
    #[error("invalid credential pair id '{id}': {reason}")]
    InvalidPairId { id: String, reason: String },
}

/// The remote calls the engine makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    ListPairs,
    CreatePair,
    DeactivatePair,
    DeletePair,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListPairs => "list_pairs",
            Self::CreatePair => "create_pair",
            Self::DeactivatePair => "deactivate_pair",
            Self::DeletePair => "delete_pair",
        })
    }
}

/// A call against the key authority failed
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The presented access key was not accepted
    #[error("{operation} rejected: access key {access_key_id} is not valid")]
    InvalidCredentials {
        operation: RemoteOperation,
        access_key_id: PairId,
    },

    /// The identity already holds two pairs
    #[error("{operation} refused: identity already holds the maximum of two credential pairs")]
    LimitExceeded { operation: RemoteOperation },

    /// The targeted pair does not exist
    #[error("{operation} failed: credential pair {pair_id} does not exist")]
    NoSuchPair {
        operation: RemoteOperation,
        pair_id: PairId,
    },

    /// The call did not complete in time
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: RemoteOperation,
        timeout: Duration,
    },

    /// Any other service or transport failure
    #[error("{operation} failed: {message}")]
    Service {
        operation: RemoteOperation,
        message: String,
    },

    /// The authority answered with something unusable
    #[error("{operation} returned a malformed response: {reason}")]
    MalformedResponse {
        operation: RemoteOperation,
        reason: String,
    },
}

impl AuthorityError {
    pub fn operation(&self) -> RemoteOperation {
        match self {
            Self::InvalidCredentials { operation, .. }
            | Self::LimitExceeded { operation }
            | Self::NoSuchPair { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::Service { operation, .. }
            | Self::MalformedResponse { operation, .. } => *operation,
        }
    }

    /// Convenience constructor for transport and service failures
    pub fn service(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            message: message.into(),
        }
    }
}

/// Credentials file errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read credentials file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write credentials file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock credentials file {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("profile '{profile}' not found in credentials file")]
    ProfileNotFound { profile: String },

    #[error("profile '{profile}' has no {key}")]
    MissingKey { profile: String, key: &'static str },

    #[error("profile '{profile}' holds an unusable access key id: {source}")]
    InvalidPairId {
        profile: String,
        #[source]
        source: ValidationError,
    },

    /// Only freshly created pairs carry a secret and can be written
    #[error("credential pair {pair_id} carries no secret to store")]
    MissingSecret { pair_id: PairId },
}

/// Errors that abort a whole run before any remote call is made
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("include and exclude profile lists are mutually exclusive")]
    ConflictingSelection,

    #[error("unknown or non-rotatable profile(s): {}", .names.join(", "))]
    UnknownProfiles { names: Vec<String> },

    #[error("credentials file unusable: {0}")]
    CredentialsFile(#[from] StoreError),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
