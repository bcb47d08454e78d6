//! Rotation-specific error types

use thiserror::Error;

use super::outcome::Stage;
use crate::core::{AuthorityError, PairId, PairStatus, StoreError};

/// Why the planner refused to produce a plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Two same-status pairs and no local record picking one of them
    #[error(
        "cannot choose which of two {status} pairs ({first}, {second}) to discard: local record {} matches neither",
        .local.as_ref().map_or("<absent>", PairId::as_str)
    )]
    Ambiguous {
        status: PairStatus,
        first: PairId,
        second: PairId,
        local: Option<PairId>,
    },

    /// Nothing to authenticate the creation call with
    #[error("identity holds no credential pairs")]
    NoPairs,

    /// The authority reports more pairs than its own ceiling allows
    #[error("identity holds {count} credential pairs, above the ceiling of two")]
    CeilingExceeded { count: usize },
}

/// Profile-scoped rotation failures
///
/// None of these abort sibling profiles.
#[derive(Debug, Error)]
pub enum RotationError {
    /// Which pair to discard cannot be inferred safely; needs a human
    #[error("ambiguous remote state: {0}")]
    AmbiguousState(#[source] PlanError),

    /// A list/create/deactivate/delete call failed or timed out
    #[error("remote call failed during {stage}: {source}")]
    RemoteCallFailure {
        stage: Stage,
        #[source]
        source: AuthorityError,
    },

    /// The new pair exists remotely but the credentials file does not know it
    #[error(
        "credential pair {new_pair_id} was created but the credentials file was not updated; \
         reconcile manually: {source}"
    )]
    LocalWriteFailure {
        new_pair_id: PairId,
        #[source]
        source: StoreError,
    },
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PairId {
        PairId::new(s).unwrap()
    }

    #[test]
    fn test_ambiguous_message_names_both_pairs() {
        let err = PlanError::Ambiguous {
            status: PairStatus::Active,
            first: id("K1"),
            second: id("K2"),
            local: Some(id("K9")),
        };
        assert_eq!(
            err.to_string(),
            "cannot choose which of two active pairs (K1, K2) to discard: local record K9 matches neither"
        );
    }

    #[test]
    fn test_ambiguous_message_without_local_record() {
        let err = PlanError::Ambiguous {
            status: PairStatus::Inactive,
            first: id("K1"),
            second: id("K2"),
            local: None,
        };
        assert!(err.to_string().contains("local record <absent>"));
    }
}
