//! Per-profile rotation outcome

use std::fmt;

use serde::Serialize;

use super::error::RotationError;
use super::plan::{Action, RotationPlan};
use crate::core::{CredentialPair, PairId};

/// Where in the per-profile flow a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ListPairs,
    Plan,
    DeleteExisting,
    CreateNew,
    WriteLocal,
    Deactivate,
}

impl Stage {
    /// Stage a plan step runs in
    pub fn of(action: &Action) -> Self {
        match action {
            Action::DeleteExisting(_) => Self::DeleteExisting,
            Action::Deactivate(_) => Self::Deactivate,
            Action::CreateNew => Self::CreateNew,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListPairs => "list pairs",
            Self::Plan => "plan",
            Self::DeleteExisting => "delete existing pair",
            Self::CreateNew => "create new pair",
            Self::WriteLocal => "write credentials file",
            Self::Deactivate => "deactivate old pair",
        })
    }
}

/// Result of rotating one profile
#[derive(Debug)]
pub enum RotationOutcome {
    /// A new pair exists, is recorded locally, and every planned step ran
    Rotated {
        new_pair: CredentialPair,
        plan: RotationPlan,
    },

    /// Dry run: the plan that would have been executed
    Planned { plan: RotationPlan },

    /// Nothing can be done for this profile without outside help
    NoActionPossible { reason: String },

    /// A step failed; the remaining steps were not attempted
    Failed {
        stage: Stage,
        error: RotationError,
        /// Set when the failure happened after a new pair was created
        new_pair_id: Option<PairId>,
    },
}

impl RotationOutcome {
    pub(crate) fn failed(stage: Stage, error: RotationError) -> Self {
        Self::Failed {
            stage,
            error,
            new_pair_id: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_rotated(&self) -> bool {
        matches!(self, Self::Rotated { .. })
    }

    /// Id of the pair created during this rotation, whether or not it finished
    pub fn new_pair_id(&self) -> Option<&PairId> {
        match self {
            Self::Rotated { new_pair, .. } => Some(&new_pair.id),
            Self::Failed { new_pair_id, .. } => new_pair_id.as_ref(),
            Self::Planned { .. } | Self::NoActionPossible { .. } => None,
        }
    }
}

impl fmt::Display for RotationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotated { new_pair, .. } => write!(f, "rotated to {}", new_pair.id),
            Self::Planned { plan } => write!(f, "would {plan}"),
            Self::NoActionPossible { reason } => write!(f, "no action possible: {reason}"),
            Self::Failed {
                stage,
                error,
                new_pair_id,
            } => {
                write!(f, "failed at {stage}: {error}")?;
                if let Some(id) = new_pair_id {
                    write!(f, " (new pair {id} already created)")?;
                }
                Ok(())
            }
        }
    }
}
