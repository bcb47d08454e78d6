//! Rotation planning
//!
//! [`plan`] is a pure function from the remote state and the locally recorded
//! pair id to an ordered [`RotationPlan`]. It performs no I/O.
//!
//! | remote pairs          | local match | plan                                          |
//! |-----------------------|-------------|-----------------------------------------------|
//! | 1 active              | n/a         | create, deactivate(active)                    |
//! | 1 inactive            | n/a         | create                                        |
//! | 1 active + 1 inactive | n/a         | delete(inactive), create, deactivate(active)  |
//! | 2 active              | one         | delete(other), create, deactivate(matching)   |
//! | 2 inactive            | one         | delete(other), create                         |
//! | 2 same status         | none        | refused as ambiguous                          |
//!
//! The plan also names the pair whose credentials authenticate every call:
//! always the pair that survives until the replacement exists.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::PlanError;
use crate::core::{CredentialPair, PairId, PairStatus, RemoteIdentityState};

/// Ceiling the authority enforces on pairs per identity
pub const MAX_PAIRS_PER_IDENTITY: usize = 2;

/// One step of a rotation plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "pair_id", rename_all = "snake_case")]
pub enum Action {
    /// Permanently delete a pair proven non-essential
    DeleteExisting(PairId),
    /// Mark a pair inactive once its replacement exists
    Deactivate(PairId),
    /// Create the replacement pair
    CreateNew,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteExisting(id) => write!(f, "delete {id}"),
            Self::Deactivate(id) => write!(f, "deactivate {id}"),
            Self::CreateNew => f.write_str("create new pair"),
        }
    }
}

/// Ordered, side-effect-free sequence of actions for one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationPlan {
    auth: PairId,
    actions: Vec<Action>,
}

impl RotationPlan {
    fn new(auth: &CredentialPair, actions: Vec<Action>) -> Self {
        debug_assert!(
            actions.iter().filter(|a| **a == Action::CreateNew).count() <= 1,
            "a plan creates at most one pair"
        );
        Self {
            auth: auth.id.clone(),
            actions,
        }
    }

    /// Pair whose credentials authenticate every call of this plan
    pub fn auth(&self) -> &PairId {
        &self.auth
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of `CreateNew` steps (0 or 1)
    pub fn creations(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| **action == Action::CreateNew)
            .count()
    }
}

impl fmt::Display for RotationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{action}")?;
        }
        write!(f, " (as {})", self.auth)
    }
}

/// The starting configurations the planner distinguishes
enum Shape<'a> {
    SingleActive(&'a CredentialPair),
    SingleInactive(&'a CredentialPair),
    Mixed {
        active: &'a CredentialPair,
        inactive: &'a CredentialPair,
    },
    BothActive(&'a CredentialPair, &'a CredentialPair),
    BothInactive(&'a CredentialPair, &'a CredentialPair),
}

fn classify(state: &RemoteIdentityState) -> Result<Shape<'_>, PlanError> {
    match state.pairs() {
        [] => Err(PlanError::NoPairs),
        [only] if only.is_active() => Ok(Shape::SingleActive(only)),
        [only] => Ok(Shape::SingleInactive(only)),
        [a, b] => Ok(match (a.status, b.status) {
            (PairStatus::Active, PairStatus::Active) => Shape::BothActive(a, b),
            (PairStatus::Inactive, PairStatus::Inactive) => Shape::BothInactive(a, b),
            (PairStatus::Active, PairStatus::Inactive) => Shape::Mixed {
                active: a,
                inactive: b,
            },
            (PairStatus::Inactive, PairStatus::Active) => Shape::Mixed {
                active: b,
                inactive: a,
            },
        }),
        more => Err(PlanError::CeilingExceeded { count: more.len() }),
    }
}

/// Splits two same-status pairs into (referenced locally, the other one)
fn split_by_local<'a>(
    a: &'a CredentialPair,
    b: &'a CredentialPair,
    local: Option<&PairId>,
) -> Option<(&'a CredentialPair, &'a CredentialPair)> {
    match local {
        Some(id) if &a.id == id => Some((a, b)),
        Some(id) if &b.id == id => Some((b, a)),
        _ => None,
    }
}

fn ambiguous(a: &CredentialPair, b: &CredentialPair, local: Option<&PairId>) -> PlanError {
    PlanError::Ambiguous {
        status: a.status,
        first: a.id.clone(),
        second: b.id.clone(),
        local: local.cloned(),
    }
}

/// Compute the rotation plan for one identity
///
/// `local` is the pair id the credentials file records for the profile, if
/// any. It may be stale.
///
/// ```
/// use keyrot_rotation::{CredentialPair, PairId, PairStatus, RemoteIdentityState};
/// use keyrot_rotation::rotation::{Action, plan};
///
/// let k1 = PairId::new("K1").unwrap();
/// let k2 = PairId::new("K2").unwrap();
/// let state = RemoteIdentityState::new(vec![
///     CredentialPair::listed(k1.clone(), PairStatus::Active),
///     CredentialPair::listed(k2.clone(), PairStatus::Inactive),
/// ]);
///
/// let plan = plan(&state, Some(&k1)).unwrap();
/// assert_eq!(
///     plan.actions(),
///     &[Action::DeleteExisting(k2), Action::CreateNew, Action::Deactivate(k1.clone())]
/// );
/// assert_eq!(plan.auth(), &k1);
/// ```
pub fn plan(
    state: &RemoteIdentityState,
    local: Option<&PairId>,
) -> Result<RotationPlan, PlanError> {
    let plan = match classify(state)? {
        Shape::SingleActive(active) => RotationPlan::new(
            active,
            vec![Action::CreateNew, Action::Deactivate(active.id.clone())],
        ),
        // Left in place; the next run sees one active + one inactive.
        Shape::SingleInactive(inactive) => RotationPlan::new(inactive, vec![Action::CreateNew]),
        Shape::Mixed { active, inactive } => RotationPlan::new(
            active,
            vec![
                Action::DeleteExisting(inactive.id.clone()),
                Action::CreateNew,
                Action::Deactivate(active.id.clone()),
            ],
        ),
        Shape::BothActive(a, b) => {
            let (keep, discard) =
                split_by_local(a, b, local).ok_or_else(|| ambiguous(a, b, local))?;
            RotationPlan::new(
                keep,
                vec![
                    Action::DeleteExisting(discard.id.clone()),
                    Action::CreateNew,
                    Action::Deactivate(keep.id.clone()),
                ],
            )
        }
        Shape::BothInactive(a, b) => {
            let (keep, discard) =
                split_by_local(a, b, local).ok_or_else(|| ambiguous(a, b, local))?;
            RotationPlan::new(
                keep,
                vec![Action::DeleteExisting(discard.id.clone()), Action::CreateNew],
            )
        }
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> PairId {
        PairId::new(s).unwrap()
    }

    fn state(pairs: &[(&str, PairStatus)]) -> RemoteIdentityState {
        pairs
            .iter()
            .map(|(s, status)| CredentialPair::listed(id(s), *status))
            .collect()
    }

    #[test]
    fn test_mixed_order_does_not_matter() {
        let forward = state(&[("K1", PairStatus::Active), ("K2", PairStatus::Inactive)]);
        let reverse = state(&[("K2", PairStatus::Inactive), ("K1", PairStatus::Active)]);

        assert_eq!(
            plan(&forward, Some(&id("K1"))).unwrap(),
            plan(&reverse, Some(&id("K1"))).unwrap()
        );
    }

    #[test]
    fn test_mixed_ignores_stale_local_record() {
        let remote = state(&[("K1", PairStatus::Active), ("K2", PairStatus::Inactive)]);
        let planned = plan(&remote, Some(&id("K9"))).unwrap();
        assert_eq!(planned.auth(), &id("K1"));
        assert_eq!(planned.actions()[0], Action::DeleteExisting(id("K2")));
    }

    #[test]
    fn test_no_pairs_refused() {
        assert!(matches!(
            plan(&RemoteIdentityState::default(), None),
            Err(PlanError::NoPairs)
        ));
    }

    #[test]
    fn test_above_ceiling_refused() {
        let remote = state(&[
            ("K1", PairStatus::Active),
            ("K2", PairStatus::Active),
            ("K3", PairStatus::Inactive),
        ]);
        assert!(matches!(
            plan(&remote, Some(&id("K1"))),
            Err(PlanError::CeilingExceeded { count: 3 })
        ));
    }

    #[test]
    fn test_plan_display() {
        let remote = state(&[("K1", PairStatus::Active), ("K2", PairStatus::Active)]);
        let planned = plan(&remote, Some(&id("K1"))).unwrap();
        assert_eq!(
            planned.to_string(),
            "delete K2, create new pair, deactivate K1 (as K1)"
        );
    }

    #[test]
    fn test_action_serializes_tagged() {
        let json = serde_json::to_value(Action::DeleteExisting(id("K2"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "action": "delete_existing", "pair_id": "K2" })
        );
        let json = serde_json::to_value(Action::CreateNew).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "create_new" }));
    }
}
