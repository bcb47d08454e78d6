//! Decision table and structural properties of the rotation planner
//!
//! - At most one pair is ever created per plan
//! - The pair the credentials file depends on is never deleted
//! - Two same-status pairs without a matching local record are refused
//! - The plan never depends on listing order

use keyrot_rotation::rotation::{Action, PlanError, plan};
use keyrot_rotation::{CredentialPair, PairId, PairStatus, RemoteIdentityState};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use PairStatus::{Active, Inactive};

fn id(s: &str) -> PairId {
    PairId::new(s).unwrap()
}

fn remote(pairs: &[(&str, PairStatus)]) -> RemoteIdentityState {
    pairs
        .iter()
        .map(|(s, status)| CredentialPair::listed(id(s), *status))
        .collect()
}

fn delete(s: &str) -> Action {
    Action::DeleteExisting(id(s))
}

fn deactivate(s: &str) -> Action {
    Action::Deactivate(id(s))
}

// ---------------------------------------------------------------------------
// Decision table
// ---------------------------------------------------------------------------

#[rstest]
#[case::single_active(&[("K1", Active)], "K1", vec![Action::CreateNew, deactivate("K1")], "K1")]
#[case::single_active_stale_record(&[("K1", Active)], "K9", vec![Action::CreateNew, deactivate("K1")], "K1")]
#[case::single_inactive(&[("K1", Inactive)], "K1", vec![Action::CreateNew], "K1")]
#[case::mixed(
    &[("K1", Active), ("K2", Inactive)],
    "K1",
    vec![delete("K2"), Action::CreateNew, deactivate("K1")],
    "K1"
)]
#[case::mixed_record_on_inactive(
    &[("K1", Active), ("K2", Inactive)],
    "K2",
    vec![delete("K2"), Action::CreateNew, deactivate("K1")],
    "K1"
)]
#[case::both_active_first(
    &[("K1", Active), ("K2", Active)],
    "K1",
    vec![delete("K2"), Action::CreateNew, deactivate("K1")],
    "K1"
)]
#[case::both_active_second(
    &[("K1", Active), ("K2", Active)],
    "K2",
    vec![delete("K1"), Action::CreateNew, deactivate("K2")],
    "K2"
)]
#[case::both_inactive(
    &[("K1", Inactive), ("K2", Inactive)],
    "K2",
    vec![delete("K1"), Action::CreateNew],
    "K2"
)]
fn decision_table(
    #[case] pairs: &[(&str, PairStatus)],
    #[case] local: &str,
    #[case] expected: Vec<Action>,
    #[case] auth: &str,
) {
    let planned = plan(&remote(pairs), Some(&id(local))).unwrap();
    assert_eq!(planned.actions(), expected.as_slice());
    assert_eq!(planned.auth(), &id(auth));
}

#[rstest]
#[case::both_active_stale(&[("K1", Active), ("K2", Active)], Some("K9"))]
#[case::both_active_no_record(&[("K1", Active), ("K2", Active)], None)]
#[case::both_inactive_stale(&[("K1", Inactive), ("K2", Inactive)], Some("K9"))]
fn ambiguous_states_are_refused(#[case] pairs: &[(&str, PairStatus)], #[case] local: Option<&str>) {
    let local = local.map(id);
    let err = plan(&remote(pairs), local.as_ref()).unwrap_err();
    assert!(matches!(err, PlanError::Ambiguous { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_single_active_pair() {
    let planned = plan(&remote(&[("K1", Active)]), Some(&id("K1"))).unwrap();
    assert_eq!(planned.creations(), 1);
    assert!(
        !planned
            .actions()
            .iter()
            .any(|a| matches!(a, Action::DeleteExisting(_)))
    );
}

#[test]
fn scenario_b_active_and_inactive() {
    let planned = plan(&remote(&[("K1", Active), ("K2", Inactive)]), Some(&id("K1"))).unwrap();
    assert_eq!(
        planned.actions(),
        &[delete("K2"), Action::CreateNew, deactivate("K1")]
    );
}

#[test]
fn scenario_c_two_active_with_match() {
    let planned = plan(&remote(&[("K1", Active), ("K2", Active)]), Some(&id("K1"))).unwrap();
    assert_eq!(
        planned.actions(),
        &[delete("K2"), Action::CreateNew, deactivate("K1")]
    );
}

#[test]
fn scenario_d_two_active_stale_record() {
    let result = plan(&remote(&[("K1", Active), ("K2", Active)]), Some(&id("K9")));
    assert!(matches!(result, Err(PlanError::Ambiguous { .. })));
}

#[test]
fn replanning_single_active_pair_is_stable() {
    let state = remote(&[("K1", Active)]);
    let first = plan(&state, Some(&id("K1"))).unwrap();
    let second = plan(&state, Some(&id("K1"))).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.actions(), &[Action::CreateNew, deactivate("K1")]);
}

#[test]
fn state_after_scenario_a_plans_like_scenario_b() {
    // K1 was deactivated, K2 created and recorded locally
    let planned = plan(&remote(&[("K1", Inactive), ("K2", Active)]), Some(&id("K2"))).unwrap();
    assert_eq!(
        planned.actions(),
        &[delete("K1"), Action::CreateNew, deactivate("K2")]
    );
    assert_eq!(planned.auth(), &id("K2"));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn arb_status() -> impl Strategy<Value = PairStatus> {
    prop_oneof![Just(Active), Just(Inactive)]
}

/// One or two pairs with distinct ids, in arbitrary order
fn arb_pairs() -> impl Strategy<Value = Vec<(String, PairStatus)>> {
    prop_oneof![
        arb_status().prop_map(|s| vec![("AKIAONE".to_string(), s)]),
        (arb_status(), arb_status(), any::<bool>()).prop_map(|(a, b, swap)| {
            let mut pairs = vec![("AKIAONE".to_string(), a), ("AKIATWO".to_string(), b)];
            if swap {
                pairs.reverse();
            }
            pairs
        }),
    ]
}

fn arb_local() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("AKIAONE".to_string())),
        Just(Some("AKIATWO".to_string())),
        Just(Some("AKIASTALE".to_string())),
    ]
}

fn build(pairs: &[(String, PairStatus)]) -> RemoteIdentityState {
    pairs
        .iter()
        .map(|(s, status)| CredentialPair::listed(id(s), *status))
        .collect()
}

proptest! {
    #[test]
    fn at_most_one_creation(pairs in arb_pairs(), local in arb_local()) {
        let local = local.as_deref().map(id);
        if let Ok(planned) = plan(&build(&pairs), local.as_ref()) {
            prop_assert!(planned.creations() <= 1);
        }
    }

    #[test]
    fn locally_recorded_pair_is_never_deleted(pairs in arb_pairs(), local in arb_local()) {
        let local = local.as_deref().map(id);
        let state = build(&pairs);
        if let (Ok(planned), Some(local)) = (plan(&state, local.as_ref()), local.as_ref()) {
            // Only an inactive recorded pair may go, and only next to an active one.
            let deletes_local = planned.actions().contains(&Action::DeleteExisting(local.clone()));
            if deletes_local {
                let recorded = state.get(local).unwrap();
                prop_assert_eq!(recorded.status, Inactive);
                prop_assert!(state.pairs().iter().any(CredentialPair::is_active));
            }
        }
    }

    #[test]
    fn deletion_precedes_creation_precedes_deactivation(
        pairs in arb_pairs(),
        local in arb_local(),
    ) {
        let local = local.as_deref().map(id);
        if let Ok(planned) = plan(&build(&pairs), local.as_ref()) {
            let rank = |a: &Action| match a {
                Action::DeleteExisting(_) => 0,
                Action::CreateNew => 1,
                Action::Deactivate(_) => 2,
            };
            let ranks: Vec<u8> = planned.actions().iter().map(rank).collect();
            prop_assert!(ranks.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(planned.creations(), 1);
        }
    }

    #[test]
    fn same_status_pairs_need_a_matching_record(
        status in arb_status(),
        local in arb_local(),
    ) {
        let pairs = vec![("AKIAONE".to_string(), status), ("AKIATWO".to_string(), status)];
        let local = local.as_deref().map(id);
        let result = plan(&build(&pairs), local.as_ref());
        let matches = local
            .as_ref()
            .is_some_and(|l| l.as_str() == "AKIAONE" || l.as_str() == "AKIATWO");
        prop_assert_eq!(result.is_ok(), matches);
    }

    #[test]
    fn listing_order_is_irrelevant(pairs in arb_pairs(), local in arb_local()) {
        let local = local.as_deref().map(id);
        let mut reversed = pairs.clone();
        reversed.reverse();
        prop_assert_eq!(
            plan(&build(&pairs), local.as_ref()).ok(),
            plan(&build(&reversed), local.as_ref()).ok()
        );
    }

    #[test]
    fn active_pair_survives_until_replacement(pairs in arb_pairs(), local in arb_local()) {
        let local = local.as_deref().map(id);
        if let Ok(planned) = plan(&build(&pairs), local.as_ref()) {
            // The authenticating pair is never deleted, so every call can be signed.
            prop_assert!(!planned.actions().contains(&Action::DeleteExisting(planned.auth().clone())));
        }
    }
}
