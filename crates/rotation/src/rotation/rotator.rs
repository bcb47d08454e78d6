//! Per-profile rotation: list, plan, execute

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{PlanError, RotationError};
use super::executor::{RotationExecutor, with_timeout};
use super::outcome::{RotationOutcome, Stage};
use super::plan::plan;
use crate::core::{LocalRecord, RemoteOperation};
use crate::traits::{KeyAuthority, PairSink};

/// Default deadline for a single remote call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for a rotation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationOptions {
    /// Deadline applied to each remote call
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,

    /// List and plan only, mutate nothing
    pub dry_run: bool,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            dry_run: false,
        }
    }
}

impl RotationOptions {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Rotates the pair of one profile at a time
pub struct Rotator<'a, A: ?Sized, S: ?Sized> {
    authority: &'a A,
    sink: &'a S,
    options: RotationOptions,
}

impl<'a, A, S> Rotator<'a, A, S>
where
    A: KeyAuthority + ?Sized,
    S: PairSink + ?Sized,
{
    pub fn new(authority: &'a A, sink: &'a S, options: RotationOptions) -> Self {
        Self {
            authority,
            sink,
            options,
        }
    }

    pub fn options(&self) -> &RotationOptions {
        &self.options
    }

    /// Rotate the pair recorded for one profile
    ///
    /// Never returns an error: every failure is folded into the outcome so
    /// the caller can move on to the next profile.
    #[tracing::instrument(
        skip(self, record),
        fields(profile = %record.profile_name, local_pair = %record.pair_id)
    )]
    pub async fn rotate(&self, record: &LocalRecord) -> RotationOutcome {
        let identity = record.identity();

        let state = match with_timeout(
            self.options.call_timeout,
            RemoteOperation::ListPairs,
            self.authority.list_pairs(&identity),
        )
        .await
        {
            Ok(state) => state,
            Err(source) => {
                tracing::warn!(error = %source, "could not list credential pairs");
                return RotationOutcome::failed(
                    Stage::ListPairs,
                    RotationError::RemoteCallFailure {
                        stage: Stage::ListPairs,
                        source,
                    },
                );
            }
        };

        tracing::debug!(pairs = state.len(), "listed credential pairs");
        if !state.contains(&record.pair_id) {
            tracing::warn!("local record is stale: pair no longer known remotely");
        }

        let plan = match plan(&state, Some(&record.pair_id)) {
            Ok(plan) => plan,
            Err(err @ PlanError::Ambiguous { .. }) => {
                tracing::error!(error = %err, "refusing to guess which pair to discard");
                return RotationOutcome::failed(Stage::Plan, RotationError::AmbiguousState(err));
            }
            Err(err @ (PlanError::NoPairs | PlanError::CeilingExceeded { .. })) => {
                tracing::warn!(error = %err, "nothing can be rotated");
                return RotationOutcome::NoActionPossible {
                    reason: err.to_string(),
                };
            }
        };

        // Only the locally recorded secret is known; listing never returns one.
        if plan.auth() != &record.pair_id {
            let reason = format!(
                "plan must authenticate as {} but the credentials file holds {}",
                plan.auth(),
                record.pair_id
            );
            tracing::warn!(%reason, "cannot authenticate plan");
            return RotationOutcome::NoActionPossible { reason };
        }

        tracing::info!(%plan, "planned rotation");

        if self.options.dry_run {
            return RotationOutcome::Planned { plan };
        }

        let executor = RotationExecutor::new(self.authority, self.sink, self.options.call_timeout);
        match executor
            .execute(&record.profile_name, &plan, &record.credentials())
            .await
        {
            Ok(Some(new_pair)) => RotationOutcome::Rotated { new_pair, plan },
            Ok(None) => RotationOutcome::NoActionPossible {
                reason: "plan did not create a replacement pair".to_string(),
            },
            Err(failure) => failure.into(),
        }
    }
}
