//! Plan execution against the key authority
//!
//! Steps run strictly in plan order and each one must be confirmed before the
//! next begins: creating while still at the two-pair ceiling fails remotely.
//! On the first failure the rest of the plan is abandoned. Nothing is rolled
//! back; a deleted pair cannot be restored.

use std::future::Future;
use std::time::Duration;

use super::error::RotationError;
use super::outcome::{RotationOutcome, Stage};
use super::plan::{Action, RotationPlan};
use crate::core::{AccessCredentials, AuthorityError, CredentialPair, PairId, RemoteOperation};
use crate::traits::{KeyAuthority, PairSink};

/// Run one remote call under a deadline; expiry counts as that call failing
pub(crate) async fn with_timeout<T, F>(
    timeout: Duration,
    operation: RemoteOperation,
    call: F,
) -> Result<T, AuthorityError>
where
    F: Future<Output = Result<T, AuthorityError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(AuthorityError::Timeout { operation, timeout }),
    }
}

/// A plan step failed
#[derive(Debug)]
pub struct ExecutionFailure {
    pub stage: Stage,
    pub error: RotationError,
    /// Pair created before the failure, if any
    pub new_pair_id: Option<PairId>,
}

impl From<ExecutionFailure> for RotationOutcome {
    fn from(failure: ExecutionFailure) -> Self {
        Self::Failed {
            stage: failure.stage,
            error: failure.error,
            new_pair_id: failure.new_pair_id,
        }
    }
}

/// Applies a [`RotationPlan`] through a [`KeyAuthority`]
///
/// A created pair is handed to the [`PairSink`] before any later step runs,
/// so the old pair is only deactivated once the replacement is on disk.
pub struct RotationExecutor<'a, A: ?Sized, S: ?Sized> {
    authority: &'a A,
    sink: &'a S,
    call_timeout: Duration,
}

impl<'a, A, S> RotationExecutor<'a, A, S>
where
    A: KeyAuthority + ?Sized,
    S: PairSink + ?Sized,
{
    pub fn new(authority: &'a A, sink: &'a S, call_timeout: Duration) -> Self {
        Self {
            authority,
            sink,
            call_timeout,
        }
    }

    /// Execute `plan` for `profile`, authenticating every call with `auth`
    ///
    /// Returns the created pair, or `None` for a plan without a creation step.
    #[tracing::instrument(skip(self, plan, auth), fields(auth = %plan.auth()))]
    pub async fn execute(
        &self,
        profile: &str,
        plan: &RotationPlan,
        auth: &AccessCredentials,
    ) -> Result<Option<CredentialPair>, ExecutionFailure> {
        debug_assert_eq!(&auth.access_key_id, plan.auth());

        let mut created: Option<CredentialPair> = None;

        for action in plan.actions() {
            let stage = Stage::of(action);
            tracing::debug!(%action, "executing step");

            let step = match action {
                Action::DeleteExisting(pair_id) => {
                    with_timeout(
                        self.call_timeout,
                        RemoteOperation::DeletePair,
                        self.authority.delete_pair(auth, pair_id),
                    )
                    .await
                }
                Action::Deactivate(pair_id) => {
                    with_timeout(
                        self.call_timeout,
                        RemoteOperation::DeactivatePair,
                        self.authority.deactivate_pair(auth, pair_id),
                    )
                    .await
                }
                Action::CreateNew => {
                    match with_timeout(
                        self.call_timeout,
                        RemoteOperation::CreatePair,
                        self.authority.create_pair(auth),
                    )
                    .await
                    {
                        Ok(pair) => {
                            tracing::info!(new_pair = %pair.id, "created credential pair");
                            self.persist(profile, &pair).await?;
                            created = Some(pair);
                            Ok(())
                        }
                        Err(source) => Err(source),
                    }
                }
            };

            if let Err(source) = step {
                tracing::warn!(%stage, error = %source, "step failed, abandoning plan");
                return Err(ExecutionFailure {
                    stage,
                    error: RotationError::RemoteCallFailure { stage, source },
                    new_pair_id: created.map(|pair| pair.id),
                });
            }
        }

        Ok(created)
    }

    async fn persist(&self, profile: &str, pair: &CredentialPair) -> Result<(), ExecutionFailure> {
        match self.sink.persist(profile, pair).await {
            Ok(()) => {
                tracing::info!(new_pair = %pair.id, "credentials file updated");
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    new_pair = %pair.id,
                    error = %source,
                    "new pair exists remotely but could not be written locally"
                );
                Err(ExecutionFailure {
                    stage: Stage::WriteLocal,
                    error: RotationError::LocalWriteFailure {
                        new_pair_id: pair.id.clone(),
                        source,
                    },
                    new_pair_id: Some(pair.id.clone()),
                })
            }
        }
    }
}
