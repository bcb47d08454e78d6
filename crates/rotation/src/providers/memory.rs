//! In-memory key authority
//!
//! Models the remote rules the engine depends on: the two-pair ceiling per
//! identity, authentication by id and secret, and calls that are refused for
//! unknown pairs. Faults and latency can be injected per call.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::{
    AccessCredentials, AuthorityError, CredentialPair, Identity, PairId, PairStatus,
    RemoteIdentityState, RemoteOperation, ValidationError,
};
use crate::rotation::MAX_PAIRS_PER_IDENTITY;
use crate::traits::KeyAuthority;
use crate::utils::SecretString;

#[derive(Debug, Clone)]
struct StoredPair {
    id: PairId,
    secret: SecretString,
    status: PairStatus,
}

#[derive(Debug, Default)]
struct Faults {
    list: AtomicBool,
    create: AtomicBool,
    deactivate: AtomicBool,
    delete: AtomicBool,
}

impl Faults {
    fn flag(&self, operation: RemoteOperation) -> &AtomicBool {
        match operation {
            RemoteOperation::ListPairs => &self.list,
            RemoteOperation::CreatePair => &self.create,
            RemoteOperation::DeactivatePair => &self.deactivate,
            RemoteOperation::DeletePair => &self.delete,
        }
    }
}

/// Key authority backed by process memory
///
/// Every user owns up to [`MAX_PAIRS_PER_IDENTITY`] pairs. A call
/// authenticates as the user owning the presented pair; inactive pairs still
/// authenticate.
#[derive(Debug, Default)]
pub struct InMemoryAuthority {
    users: Mutex<BTreeMap<String, Vec<StoredPair>>>,
    faults: Faults,
    latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    creations: AtomicUsize,
    mutations: AtomicUsize,
}

impl InMemoryAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with existing pairs, given as `(id, secret, status)`
    pub fn with_user<'s>(
        self,
        user: impl Into<String>,
        pairs: impl IntoIterator<Item = (&'s str, &'s str, PairStatus)>,
    ) -> Result<Self, ValidationError> {
        let pairs = pairs
            .into_iter()
            .map(|(id, secret, status)| {
                Ok(StoredPair {
                    id: PairId::new(id)?,
                    secret: SecretString::new(secret),
                    status,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        self.users.lock().insert(user.into(), pairs);
        Ok(self)
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Make the next call of `operation` fail with a service error
    pub fn fail_next(&self, operation: RemoteOperation) {
        self.faults.flag(operation).store(true, Ordering::SeqCst);
    }

    /// Current pairs of `user`, sorted by id, secrets omitted
    pub fn pairs(&self, user: &str) -> Vec<CredentialPair> {
        let users = self.users.lock();
        let mut pairs: Vec<CredentialPair> = users
            .get(user)
            .map(|pairs| {
                pairs
                    .iter()
                    .map(|p| CredentialPair::listed(p.id.clone(), p.status))
                    .collect()
            })
            .unwrap_or_default();
        pairs.sort_by(|a, b| a.id.cmp(&b.id));
        pairs
    }

    /// Number of calls received, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of pairs created
    pub fn create_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Number of successful create, deactivate and delete calls
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    async fn enter(&self, operation: RemoteOperation) -> Result<(), AuthorityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.faults.flag(operation).swap(false, Ordering::SeqCst) {
            return Err(AuthorityError::service(operation, "injected failure"));
        }
        Ok(())
    }

    fn authenticate(
        users: &BTreeMap<String, Vec<StoredPair>>,
        operation: RemoteOperation,
        auth: &AccessCredentials,
    ) -> Result<String, AuthorityError> {
        users
            .iter()
            .find(|(_, pairs)| {
                pairs.iter().any(|p| {
                    p.id == auth.access_key_id && p.secret.matches(&auth.secret_access_key)
                })
            })
            .map(|(user, _)| user.clone())
            .ok_or_else(|| AuthorityError::InvalidCredentials {
                operation,
                access_key_id: auth.access_key_id.clone(),
            })
    }

    fn generate_pair(operation: RemoteOperation) -> Result<(PairId, SecretString), AuthorityError> {
        let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        let id = PairId::new(format!("AKIA{}", &raw[..16])).map_err(|err| {
            AuthorityError::MalformedResponse {
                operation,
                reason: err.to_string(),
            }
        })?;
        let secret = Uuid::new_v4().simple().to_string() + &Uuid::new_v4().simple().to_string();
        Ok((id, SecretString::new(secret)))
    }
}

#[async_trait]
impl KeyAuthority for InMemoryAuthority {
    async fn list_pairs(&self, identity: &Identity) -> Result<RemoteIdentityState, AuthorityError> {
        let operation = RemoteOperation::ListPairs;
        self.enter(operation).await?;

        let users = self.users.lock();
        let user = Self::authenticate(&users, operation, &identity.credentials)?;
        Ok(users[&user]
            .iter()
            .map(|p| CredentialPair::listed(p.id.clone(), p.status))
            .collect())
    }

    async fn create_pair(&self, auth: &AccessCredentials) -> Result<CredentialPair, AuthorityError> {
        let operation = RemoteOperation::CreatePair;
        self.enter(operation).await?;

        let mut users = self.users.lock();
        let user = Self::authenticate(&users, operation, auth)?;
        let pairs = users.entry(user).or_default();
        if pairs.len() >= MAX_PAIRS_PER_IDENTITY {
            return Err(AuthorityError::LimitExceeded { operation });
        }

        let (id, secret) = Self::generate_pair(operation)?;
        pairs.push(StoredPair {
            id: id.clone(),
            secret: secret.clone(),
            status: PairStatus::Active,
        });
        self.creations.fetch_add(1, Ordering::SeqCst);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(CredentialPair::created(id, secret))
    }

    async fn deactivate_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError> {
        let operation = RemoteOperation::DeactivatePair;
        self.enter(operation).await?;

        let mut users = self.users.lock();
        let user = Self::authenticate(&users, operation, auth)?;
        let pair = users
            .entry(user)
            .or_default()
            .iter_mut()
            .find(|p| &p.id == pair_id)
            .ok_or_else(|| AuthorityError::NoSuchPair {
                operation,
                pair_id: pair_id.clone(),
            })?;
        pair.status = PairStatus::Inactive;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError> {
        let operation = RemoteOperation::DeletePair;
        self.enter(operation).await?;

        let mut users = self.users.lock();
        let user = Self::authenticate(&users, operation, auth)?;
        let pairs = users.entry(user).or_default();
        let index = pairs
            .iter()
            .position(|p| &p.id == pair_id)
            .ok_or_else(|| AuthorityError::NoSuchPair {
                operation,
                pair_id: pair_id.clone(),
            })?;
        pairs.remove(index);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
