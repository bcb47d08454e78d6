//! keyrot rotation engine
//!
//! Rotates long-lived access key pairs recorded in a shared credentials file
//! against an authority that allows at most two pairs per identity.
//!
//! # Features
//!
//! - **Pure planner** - decides deletions, creation and deactivation from the
//!   remote state and the locally recorded pair, refusing to guess
//! - **Ordered executor** - each step confirmed before the next, no retries
//! - **Safe file updates** - locked, line-preserving, atomic rewrite
//! - **Pluggable authorities** - AWS IAM (feature `iam`) and in-memory
//!
//! ```
//! use keyrot_rotation::rotation::{Action, plan};
//! use keyrot_rotation::{CredentialPair, PairId, PairStatus, RemoteIdentityState};
//!
//! let k1 = PairId::new("AKIAK1").unwrap();
//! let state: RemoteIdentityState =
//!     [CredentialPair::listed(k1.clone(), PairStatus::Active)].into_iter().collect();
//!
//! let plan = plan(&state, Some(&k1)).unwrap();
//! assert_eq!(plan.actions(), &[Action::CreateNew, Action::Deactivate(k1)]);
//! ```

#![forbid(unsafe_code)]

/// Core types and errors
pub mod core;
/// Multi-profile runs
pub mod orchestrator;
/// Key authority backends
pub mod providers;
/// Planning and execution
pub mod rotation;
/// Credentials file store
pub mod store;
/// Seams to the outside world
pub mod traits;
pub mod utils;

pub use crate::core::{
    AccessCredentials, AuthorityError, ConfigurationError, CredentialPair, Identity, LocalRecord,
    PairId, PairStatus, RemoteIdentityState, RemoteOperation, StoreError, ValidationError,
};
pub use crate::rotation::{RotationError, RotationOptions, RotationOutcome, RotationResult};
pub use crate::utils::SecretString;

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::{
        AccessCredentials, ConfigurationError, CredentialPair, LocalRecord, PairId, PairStatus,
        RemoteIdentityState,
    };
    pub use crate::orchestrator::{Orchestrator, ProfileSelection, RunReport};
    pub use crate::providers::InMemoryAuthority;
    #[cfg(feature = "iam")]
    pub use crate::providers::{IamAuthority, IamAuthorityConfig};
    pub use crate::rotation::{RotationOptions, RotationOutcome, Rotator, Stage};
    pub use crate::store::CredentialsFile;
    pub use crate::traits::{KeyAuthority, PairSink};
    pub use crate::utils::SecretString;
}
