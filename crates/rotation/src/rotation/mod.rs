//! Credential pair rotation
//!
//! - [`plan`]: pure decision table from remote state to [`RotationPlan`]
//! - [`RotationExecutor`]: applies a plan through a
//!   [`KeyAuthority`](crate::traits::KeyAuthority)
//! - [`Rotator`]: list → plan → execute for a single profile

pub mod error;
pub mod executor;
pub mod outcome;
pub mod plan;
pub mod rotator;

pub use error::{PlanError, RotationError, RotationResult};
pub use executor::{ExecutionFailure, RotationExecutor};
pub use outcome::{RotationOutcome, Stage};
pub use plan::{Action, MAX_PAIRS_PER_IDENTITY, RotationPlan, plan};
pub use rotator::{DEFAULT_CALL_TIMEOUT, RotationOptions, Rotator};
