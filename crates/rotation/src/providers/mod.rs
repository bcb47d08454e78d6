//! Key authority implementations
//!
//! Every backend implements [`KeyAuthority`](crate::traits::KeyAuthority).

// In-memory authority (always available)
pub mod memory;

// AWS IAM
#[cfg(feature = "iam")]
pub mod iam;

pub use memory::InMemoryAuthority;

#[cfg(feature = "iam")]
pub use iam::{IamAuthority, IamAuthorityConfig};
