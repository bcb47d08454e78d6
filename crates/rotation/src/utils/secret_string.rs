//! Secret string type with automatic zeroization
//!
//! Holds secret access keys. The value is only reachable inside a closure
//! passed to [`SecretString::expose_secret`], and memory is wiped on drop.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string with automatic memory zeroization
///
/// # Examples
///
/// ```
/// use keyrot_rotation::SecretString;
///
/// let secret = SecretString::new("wJalrXUtnFEMI/K7MDENG");
/// let len = secret.expose_secret(|value| value.len());
/// assert_eq!(len, 21);
///
/// // Redacted in debug output
/// assert_eq!(format!("{secret:?}"), "[REDACTED]");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    /// Creates a new secret from any string-like value
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self { inner: s.into() }
    }

    /// Accesses the secret value within a closure scope
    pub fn expose_secret<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        f(&self.inner)
    }

    /// Returns the length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Constant-shape comparison against another secret.
    ///
    /// Used by the in-memory authority to check presented credentials.
    pub fn matches(&self, other: &SecretString) -> bool {
        let (a, b) = (self.inner.as_bytes(), other.inner.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// Reports and logs serialize pairs; the secret never leaves this way.
impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_expose_secret() {
        let secret = SecretString::new("my_secret");
        let len = secret.expose_secret(|s| s.len());
        assert_eq!(len, 9);
        secret.expose_secret(|s| assert_eq!(s, "my_secret"));
    }

    #[test]
    fn test_secret_string_debug_and_display_redacted() {
        let secret = SecretString::new("super_secret_password");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn test_secret_string_serialize_redacted() {
        let secret = SecretString::new("should_be_redacted");
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
    }

    #[test]
    fn test_secret_string_matches() {
        let a = SecretString::new("abc");
        assert!(a.matches(&SecretString::new("abc")));
        assert!(!a.matches(&SecretString::new("abd")));
        assert!(!a.matches(&SecretString::new("abcd")));
    }
}
