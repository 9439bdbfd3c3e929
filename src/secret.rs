//! Secret handling for passphrase-based methods.
//!
//! # Security Model
//!
//! **CRITICAL**: Secrets are NEVER passed via CLI arguments (visible in `ps aux`)
//! and never logged. They only travel to the tool over its controlling terminal.
//! The `Secret` wrapper redacts itself in `Debug` output and overwrites its
//! buffer with zeros when dropped.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder printed wherever a secret would otherwise appear.
pub const REDACTED: &str = "********";

/// Punctuation accepted by the strength policy (space included).
pub const PUNCTUATION: &str = "~`!@#$%^&*()_-+={[}]|\\:;\"'<,>.?/ ";

/// Minimum length, in characters, of a strong secret.
pub const MIN_STRONG_LEN: usize = 12;

/// Owned secret string that never prints its content.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret for writing to the terminal.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the tool will ask for an extra confirmation before accepting it.
    pub fn is_strong(&self) -> bool {
        is_strong_secret(&self.0)
    }

    /// Replace every occurrence of the secret in `text` with [`REDACTED`].
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, REDACTED)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Strength Policy
// ============================================================================

pub fn has_uppercase(secret: &str) -> bool {
    secret.chars().any(|c| c.is_ascii_uppercase())
}

pub fn has_lowercase(secret: &str) -> bool {
    secret.chars().any(|c| c.is_ascii_lowercase())
}

pub fn has_digit(secret: &str) -> bool {
    secret.chars().any(|c| c.is_ascii_digit())
}

pub fn has_punctuation(secret: &str) -> bool {
    secret.chars().any(|c| PUNCTUATION.contains(c))
}

/// Strength predicate gating which prompt script variant runs.
///
/// A secret is strong when it has at least [`MIN_STRONG_LEN`] characters and at
/// least one uppercase letter, one lowercase letter, one digit and one character
/// from [`PUNCTUATION`]. The tool asks for explicit confirmation of anything weaker.
pub fn is_strong_secret(secret: &str) -> bool {
    secret.chars().count() >= MIN_STRONG_LEN
        && has_uppercase(secret)
        && has_lowercase(secret)
        && has_digit(secret)
        && has_punctuation(secret)
}
