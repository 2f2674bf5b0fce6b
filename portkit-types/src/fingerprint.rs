//! Non-cryptographic 32-bit rolling-hash fingerprint.
//!
//! Used as tamper/corruption evidence on export files and as a short cache
//! key elsewhere. It is not a security boundary: collisions are cheap to find.
//!
//! The hash walks UTF-16 code units so a string produces the same value here
//! as it does in the browser workbench that reads the same files:
//! `hash = (hash << 5) - hash + unit`, truncated to 32 bits after each step.
//! The absolute value is rendered as 8 lowercase hex digits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// An 8-hex-digit fingerprint of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Fingerprints a string.
    #[must_use]
    pub fn of(input: &str) -> Self {
        let mut hash: i32 = 0;
        for unit in input.encode_utf16() {
            hash = hash
                .wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit));
        }
        // i32::MIN has no positive i32 counterpart; widen before taking abs.
        Self(i64::from(hash).unsigned_abs() as u32)
    }

    /// Fingerprints the compact JSON serialization of a value.
    pub fn of_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        let text = serde_json::to_string(value)?;
        Ok(Self::of(&text))
    }

    /// Returns the raw 32-bit value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidFingerprint(s.to_string()));
        }
        u32::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| Error::InvalidFingerprint(s.to_string()))
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Convenience: fingerprint a string and render it as hex.
#[must_use]
pub fn fingerprint_str(input: &str) -> String {
    Fingerprint::of(input).to_string()
}
