//! Content-derived commit references.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a ref in bytes (SHA-256).
pub const REF_LEN: usize = 32;

/// A 32-byte SHA-256 digest identifying a commit.
///
/// Rendered as 64 lowercase hex characters in logs and on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ref([u8; REF_LEN]);

impl Ref {
    /// Creates a ref from raw digest bytes.
    pub fn from_bytes(bytes: [u8; REF_LEN]) -> Self {
        Ref(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; REF_LEN] {
        &self.0
    }

    /// The all-zero ref. Never produced by a commit.
    pub fn zero() -> Self {
        Ref([0u8; REF_LEN])
    }

    /// Full hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parses a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != REF_LEN * 2 || !s.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; REF_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Ref(bytes))
    }

    /// First 8 hex characters, for log output.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({}...)", self.short())
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Ref {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ref::from_hex(s).ok_or_else(|| StoreError::InvalidRef(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let mut bytes = [0u8; REF_LEN];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let r = Ref::from_bytes(bytes);
        let hex = r.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab"));
        assert_eq!(hex.parse::<Ref>().unwrap(), r);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(Ref::from_hex("abc").is_none());
        assert!(Ref::from_hex(&"zz".repeat(32)).is_none());
        assert!(matches!(
            "not-a-ref".parse::<Ref>(),
            Err(StoreError::InvalidRef(_))
        ));
    }

    #[test]
    fn short_and_debug() {
        let r = Ref::from_bytes([0x12; REF_LEN]);
        assert_eq!(r.short(), "12121212");
        assert_eq!(format!("{:?}", r), "Ref(12121212...)");
    }
}
