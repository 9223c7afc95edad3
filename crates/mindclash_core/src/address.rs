//! # Ledger Addresses
//!
//! 32-byte program account addresses with base58 display, matching the
//! encoding the ledger uses on its own surfaces.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A 32-byte ledger address.
///
/// Equality of addresses - not reference identity - is what establishes
/// ownership everywhere in the client core.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address, used as a sentinel for unset participants.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns an address with every byte set to `b` (test fixtures).
    #[inline]
    #[must_use]
    pub const fn repeat_byte(b: u8) -> Self {
        Self([b; 32])
    }

    /// Whether this is the zero sentinel.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidAddress(format!("wrong length for {s}")))?;
        Ok(Self(bytes))
    }
}
