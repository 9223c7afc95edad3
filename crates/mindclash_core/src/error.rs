//! # Core Errors
//!
//! Validation and configuration errors shared across the client core.
//! Transient network failures are modeled in the crates that own the
//! corresponding transport; only input-shaped failures live here.

use thiserror::Error;

/// Errors produced by core primitives.
///
/// These are validation errors in the taxonomy sense: they fail fast, are
/// surfaced immediately and are never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A room code did not decode to exactly 32 seed bytes, or used an
    /// invalid alphabet. The codec fails closed - no partial address is
    /// ever derived from malformed input.
    #[error("invalid room code: {0}")]
    InvalidRoomCode(String),

    /// An address string was not valid base58 of the expected length.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The settings file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}
