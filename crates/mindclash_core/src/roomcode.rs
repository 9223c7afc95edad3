//! # Room-Code Codec
//!
//! Deterministic, stateless transform between a human-shareable room code
//! and the derived battle-room account address.
//!
//! A room code is the URL-safe, unpadded base64 encoding of the 32 random
//! seed bytes the room was created with. The room's account address is
//! derived from a fixed namespace tag plus those seed bytes plus the
//! program id - the same rule the on-chain program uses, so both sides
//! arrive at the same address without any lookup.
//!
//! The codec is a pure bijection over valid seeds:
//! `decode(encode(s)).seed == s` for every 32-byte `s`. Malformed input
//! fails closed with [`CoreError::InvalidRoomCode`]; no partial or garbage
//! address is ever derived.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::CoreError;

/// Namespace tag mixed into room address derivation.
const ROOM_NAMESPACE: &[u8] = b"battle_room";

/// Exact decoded length of a valid room code.
pub const ROOM_SEED_LEN: usize = 32;

/// A decoded room code: the raw seed plus the address derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoomSeed {
    /// The 32 seed bytes the room was created with.
    pub seed: [u8; ROOM_SEED_LEN],
    /// The derived battle-room account address.
    pub room_address: Address,
}

/// Encodes 32 seed bytes into a shareable room code.
#[must_use]
pub fn encode_room_code(seed: &[u8; ROOM_SEED_LEN]) -> String {
    URL_SAFE_NO_PAD.encode(seed)
}

/// Decodes a room code and derives the battle-room account address.
///
/// # Errors
///
/// Returns [`CoreError::InvalidRoomCode`] when the input is not valid
/// URL-safe base64 or does not decode to exactly 32 bytes.
pub fn decode_room_code(code: &str, program_id: &Address) -> Result<RoomSeed, CoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(code.trim())
        .map_err(|e| CoreError::InvalidRoomCode(e.to_string()))?;

    let seed: [u8; ROOM_SEED_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
        CoreError::InvalidRoomCode(format!("decoded to {} bytes, expected {ROOM_SEED_LEN}", b.len()))
    })?;

    Ok(RoomSeed {
        seed,
        room_address: derive_room_address(&seed, program_id),
    })
}

/// Derives the battle-room account address for a seed.
///
/// Mirrors the program's own derivation: a hash over the namespace tag,
/// the seed bytes and the program id. Pure function, no I/O.
#[must_use]
pub fn derive_room_address(seed: &[u8; ROOM_SEED_LEN], program_id: &Address) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(ROOM_NAMESPACE);
    hasher.update(seed);
    hasher.update(program_id.as_bytes());
    Address(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_id() -> Address {
        Address::repeat_byte(0xAB)
    }

    #[test]
    fn test_round_trip_all_byte_patterns() {
        for b in [0u8, 1, 0x7F, 0x80, 0xFF] {
            let seed = [b; ROOM_SEED_LEN];
            let code = encode_room_code(&seed);
            let decoded = decode_room_code(&code, &program_id()).unwrap();
            assert_eq!(decoded.seed, seed);
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let seed = [42u8; ROOM_SEED_LEN];
        let a = derive_room_address(&seed, &program_id());
        let b = derive_room_address(&seed, &program_id());
        assert_eq!(a, b);
        // Different program id, different address.
        let c = derive_room_address(&seed, &Address::repeat_byte(1));
        assert_ne!(a, c);
    }

    #[test]
    fn test_wrong_length_fails_closed() {
        let short = URL_SAFE_NO_PAD.encode([1u8; 16]);
        let long = URL_SAFE_NO_PAD.encode([1u8; 48]);
        for code in [short, long] {
            match decode_room_code(&code, &program_id()) {
                Err(CoreError::InvalidRoomCode(_)) => {}
                other => panic!("expected InvalidRoomCode, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_alphabet_fails_closed() {
        // '+' and '/' belong to the standard alphabet, not the URL-safe one.
        let result = decode_room_code("ab+/cd==!", &program_id());
        assert!(matches!(result, Err(CoreError::InvalidRoomCode(_))));
    }

    #[test]
    fn test_code_is_url_safe_and_unpadded() {
        let code = encode_room_code(&[0xFFu8; ROOM_SEED_LEN]);
        assert!(!code.contains('='));
        assert!(!code.contains('+'));
        assert!(!code.contains('/'));
    }
}
