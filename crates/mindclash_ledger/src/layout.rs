//! # Account Layouts
//!
//! Fixed-schema byte decoding for the program's accounts. Every account
//! starts with an 8-byte discriminator (the first 8 bytes of
//! `sha256("account:<Name>")`) followed by little-endian fields.
//!
//! Decode failures are expected noise for the watchers (not every account
//! notification is one of ours) and hard errors for direct fetchers; the
//! caller decides.

use sha2::{Digest, Sha256};
use thiserror::Error;

use mindclash_core::Address;

/// Length of the account discriminator prefix.
pub const DISCRIMINATOR_LEN: usize = 8;

/// An account payload that does not match its fixed layout.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// Fewer bytes than the schema requires.
    #[error("truncated payload: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Bytes still required.
        needed: usize,
        /// Read position where the shortfall occurred.
        offset: usize,
    },
    /// The 8-byte prefix does not match the expected account kind.
    #[error("discriminator mismatch")]
    Discriminator,
    /// An embedded string was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    Utf8,
    /// A field held a value outside its domain.
    #[error("invalid field value: {0}")]
    Value(String),
}

/// Computes the discriminator for an account name.
#[must_use]
pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(b"account:");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// The account kinds this client reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountKind {
    /// Global game configuration singleton.
    Config,
    /// Per-player profile.
    Profile,
    /// A warrior.
    Warrior,
    /// A battle room.
    BattleRoom,
}

impl AccountKind {
    /// The layout name hashed into the discriminator.
    #[must_use]
    pub const fn layout_name(self) -> &'static str {
        match self {
            Self::Config => "GameConfig",
            Self::Profile => "PlayerProfile",
            Self::Warrior => "Warrior",
            Self::BattleRoom => "BattleRoom",
        }
    }

    /// The discriminator prefix for this kind.
    #[must_use]
    pub fn discriminator(self) -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(self.layout_name())
    }
}

// ── Byte cursor ─────────────────────────────────────────────────────

/// Little-endian read cursor over a raw account payload.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a cursor at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        if self.remaining() < n {
            return Err(LayoutError::Truncated {
                needed: n - self.remaining(),
                offset: self.pos,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, LayoutError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a bool encoded as a single byte (0 or 1).
    pub fn bool(&mut self) -> Result<bool, LayoutError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LayoutError::Value(format!("bool byte {other}"))),
        }
    }

    /// Reads a little-endian u16.
    pub fn u16(&mut self) -> Result<u16, LayoutError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian u32.
    pub fn u32(&mut self) -> Result<u32, LayoutError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian u64.
    pub fn u64(&mut self) -> Result<u64, LayoutError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a little-endian i64.
    pub fn i64(&mut self) -> Result<i64, LayoutError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(i64::from_le_bytes(buf))
    }

    /// Reads a 32-byte address.
    pub fn address(&mut self) -> Result<Address, LayoutError> {
        let b = self.take(32)?;
        let mut buf = [0u8; 32];
        buf.copy_from_slice(b);
        Ok(Address(buf))
    }

    /// Reads a length-prefixed UTF-8 string (u32 length).
    pub fn string(&mut self) -> Result<String, LayoutError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| LayoutError::Utf8)
    }

    /// Reads a length-prefixed vec of u16 ids (u32 length).
    pub fn vec_u16(&mut self) -> Result<Vec<u16>, LayoutError> {
        let len = self.u32()? as usize;
        (0..len).map(|_| self.u16()).collect()
    }

    /// Reads a length-prefixed vec of bytes (u32 length).
    pub fn vec_u8(&mut self) -> Result<Vec<u8>, LayoutError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads `Option<Address>` encoded as flag byte + 32 bytes.
    pub fn opt_address(&mut self) -> Result<Option<Address>, LayoutError> {
        if self.bool()? {
            Ok(Some(self.address()?))
        } else {
            // The 32 bytes are present but unset; skip them.
            self.take(32)?;
            Ok(None)
        }
    }

    /// Verifies and consumes the discriminator prefix.
    pub fn discriminator(&mut self, expected: &[u8; DISCRIMINATOR_LEN]) -> Result<(), LayoutError> {
        let actual = self.take(DISCRIMINATOR_LEN)?;
        if actual == expected {
            Ok(())
        } else {
            Err(LayoutError::Discriminator)
        }
    }
}

/// Little-endian writer mirroring [`ByteReader`].
///
/// The canonical encoder for the wire layouts; fixtures and the event
/// encoder are built on it.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer and returns the bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Writes one byte.
    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    /// Writes a bool as one byte.
    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(u8::from(v))
    }

    /// Writes a little-endian u16.
    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Writes a little-endian u32.
    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Writes a little-endian u64.
    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Writes a little-endian i64.
    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Writes a 32-byte address.
    pub fn address(&mut self, v: &Address) -> &mut Self {
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn string(&mut self, v: &str) -> &mut Self {
        self.u32(v.len() as u32);
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    /// Writes a length-prefixed vec of u16 ids.
    pub fn vec_u16(&mut self, v: &[u16]) -> &mut Self {
        self.u32(v.len() as u32);
        for id in v {
            self.u16(*id);
        }
        self
    }

    /// Writes a length-prefixed vec of bytes.
    pub fn vec_u8(&mut self, v: &[u8]) -> &mut Self {
        self.u32(v.len() as u32);
        self.buf.extend_from_slice(v);
        self
    }

    /// Writes `Option<Address>` as flag byte + 32 bytes.
    pub fn opt_address(&mut self, v: Option<&Address>) -> &mut Self {
        match v {
            Some(addr) => {
                self.bool(true);
                self.address(addr)
            }
            None => {
                self.bool(false);
                self.address(&Address::ZERO)
            }
        }
    }

    /// Writes a discriminator prefix.
    pub fn discriminator(&mut self, d: &[u8; DISCRIMINATOR_LEN]) -> &mut Self {
        self.buf.extend_from_slice(d);
        self
    }
}

// ── Account layouts ─────────────────────────────────────────────────

/// Global game configuration account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfigAccount {
    /// Admin authority.
    pub admin: Address,
    /// Delegation program warriors are handed to for low-latency play.
    pub delegation_program: Address,
    /// Total warriors minted.
    pub warrior_count: u64,
    /// Total rooms created.
    pub room_count: u64,
    /// Whether the program is paused.
    pub paused: bool,
}

impl GameConfigAccount {
    /// Decodes a raw config account payload.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the payload does not match the schema.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut r = ByteReader::new(data);
        r.discriminator(&AccountKind::Config.discriminator())?;
        Ok(Self {
            admin: r.address()?,
            delegation_program: r.address()?,
            warrior_count: r.u64()?,
            room_count: r.u64()?,
            paused: r.bool()?,
        })
    }

    /// Encodes this account to its wire layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.discriminator(&AccountKind::Config.discriminator())
            .address(&self.admin)
            .address(&self.delegation_program)
            .u64(self.warrior_count)
            .u64(self.room_count)
            .bool(self.paused);
        w.finish()
    }
}

/// Per-player profile account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerProfileAccount {
    /// Wallet that owns the profile.
    pub owner: Address,
    /// Display name.
    pub name: String,
    /// Battles won.
    pub wins: u32,
    /// Battles lost.
    pub losses: u32,
    /// Warriors currently owned.
    pub warrior_count: u32,
}

impl PlayerProfileAccount {
    /// Decodes a raw profile account payload.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the payload does not match the schema.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut r = ByteReader::new(data);
        r.discriminator(&AccountKind::Profile.discriminator())?;
        Ok(Self {
            owner: r.address()?,
            name: r.string()?,
            wins: r.u32()?,
            losses: r.u32()?,
            warrior_count: r.u32()?,
        })
    }

    /// Encodes this account to its wire layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.discriminator(&AccountKind::Profile.discriminator())
            .address(&self.owner)
            .string(&self.name)
            .u32(self.wins)
            .u32(self.losses)
            .u32(self.warrior_count);
        w.finish()
    }
}

/// A warrior account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarriorAccount {
    /// Logical owner recorded in the payload. Stays the player's wallet
    /// even while the account itself is held by the delegation program.
    pub owner: Address,
    /// Display name.
    pub name: String,
    /// Class id (see `WarriorClass`).
    pub class: u8,
    /// Rarity id (see `WarriorRarity`).
    pub rarity: u8,
    /// Attack stat.
    pub attack: u16,
    /// Defense stat.
    pub defense: u16,
    /// Knowledge stat.
    pub knowledge: u16,
    /// Current hit points.
    pub hp: u16,
    /// Maximum hit points.
    pub max_hp: u16,
    /// Unix timestamp until which the warrior is cooling down.
    pub cooldown_until: i64,
    /// Battles fought.
    pub battles: u32,
}

impl WarriorAccount {
    /// Decodes a raw warrior account payload.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the payload does not match the schema.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut r = ByteReader::new(data);
        r.discriminator(&AccountKind::Warrior.discriminator())?;
        Ok(Self {
            owner: r.address()?,
            name: r.string()?,
            class: r.u8()?,
            rarity: r.u8()?,
            attack: r.u16()?,
            defense: r.u16()?,
            knowledge: r.u16()?,
            hp: r.u16()?,
            max_hp: r.u16()?,
            cooldown_until: r.i64()?,
            battles: r.u32()?,
        })
    }

    /// Encodes this account to its wire layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.discriminator(&AccountKind::Warrior.discriminator())
            .address(&self.owner)
            .string(&self.name)
            .u8(self.class)
            .u8(self.rarity)
            .u16(self.attack)
            .u16(self.defense)
            .u16(self.knowledge)
            .u16(self.hp)
            .u16(self.max_hp)
            .i64(self.cooldown_until)
            .u32(self.battles);
        w.finish()
    }
}

/// One player slot inside a battle room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSlot {
    /// Whether the slot is occupied.
    pub present: bool,
    /// Player wallet.
    pub player: Address,
    /// Derived warrior account the player entered with.
    pub warrior: Address,
    /// Display name at join time.
    pub name: String,
}

impl RoomSlot {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            present: r.bool()?,
            player: r.address()?,
            warrior: r.address()?,
            name: r.string()?,
        })
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.bool(self.present)
            .address(&self.player)
            .address(&self.warrior)
            .string(&self.name);
    }
}

/// A battle room account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleRoomAccount {
    /// Monotonic room id.
    pub room_id: u64,
    /// Creator wallet.
    pub creator: Address,
    /// Lifecycle phase id (see `RoomPhase`).
    pub phase: u8,
    /// Current battle HP of slot 0's warrior.
    pub hp_a: u16,
    /// Current battle HP of slot 1's warrior.
    pub hp_b: u16,
    /// The two player slots.
    pub slots: [RoomSlot; 2],
    /// Concept ids selected for this room.
    pub concept_ids: Vec<u16>,
    /// Topic ids selected for this room (two per concept).
    pub topic_ids: Vec<u16>,
    /// Question ids selected for this room (one per topic).
    pub question_ids: Vec<u16>,
    /// Slot 0's submitted answers (255 = not answered).
    pub answers_a: Vec<u8>,
    /// Slot 1's submitted answers (255 = not answered).
    pub answers_b: Vec<u8>,
    /// Slot 0's score.
    pub score_a: u32,
    /// Slot 1's score.
    pub score_b: u32,
    /// Winner, once the battle completed.
    pub winner: Option<Address>,
}

impl BattleRoomAccount {
    /// Decodes a raw battle-room account payload.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the payload does not match the schema.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut r = ByteReader::new(data);
        r.discriminator(&AccountKind::BattleRoom.discriminator())?;
        Ok(Self {
            room_id: r.u64()?,
            creator: r.address()?,
            phase: r.u8()?,
            hp_a: r.u16()?,
            hp_b: r.u16()?,
            slots: [RoomSlot::decode(&mut r)?, RoomSlot::decode(&mut r)?],
            concept_ids: r.vec_u16()?,
            topic_ids: r.vec_u16()?,
            question_ids: r.vec_u16()?,
            answers_a: r.vec_u8()?,
            answers_b: r.vec_u8()?,
            score_a: r.u32()?,
            score_b: r.u32()?,
            winner: r.opt_address()?,
        })
    }

    /// Encodes this account to its wire layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.discriminator(&AccountKind::BattleRoom.discriminator())
            .u64(self.room_id)
            .address(&self.creator)
            .u8(self.phase)
            .u16(self.hp_a)
            .u16(self.hp_b);
        self.slots[0].encode(&mut w);
        self.slots[1].encode(&mut w);
        w.vec_u16(&self.concept_ids)
            .vec_u16(&self.topic_ids)
            .vec_u16(&self.question_ids)
            .vec_u8(&self.answers_a)
            .vec_u8(&self.answers_b)
            .u32(self.score_a)
            .u32(self.score_b)
            .opt_address(self.winner.as_ref());
        w.finish()
    }
}

/// Derives a program account address from a tag and seed parts.
///
/// Same rule the program uses: a hash over the tag, each seed and the
/// program id.
#[must_use]
pub fn derive_address(tag: &[u8], seeds: &[&[u8]], program_id: &Address) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    Address(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warrior() -> WarriorAccount {
        WarriorAccount {
            owner: Address::repeat_byte(3),
            name: "Rex".to_string(),
            class: 1,
            rarity: 2,
            attack: 40,
            defense: 25,
            knowledge: 60,
            hp: 100,
            max_hp: 120,
            cooldown_until: 1_700_000_000,
            battles: 7,
        }
    }

    fn room() -> BattleRoomAccount {
        BattleRoomAccount {
            room_id: 9,
            creator: Address::repeat_byte(1),
            phase: 4,
            hp_a: 100,
            hp_b: 80,
            slots: [
                RoomSlot {
                    present: true,
                    player: Address::repeat_byte(1),
                    warrior: Address::repeat_byte(0x10),
                    name: "Rex".to_string(),
                },
                RoomSlot {
                    present: true,
                    player: Address::repeat_byte(2),
                    warrior: Address::repeat_byte(0x20),
                    name: "Zed".to_string(),
                },
            ],
            concept_ids: vec![1, 2],
            topic_ids: vec![10, 11, 20, 21],
            question_ids: vec![100, 101, 102, 103],
            answers_a: vec![255, 255, 255, 255],
            answers_b: vec![0, 255, 255, 255],
            score_a: 0,
            score_b: 1,
            winner: None,
        }
    }

    #[test]
    fn test_warrior_round_trip() {
        let account = warrior();
        let decoded = WarriorAccount::decode(&account.encode()).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_room_round_trip() {
        let account = room();
        let decoded = BattleRoomAccount::decode(&account.encode()).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let bytes = warrior().encode();
        assert_eq!(
            BattleRoomAccount::decode(&bytes),
            Err(LayoutError::Discriminator)
        );
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let bytes = warrior().encode();
        let result = WarriorAccount::decode(&bytes[..bytes.len() - 4]);
        assert!(matches!(result, Err(LayoutError::Truncated { .. })));
    }

    #[test]
    fn test_discriminators_distinct() {
        let kinds = [
            AccountKind::Config,
            AccountKind::Profile,
            AccountKind::Warrior,
            AccountKind::BattleRoom,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.discriminator(), b.discriminator());
            }
        }
    }

    #[test]
    fn test_derive_address_deterministic() {
        let program = Address::repeat_byte(9);
        let a = derive_address(b"profile", &[&[1u8; 32]], &program);
        let b = derive_address(b"profile", &[&[1u8; 32]], &program);
        assert_eq!(a, b);
        assert_ne!(a, derive_address(b"warrior", &[&[1u8; 32]], &program));
    }
}
