//! # Domain Events
//!
//! The closed set of events the program emits through its log stream.
//! Wire form: a log line `"Program data: <base64>"` whose payload starts
//! with an 8-byte discriminator (first 8 bytes of `sha256("event:<Name>")`)
//! followed by the little-endian event fields.
//!
//! Not every log line is an event; lines that do not decode are expected
//! noise and are skipped silently.

use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use mindclash_core::Address;
use mindclash_ledger::layout::{ByteReader, ByteWriter, LayoutError, DISCRIMINATOR_LEN};

/// Prefix the program puts in front of base64 event payloads.
const LOG_PREFIX: &str = "Program data: ";

/// First 8 bytes of `sha256("event:<name>")`.
#[must_use]
pub fn event_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(b"event:");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// A new warrior was minted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarriorCreated {
    /// Minting player.
    pub owner: Address,
    /// New warrior account.
    pub warrior: Address,
    /// Display name.
    pub name: String,
    /// Class tag.
    pub class: u8,
    /// Rarity tier.
    pub rarity: u8,
}

/// A battle room was opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomCreated {
    /// Room account.
    pub room: Address,
    /// Opening player.
    pub creator: Address,
    /// Sequential room id.
    pub room_id: u64,
}

/// A second player joined a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerJoined {
    /// Room account.
    pub room: Address,
    /// Joining player.
    pub player: Address,
    /// Warrior the player brought.
    pub warrior: Address,
}

/// A player signalled readiness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerReady {
    /// Room account.
    pub room: Address,
    /// Ready player.
    pub player: Address,
}

/// The creator cancelled a room before battle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomCancelled {
    /// Room account.
    pub room: Address,
    /// Cancelling creator.
    pub creator: Address,
}

/// The battle moved to in-progress. The one event whose absence is
/// operationally costly; see [`crate::fallback`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleStarted {
    /// Room account.
    pub room: Address,
    /// Slot A player.
    pub player_a: Address,
    /// Slot B player.
    pub player_b: Address,
    /// Slot A warrior display name.
    pub warrior_a: String,
    /// Slot B warrior display name.
    pub warrior_b: String,
    /// Slot A starting hit points.
    pub hp_a: u16,
    /// Slot B starting hit points.
    pub hp_b: u16,
}

/// An attack landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageDealt {
    /// Room account.
    pub room: Address,
    /// Attacking player.
    pub attacker: Address,
    /// Defending player.
    pub defender: Address,
    /// Damage amount.
    pub amount: u16,
    /// Defender hit points after the hit.
    pub defender_hp: u16,
}

/// A player locked in an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerSubmitted {
    /// Room account.
    pub room: Address,
    /// Answering player.
    pub player: Address,
    /// Zero-based question index.
    pub question_index: u8,
}

/// The program revealed whether an answer was correct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerRevealed {
    /// Room account.
    pub room: Address,
    /// Answering player.
    pub player: Address,
    /// Zero-based question index.
    pub question_index: u8,
    /// Whether the answer matched.
    pub correct: bool,
}

/// Scores after a completed round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundScored {
    /// Room account.
    pub room: Address,
    /// Slot A running score.
    pub score_a: u16,
    /// Slot B running score.
    pub score_b: u16,
}

/// The battle advanced to the next question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextQuestion {
    /// Room account.
    pub room: Address,
    /// Zero-based index of the upcoming question.
    pub question_index: u8,
}

/// A player's warrior dropped to zero hit points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerEliminated {
    /// Room account.
    pub room: Address,
    /// Eliminated player.
    pub player: Address,
}

/// The battle ended with a winner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleWon {
    /// Room account.
    pub room: Address,
    /// Winning player.
    pub winner: Address,
}

/// A warrior was handed to or reclaimed from the delegation program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationChanged {
    /// Warrior account.
    pub warrior: Address,
    /// True when handed off, false when reclaimed.
    pub delegated: bool,
}

/// A warrior returned to its owner after battle settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarriorReleased {
    /// Warrior account.
    pub warrior: Address,
    /// Original owner.
    pub owner: Address,
}

/// The closed set of domain events. Adding a kind here forces every
/// dispatch site to handle it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaEvent {
    /// See [`WarriorCreated`].
    WarriorCreated(WarriorCreated),
    /// See [`RoomCreated`].
    RoomCreated(RoomCreated),
    /// See [`PlayerJoined`].
    PlayerJoined(PlayerJoined),
    /// See [`PlayerReady`].
    PlayerReady(PlayerReady),
    /// See [`RoomCancelled`].
    RoomCancelled(RoomCancelled),
    /// See [`BattleStarted`].
    BattleStarted(BattleStarted),
    /// See [`DamageDealt`].
    DamageDealt(DamageDealt),
    /// See [`AnswerSubmitted`].
    AnswerSubmitted(AnswerSubmitted),
    /// See [`AnswerRevealed`].
    AnswerRevealed(AnswerRevealed),
    /// See [`RoundScored`].
    RoundScored(RoundScored),
    /// See [`NextQuestion`].
    NextQuestion(NextQuestion),
    /// See [`PlayerEliminated`].
    PlayerEliminated(PlayerEliminated),
    /// See [`BattleWon`].
    BattleWon(BattleWon),
    /// See [`DelegationChanged`].
    DelegationChanged(DelegationChanged),
    /// See [`WarriorReleased`].
    WarriorReleased(WarriorReleased),
}

impl ArenaEvent {
    /// The wire name of this event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WarriorCreated(_) => "WarriorCreated",
            Self::RoomCreated(_) => "RoomCreated",
            Self::PlayerJoined(_) => "PlayerJoined",
            Self::PlayerReady(_) => "PlayerReady",
            Self::RoomCancelled(_) => "RoomCancelled",
            Self::BattleStarted(_) => "BattleStarted",
            Self::DamageDealt(_) => "DamageDealt",
            Self::AnswerSubmitted(_) => "AnswerSubmitted",
            Self::AnswerRevealed(_) => "AnswerRevealed",
            Self::RoundScored(_) => "RoundScored",
            Self::NextQuestion(_) => "NextQuestion",
            Self::PlayerEliminated(_) => "PlayerEliminated",
            Self::BattleWon(_) => "BattleWon",
            Self::DelegationChanged(_) => "DelegationChanged",
            Self::WarriorReleased(_) => "WarriorReleased",
        }
    }

    /// Decodes a raw event payload (discriminator + fields).
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] for an unknown discriminator or a payload
    /// that does not match the kind's schema.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(LayoutError::Truncated {
                needed: DISCRIMINATOR_LEN - data.len(),
                offset: 0,
            });
        }
        let (disc, payload) = data.split_at(DISCRIMINATOR_LEN);
        let mut r = ByteReader::new(payload);

        let event = if disc == event_discriminator("WarriorCreated") {
            Self::WarriorCreated(WarriorCreated {
                owner: r.address()?,
                warrior: r.address()?,
                name: r.string()?,
                class: r.u8()?,
                rarity: r.u8()?,
            })
        } else if disc == event_discriminator("RoomCreated") {
            Self::RoomCreated(RoomCreated {
                room: r.address()?,
                creator: r.address()?,
                room_id: r.u64()?,
            })
        } else if disc == event_discriminator("PlayerJoined") {
            Self::PlayerJoined(PlayerJoined {
                room: r.address()?,
                player: r.address()?,
                warrior: r.address()?,
            })
        } else if disc == event_discriminator("PlayerReady") {
            Self::PlayerReady(PlayerReady {
                room: r.address()?,
                player: r.address()?,
            })
        } else if disc == event_discriminator("RoomCancelled") {
            Self::RoomCancelled(RoomCancelled {
                room: r.address()?,
                creator: r.address()?,
            })
        } else if disc == event_discriminator("BattleStarted") {
            Self::BattleStarted(BattleStarted {
                room: r.address()?,
                player_a: r.address()?,
                player_b: r.address()?,
                warrior_a: r.string()?,
                warrior_b: r.string()?,
                hp_a: r.u16()?,
                hp_b: r.u16()?,
            })
        } else if disc == event_discriminator("DamageDealt") {
            Self::DamageDealt(DamageDealt {
                room: r.address()?,
                attacker: r.address()?,
                defender: r.address()?,
                amount: r.u16()?,
                defender_hp: r.u16()?,
            })
        } else if disc == event_discriminator("AnswerSubmitted") {
            Self::AnswerSubmitted(AnswerSubmitted {
                room: r.address()?,
                player: r.address()?,
                question_index: r.u8()?,
            })
        } else if disc == event_discriminator("AnswerRevealed") {
            Self::AnswerRevealed(AnswerRevealed {
                room: r.address()?,
                player: r.address()?,
                question_index: r.u8()?,
                correct: r.bool()?,
            })
        } else if disc == event_discriminator("RoundScored") {
            Self::RoundScored(RoundScored {
                room: r.address()?,
                score_a: r.u16()?,
                score_b: r.u16()?,
            })
        } else if disc == event_discriminator("NextQuestion") {
            Self::NextQuestion(NextQuestion {
                room: r.address()?,
                question_index: r.u8()?,
            })
        } else if disc == event_discriminator("PlayerEliminated") {
            Self::PlayerEliminated(PlayerEliminated {
                room: r.address()?,
                player: r.address()?,
            })
        } else if disc == event_discriminator("BattleWon") {
            Self::BattleWon(BattleWon {
                room: r.address()?,
                winner: r.address()?,
            })
        } else if disc == event_discriminator("DelegationChanged") {
            Self::DelegationChanged(DelegationChanged {
                warrior: r.address()?,
                delegated: r.bool()?,
            })
        } else if disc == event_discriminator("WarriorReleased") {
            Self::WarriorReleased(WarriorReleased {
                warrior: r.address()?,
                owner: r.address()?,
            })
        } else {
            return Err(LayoutError::Discriminator);
        };
        Ok(event)
    }

    /// Encodes this event to its wire form (discriminator + fields).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.discriminator(&event_discriminator(self.kind()));
        match self {
            Self::WarriorCreated(e) => {
                w.address(&e.owner)
                    .address(&e.warrior)
                    .string(&e.name)
                    .u8(e.class)
                    .u8(e.rarity);
            }
            Self::RoomCreated(e) => {
                w.address(&e.room).address(&e.creator).u64(e.room_id);
            }
            Self::PlayerJoined(e) => {
                w.address(&e.room).address(&e.player).address(&e.warrior);
            }
            Self::PlayerReady(e) => {
                w.address(&e.room).address(&e.player);
            }
            Self::RoomCancelled(e) => {
                w.address(&e.room).address(&e.creator);
            }
            Self::BattleStarted(e) => {
                w.address(&e.room)
                    .address(&e.player_a)
                    .address(&e.player_b)
                    .string(&e.warrior_a)
                    .string(&e.warrior_b)
                    .u16(e.hp_a)
                    .u16(e.hp_b);
            }
            Self::DamageDealt(e) => {
                w.address(&e.room)
                    .address(&e.attacker)
                    .address(&e.defender)
                    .u16(e.amount)
                    .u16(e.defender_hp);
            }
            Self::AnswerSubmitted(e) => {
                w.address(&e.room).address(&e.player).u8(e.question_index);
            }
            Self::AnswerRevealed(e) => {
                w.address(&e.room)
                    .address(&e.player)
                    .u8(e.question_index)
                    .bool(e.correct);
            }
            Self::RoundScored(e) => {
                w.address(&e.room).u16(e.score_a).u16(e.score_b);
            }
            Self::NextQuestion(e) => {
                w.address(&e.room).u8(e.question_index);
            }
            Self::PlayerEliminated(e) => {
                w.address(&e.room).address(&e.player);
            }
            Self::BattleWon(e) => {
                w.address(&e.room).address(&e.winner);
            }
            Self::DelegationChanged(e) => {
                w.address(&e.warrior).bool(e.delegated);
            }
            Self::WarriorReleased(e) => {
                w.address(&e.warrior).address(&e.owner);
            }
        }
        w.finish()
    }

    /// Renders the event as the log line the program would emit.
    #[must_use]
    pub fn to_log_line(&self) -> String {
        format!("{LOG_PREFIX}{}", BASE64.encode(self.encode()))
    }
}

/// Scans one log line for an embedded event payload. `None` means the
/// line is not an event; that is expected and not an error.
#[must_use]
pub fn decode_log_line(line: &str) -> Option<ArenaEvent> {
    let encoded = line.strip_prefix(LOG_PREFIX)?;
    let bytes = BASE64.decode(encoded).ok()?;
    ArenaEvent::decode(&bytes).ok()
}

/// One delivered event: what happened, which transaction reported it,
/// and when this client saw it. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct EventRecord {
    /// The decoded event.
    pub event: ArenaEvent,
    /// Originating transaction signature, or a synthesized marker for
    /// fallback-detected events.
    pub signature: String,
    /// Local arrival time.
    pub received_at: SystemTime,
}

impl EventRecord {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn now(event: ArenaEvent, signature: impl Into<String>) -> Self {
        Self {
            event,
            signature: signature.into(),
            received_at: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_battle_started() -> ArenaEvent {
        ArenaEvent::BattleStarted(BattleStarted {
            room: Address::repeat_byte(1),
            player_a: Address::repeat_byte(2),
            player_b: Address::repeat_byte(3),
            warrior_a: "Rex".to_string(),
            warrior_b: "Nyx".to_string(),
            hp_a: 120,
            hp_b: 95,
        })
    }

    #[test]
    fn test_log_line_round_trip() {
        let event = sample_battle_started();
        let line = event.to_log_line();
        assert_eq!(decode_log_line(&line), Some(event));
    }

    #[test]
    fn test_non_event_lines_skipped() {
        assert_eq!(decode_log_line("Program log: instruction JoinRoom"), None);
        assert_eq!(decode_log_line("Program data: !!!not-base64!!!"), None);
        assert_eq!(decode_log_line(""), None);
    }

    #[test]
    fn test_unknown_discriminator_skipped() {
        let mut bytes = event_discriminator("SomethingElse").to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let line = format!("Program data: {}", BASE64.encode(&bytes));
        assert_eq!(decode_log_line(&line), None);
    }

    #[test]
    fn test_truncated_payload_skipped() {
        let event = sample_battle_started();
        let mut bytes = event.encode();
        bytes.truncate(bytes.len() - 10);
        assert!(ArenaEvent::decode(&bytes).is_err());
    }

    #[test]
    fn test_kind_matches_discriminator() {
        let event = sample_battle_started();
        let bytes = event.encode();
        assert_eq!(&bytes[..8], &event_discriminator(event.kind()));
        assert_eq!(event.kind(), "BattleStarted");
    }

    #[test]
    fn test_all_kinds_round_trip() {
        let room = Address::repeat_byte(1);
        let player = Address::repeat_byte(2);
        let events = vec![
            ArenaEvent::WarriorCreated(WarriorCreated {
                owner: player,
                warrior: Address::repeat_byte(4),
                name: "Rex".to_string(),
                class: 1,
                rarity: 2,
            }),
            ArenaEvent::RoomCreated(RoomCreated { room, creator: player, room_id: 7 }),
            ArenaEvent::PlayerJoined(PlayerJoined {
                room,
                player,
                warrior: Address::repeat_byte(4),
            }),
            ArenaEvent::PlayerReady(PlayerReady { room, player }),
            ArenaEvent::RoomCancelled(RoomCancelled { room, creator: player }),
            sample_battle_started(),
            ArenaEvent::DamageDealt(DamageDealt {
                room,
                attacker: player,
                defender: Address::repeat_byte(3),
                amount: 12,
                defender_hp: 88,
            }),
            ArenaEvent::AnswerSubmitted(AnswerSubmitted { room, player, question_index: 3 }),
            ArenaEvent::AnswerRevealed(AnswerRevealed {
                room,
                player,
                question_index: 3,
                correct: true,
            }),
            ArenaEvent::RoundScored(RoundScored { room, score_a: 2, score_b: 1 }),
            ArenaEvent::NextQuestion(NextQuestion { room, question_index: 4 }),
            ArenaEvent::PlayerEliminated(PlayerEliminated { room, player }),
            ArenaEvent::BattleWon(BattleWon { room, winner: player }),
            ArenaEvent::DelegationChanged(DelegationChanged {
                warrior: Address::repeat_byte(4),
                delegated: true,
            }),
            ArenaEvent::WarriorReleased(WarriorReleased {
                warrior: Address::repeat_byte(4),
                owner: player,
            }),
        ];
        for event in events {
            let decoded = ArenaEvent::decode(&event.encode()).unwrap();
            assert_eq!(decoded, event, "{} did not round-trip", event.kind());
        }
    }
}
