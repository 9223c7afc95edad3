//! # Snapshots
//!
//! Read-only domain projections of raw account state. A snapshot is
//! rebuilt on every fetch and never mutated in place; consumers treat a
//! fresh snapshot as authoritative whenever event-stream continuity is in
//! doubt.

use mindclash_core::Address;

use crate::layout::{
    BattleRoomAccount, GameConfigAccount, LayoutError, PlayerProfileAccount, WarriorAccount,
};

/// Battle room lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoomPhase {
    /// Created by one player, waiting for an opponent.
    Created,
    /// Both players joined.
    Joined,
    /// Quiz content has been selected on-chain.
    QuestionsSelected,
    /// Warriors are ready to hand off to the delegation program.
    ReadyForDelegation,
    /// The battle is running.
    InProgress,
    /// The battle finished with a winner.
    Completed,
    /// The room was cancelled before completion.
    Cancelled,
}

impl RoomPhase {
    /// Maps the on-chain phase id.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Created),
            1 => Some(Self::Joined),
            2 => Some(Self::QuestionsSelected),
            3 => Some(Self::ReadyForDelegation),
            4 => Some(Self::InProgress),
            5 => Some(Self::Completed),
            6 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the room can still transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Warrior class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarriorClass {
    /// High knowledge, low defense.
    Scholar,
    /// High defense.
    Guardian,
    /// Balanced.
    Mystic,
    /// High attack.
    Berserker,
}

impl WarriorClass {
    /// Maps the on-chain class id.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Scholar),
            1 => Some(Self::Guardian),
            2 => Some(Self::Mystic),
            3 => Some(Self::Berserker),
            _ => None,
        }
    }
}

/// Warrior rarity tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WarriorRarity {
    /// Common.
    Common,
    /// Uncommon.
    Uncommon,
    /// Rare.
    Rare,
    /// Legendary.
    Legendary,
}

impl WarriorRarity {
    /// Maps the on-chain rarity id.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Common),
            1 => Some(Self::Uncommon),
            2 => Some(Self::Rare),
            3 => Some(Self::Legendary),
            _ => None,
        }
    }
}

/// Warrior stat block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatBlock {
    /// Attack.
    pub attack: u16,
    /// Defense.
    pub defense: u16,
    /// Knowledge (drives quiz scoring weight).
    pub knowledge: u16,
    /// Current hit points.
    pub hp: u16,
    /// Maximum hit points.
    pub max_hp: u16,
}

/// Projection of a warrior account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarriorSnapshot {
    /// The warrior's account address.
    pub address: Address,
    /// Logical owner (the player's wallet).
    pub owner: Address,
    /// Display name.
    pub name: String,
    /// Class.
    pub class: WarriorClass,
    /// Rarity.
    pub rarity: WarriorRarity,
    /// Stats.
    pub stats: StatBlock,
    /// Unix timestamp until which the warrior is cooling down.
    pub cooldown_until: i64,
    /// Battles fought.
    pub battles: u32,
}

impl WarriorSnapshot {
    /// Shapes a decoded account into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Value`] for out-of-domain class/rarity ids.
    pub fn from_account(address: Address, account: &WarriorAccount) -> Result<Self, LayoutError> {
        let class = WarriorClass::from_u8(account.class)
            .ok_or_else(|| LayoutError::Value(format!("class {}", account.class)))?;
        let rarity = WarriorRarity::from_u8(account.rarity)
            .ok_or_else(|| LayoutError::Value(format!("rarity {}", account.rarity)))?;
        Ok(Self {
            address,
            owner: account.owner,
            name: account.name.clone(),
            class,
            rarity,
            stats: StatBlock {
                attack: account.attack,
                defense: account.defense,
                knowledge: account.knowledge,
                hp: account.hp,
                max_hp: account.max_hp,
            },
            cooldown_until: account.cooldown_until,
            battles: account.battles,
        })
    }

    /// Whether `wallet` owns this warrior. Address equality, nothing else.
    #[must_use]
    pub fn owned_by(&self, wallet: &Address) -> bool {
        self.owner == *wallet
    }
}

/// One occupied participant slot of a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    /// Player wallet.
    pub player: Address,
    /// Derived warrior account address.
    pub warrior: Address,
    /// Display name at join time.
    pub name: String,
    /// Whether this participant created the room.
    pub is_creator: bool,
}

/// Projection of a battle room account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleRoomSnapshot {
    /// The room's account address.
    pub address: Address,
    /// Monotonic room id.
    pub room_id: u64,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// The two participants, when their slots are occupied.
    pub participants: [Option<Participant>; 2],
    /// Current battle HP per slot.
    pub battle_hp: [u16; 2],
    /// Concept ids selected for this room.
    pub concept_ids: Vec<u16>,
    /// Topic ids selected for this room.
    pub topic_ids: Vec<u16>,
    /// Question ids selected for this room.
    pub question_ids: Vec<u16>,
    /// Per-player answers, normalized to the question count.
    /// `None` = not answered yet.
    pub answers: [Vec<Option<u8>>; 2],
    /// Per-player scores.
    pub scores: [u32; 2],
    /// Winner once completed.
    pub winner: Option<Address>,
}

impl BattleRoomSnapshot {
    /// Shapes a decoded account into a snapshot.
    ///
    /// The answer arrays are normalized to exactly the length of the
    /// selected-question array: trailing entries are padded as unanswered
    /// and any surplus is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Value`] for an out-of-domain phase id.
    pub fn from_account(address: Address, account: &BattleRoomAccount) -> Result<Self, LayoutError> {
        let phase = RoomPhase::from_u8(account.phase)
            .ok_or_else(|| LayoutError::Value(format!("phase {}", account.phase)))?;

        let participants = [
            Self::participant(&account.slots[0], &account.creator),
            Self::participant(&account.slots[1], &account.creator),
        ];

        let question_count = account.question_ids.len();
        let answers = [
            Self::normalize_answers(&account.answers_a, question_count),
            Self::normalize_answers(&account.answers_b, question_count),
        ];

        Ok(Self {
            address,
            room_id: account.room_id,
            phase,
            participants,
            battle_hp: [account.hp_a, account.hp_b],
            concept_ids: account.concept_ids.clone(),
            topic_ids: account.topic_ids.clone(),
            question_ids: account.question_ids.clone(),
            answers,
            scores: [account.score_a, account.score_b],
            winner: account.winner,
        })
    }

    fn participant(slot: &crate::layout::RoomSlot, creator: &Address) -> Option<Participant> {
        if !slot.present {
            return None;
        }
        Some(Participant {
            player: slot.player,
            warrior: slot.warrior,
            name: slot.name.clone(),
            is_creator: slot.player == *creator,
        })
    }

    fn normalize_answers(raw: &[u8], question_count: usize) -> Vec<Option<u8>> {
        (0..question_count)
            .map(|i| match raw.get(i) {
                Some(&255) | None => None,
                Some(&v) => Some(v),
            })
            .collect()
    }

    /// The participant slot index for `wallet`, if present.
    #[must_use]
    pub fn slot_of(&self, wallet: &Address) -> Option<usize> {
        self.participants
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| p.player == *wallet))
    }
}

/// Projection of the global config account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Admin authority.
    pub admin: Address,
    /// Delegation program.
    pub delegation_program: Address,
    /// Total warriors minted.
    pub warrior_count: u64,
    /// Total rooms created.
    pub room_count: u64,
    /// Whether the program is paused.
    pub paused: bool,
}

impl From<&GameConfigAccount> for ConfigSnapshot {
    fn from(account: &GameConfigAccount) -> Self {
        Self {
            admin: account.admin,
            delegation_program: account.delegation_program,
            warrior_count: account.warrior_count,
            room_count: account.room_count,
            paused: account.paused,
        }
    }
}

/// Projection of a player profile account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileSnapshot {
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

impl From<&PlayerProfileAccount> for ProfileSnapshot {
    fn from(account: &PlayerProfileAccount) -> Self {
        Self {
            owner: account.owner,
            name: account.name.clone(),
            wins: account.wins,
            losses: account.losses,
            warrior_count: account.warrior_count,
        }
    }
}
