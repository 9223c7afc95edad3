//! # MINDCLASH Ledger Read Layer
//!
//! Point-in-time state reads against the on-chain program, mediated by a
//! rate limiter and a TTL cache so a live battle loop never exceeds the
//! provider's read budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   cache miss   ┌──────────────┐   JSON-RPC   ┌──────────┐
//! │ LedgerReader │ ─────────────▶ │ RateLimiter  │ ───────────▶ │ Provider │
//! │ (TTL cache,  │                │ (serialized, │              │ (HTTP)   │
//! │  dedup)      │ ◀───────────── │  backoff)    │ ◀─────────── │          │
//! └──────────────┘    snapshot    └──────────────┘   raw bytes  └──────────┘
//! ```
//!
//! Raw account bytes are decoded against fixed layouts and shaped into
//! read-only snapshots, rebuilt on every fetch and never mutated in place.

#![warn(missing_docs)]

pub mod layout;
pub mod reader;
pub mod rpc;
pub mod session;
pub mod snapshot;

pub use layout::{
    account_discriminator, AccountKind, BattleRoomAccount, ByteReader, ByteWriter,
    GameConfigAccount, LayoutError, PlayerProfileAccount, WarriorAccount,
};
pub use reader::{LedgerReader, ReaderConfig};
pub use rpc::{HttpLedgerRpc, LedgerRpc, RawAccount, RpcError};
pub use session::{LoadPhase, LoadSession, LoadStep, LoadedState, SessionError};
pub use snapshot::{
    BattleRoomSnapshot, ConfigSnapshot, Participant, ProfileSnapshot, RoomPhase, StatBlock,
    WarriorClass, WarriorRarity, WarriorSnapshot,
};
