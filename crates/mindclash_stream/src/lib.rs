//! # MINDCLASH Event Stream
//!
//! Resilient client for the ledger's log-subscription socket. Decodes
//! domain events from raw program log lines and dispatches them to
//! registered handlers, with reconnection, health checking, and redundant
//! battle-start detection as a hedge against transport unreliability.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  frames   ┌──────────────┐  inputs   ┌─────────────┐
//! │ Transport │ ────────▶ │ StreamClient │ ────────▶ │ ConnState   │
//! │ (socket)  │ ◀──────── │ (run loop)   │ ◀──────── │ transition  │
//! └───────────┘  requests └──────┬───────┘  effects  └─────────────┘
//!                                │ decoded events
//!                                ▼
//!                     ┌─────────────────────┐
//!                     │ history + handlers  │
//!                     └─────────────────────┘
//! ```
//!
//! Three independent paths can detect a battle start (log stream, account
//! watcher, polling fallback); [`BattleStartGuard`] guarantees consumers
//! see exactly one `BattleStarted` record per room regardless of which
//! path fired first.

#![warn(missing_docs)]

pub mod client;
pub mod event;
pub mod fallback;
pub mod history;
pub mod machine;
pub mod protocol;
pub mod transport;

pub use client::{EventHandlers, StreamClient, StreamConfig};
pub use event::{decode_log_line, ArenaEvent, EventRecord};
pub use fallback::BattleStartGuard;
pub use history::EventHistory;
pub use machine::{transition, ConnEffect, ConnInput, ConnState, ReconnectPolicy};
pub use transport::{Frame, SocketConnector, SocketTransport, StreamError, WsConnector};
