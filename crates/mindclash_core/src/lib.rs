//! # MINDCLASH Core
//!
//! Shared primitives for the MINDCLASH client core. Everything that more
//! than one subsystem needs lives here:
//!
//! - [`RateLimiter`] - serializes outbound reads with a minimum start-to-start
//!   gap, retrying throttled calls with exponential backoff
//! - [`TtlCache`] - in-memory key/value store with per-entry expiry and
//!   substring-scoped invalidation
//! - [`roomcode`] - the bijective codec between shareable room codes and
//!   derived program account addresses
//! - [`NoticeHub`] - explicitly constructed pub/sub for user-facing notices
//!   (no module-level globals)
//!
//! ## Architecture Rules
//!
//! 1. **No panics across crate boundaries** - every fallible operation
//!    returns a typed error
//! 2. **Per-session ownership** - limiter and cache instances belong to one
//!    connected identity and are discarded wholesale on identity switch
//! 3. **No hidden state** - all services are constructed by the composition
//!    root and injected

#![warn(missing_docs)]

pub mod address;
pub mod cache;
pub mod error;
pub mod limiter;
pub mod notify;
pub mod roomcode;
pub mod settings;

pub use address::Address;
pub use cache::TtlCache;
pub use error::CoreError;
pub use limiter::{LimiterConfig, RateLimiter, Throttled};
pub use notify::{Notice, NoticeHub, NoticeLevel};
pub use roomcode::{decode_room_code, derive_room_address, encode_room_code, RoomSeed};
pub use settings::{Settings, StreamSettings};
