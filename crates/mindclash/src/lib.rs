//! # MINDCLASH Client Core
//!
//! The composition root. One [`Session`] per connected identity wires
//! together the notice hub, the rate-limited ledger read layer, the
//! event stream client, and the quiz content assembler. Nothing in the
//! core lives in a module-level global; UI code owns the session and
//! drops it on sign-out.
//!
//! The member crates:
//!
//! | Crate               | Responsibility                                |
//! |---------------------|-----------------------------------------------|
//! | `mindclash_core`    | limiter, TTL cache, room codes, notices       |
//! | `mindclash_ledger`  | account layouts, snapshots, cached reads      |
//! | `mindclash_stream`  | log-subscription socket, event dispatch       |
//! | `mindclash_content` | concept store access, quiz assembly           |

#![warn(missing_docs)]

pub mod session;

pub use session::{ClientError, Session};

pub use mindclash_content as content;
pub use mindclash_ledger as ledger;
pub use mindclash_stream as stream;

pub use mindclash_core::{Address, Notice, NoticeHub, NoticeLevel, RateLimiter, Settings};
