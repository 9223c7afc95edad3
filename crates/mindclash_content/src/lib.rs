//! # MINDCLASH Quiz Content
//!
//! Fetches concept content from the external content store and assembles
//! the per-battle quiz views. The ledger records *which* concepts, topics,
//! and questions a room uses; this crate re-derives exactly those from the
//! fetched content, in ledger order, and strips answer correctness before
//! anything reaches a display layer.

#![warn(missing_docs)]

pub mod assembler;
pub mod model;
pub mod store;

pub use assembler::{assemble, QuizAssembly, RoomSelection};
pub use model::{BattleQuestion, Concept, Question, StudyTopic, Topic};
pub use store::{ConceptStore, ContentError, HttpConceptStore};
