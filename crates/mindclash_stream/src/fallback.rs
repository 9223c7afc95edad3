//! # Redundant Battle-Start Detection
//!
//! Log delivery is not guaranteed, and a missed `BattleStarted` strands
//! the player on the lobby screen. Three independent paths watch for the
//! same condition:
//!
//! 1. the log stream (primary),
//! 2. the account watcher, decoding every account notification as a
//!    battle room and checking for the in-progress phase,
//! 3. a time-boxed polling fallback re-fetching the room account.
//!
//! [`BattleStartGuard`] makes the paths collapse into exactly one
//! delivered event per room: the first detection wins, later detections
//! are no-ops, and re-delivery of the same transaction signature is
//! swallowed. Downstream consumers never learn which path fired.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use mindclash_core::Address;
use mindclash_ledger::layout::BattleRoomAccount;
use mindclash_ledger::rpc::LedgerRpc;
use mindclash_ledger::snapshot::RoomPhase;

use crate::event::{ArenaEvent, BattleStarted, EventRecord};

/// Poll cadence for the fallback fetcher.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Hard stop for the fallback fetcher.
pub const POLL_DEADLINE: Duration = Duration::from_secs(60);

/// First-detection-wins gate, one claim per room.
#[derive(Default)]
pub struct BattleStartGuard {
    claimed: Mutex<HashMap<Address, String>>,
}

impl BattleStartGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to claim the battle start for `room`. Returns true for
    /// the first detection; every later call for the room is a no-op,
    /// whatever its signature.
    pub fn claim(&self, room: Address, signature: &str) -> bool {
        let mut claimed = self.claimed.lock();
        if let Some(winner) = claimed.get(&room) {
            tracing::debug!(%room, winner, loser = signature, "battle start already claimed");
            return false;
        }
        claimed.insert(room, signature.to_string());
        true
    }

    /// Whether a detection has already fired for `room`.
    #[must_use]
    pub fn is_claimed(&self, room: &Address) -> bool {
        self.claimed.lock().contains_key(room)
    }

    /// Forgets a room, e.g. when its battle settles and the account may
    /// be reused.
    pub fn release(&self, room: &Address) {
        self.claimed.lock().remove(room);
    }

    /// Forgets everything (identity switch).
    pub fn clear(&self) {
        self.claimed.lock().clear();
    }
}

/// Builds the `BattleStarted` payload a log event would have carried,
/// from the room account itself. `None` unless the room is in progress
/// with both slots filled.
#[must_use]
pub fn synthesize_battle_started(room: Address, account: &BattleRoomAccount) -> Option<BattleStarted> {
    if RoomPhase::from_u8(account.phase)? != RoomPhase::InProgress {
        return None;
    }
    let [a, b] = &account.slots;
    if !a.present || !b.present {
        return None;
    }
    Some(BattleStarted {
        room,
        player_a: a.player,
        player_b: b.player,
        warrior_a: a.name.clone(),
        warrior_b: b.name.clone(),
        hp_a: account.hp_a,
        hp_b: account.hp_b,
    })
}

/// Time-boxed polling fallback. Re-fetches the room account every
/// [`POLL_INTERVAL`] until a start is detected by any path or
/// [`POLL_DEADLINE`] passes. Fetch errors are logged and the next tick
/// tries again; the deadline bounds the total cost.
pub async fn poll_battle_start<F>(
    rpc: Arc<dyn LedgerRpc>,
    guard: Arc<BattleStartGuard>,
    room: Address,
    deliver: F,
) where
    F: Fn(EventRecord),
{
    let started = tokio::time::Instant::now();
    while started.elapsed() < POLL_DEADLINE {
        if guard.is_claimed(&room) {
            return;
        }
        match rpc.get_account(&room).await {
            Ok(Some(raw)) => {
                if let Ok(account) = BattleRoomAccount::decode(&raw.data) {
                    if let Some(payload) = synthesize_battle_started(room, &account) {
                        let signature = format!("poll:{room}");
                        if guard.claim(room, &signature) {
                            tracing::info!(%room, "battle start detected by polling fallback");
                            deliver(EventRecord::now(ArenaEvent::BattleStarted(payload), signature));
                        }
                        return;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(%room, error = %e, "battle-start poll fetch failed"),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    tracing::debug!(%room, "battle-start poll deadline reached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mindclash_ledger::layout::{AccountKind, RoomSlot};
    use mindclash_ledger::rpc::{RawAccount, RpcError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn room_account(phase: u8) -> BattleRoomAccount {
        BattleRoomAccount {
            room_id: 1,
            creator: Address::repeat_byte(1),
            phase,
            hp_a: 120,
            hp_b: 95,
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
                    warrior: Address::repeat_byte(0x11),
                    name: "Nyx".to_string(),
                },
            ],
            concept_ids: vec![],
            topic_ids: vec![],
            question_ids: vec![],
            answers_a: vec![],
            answers_b: vec![],
            score_a: 0,
            score_b: 0,
            winner: None,
        }
    }

    #[test]
    fn test_first_claim_wins() {
        let guard = BattleStartGuard::new();
        let room = Address::repeat_byte(3);

        assert!(guard.claim(room, "log:sig-1"));
        assert!(!guard.claim(room, "account-watch:abc"));
        assert!(!guard.claim(room, "log:sig-1"));

        guard.release(&room);
        assert!(guard.claim(room, "log:sig-2"));
    }

    #[test]
    fn test_synthesis_requires_in_progress() {
        let room = Address::repeat_byte(3);
        assert!(synthesize_battle_started(room, &room_account(0)).is_none());
        assert!(synthesize_battle_started(room, &room_account(5)).is_none());

        let payload = synthesize_battle_started(room, &room_account(4)).unwrap();
        assert_eq!(payload.warrior_a, "Rex");
        assert_eq!(payload.warrior_b, "Nyx");
        assert_eq!(payload.hp_b, 95);
    }

    struct PhasedRpc {
        /// Number of polls that see a pre-battle phase before the room
        /// flips to in-progress.
        flips_after: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LedgerRpc for PhasedRpc {
        async fn get_account(&self, _address: &Address) -> Result<Option<RawAccount>, RpcError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let phase = if n >= self.flips_after { 4 } else { 2 };
            Ok(Some(RawAccount {
                authority: Address::repeat_byte(0xF0),
                data: room_account(phase).encode(),
                lamports: 1,
            }))
        }

        async fn get_program_accounts(
            &self,
            _owner_program: &Address,
            _kind: AccountKind,
        ) -> Result<Vec<(Address, RawAccount)>, RpcError> {
            Ok(vec![])
        }

        async fn get_balance(&self, _address: &Address) -> Result<u64, RpcError> {
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_detects_and_claims_once() {
        let rpc = Arc::new(PhasedRpc { flips_after: 2, calls: AtomicU32::new(0) });
        let guard = Arc::new(BattleStartGuard::new());
        let room = Address::repeat_byte(3);
        let delivered = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&delivered);
        poll_battle_start(rpc, Arc::clone(&guard), room, move |record| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(matches!(record.event, ArenaEvent::BattleStarted(_)));
            assert_eq!(record.signature, format!("poll:{room}"));
        })
        .await;

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        assert!(guard.is_claimed(&room));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_when_another_path_claimed() {
        let rpc = Arc::new(PhasedRpc { flips_after: 0, calls: AtomicU32::new(0) });
        let guard = Arc::new(BattleStartGuard::new());
        let room = Address::repeat_byte(3);
        guard.claim(room, "log:already-here");

        let delivered = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&delivered);
        poll_battle_start(rpc.clone(), guard, room, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }
}
