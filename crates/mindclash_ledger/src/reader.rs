//! # Ledger Reader
//!
//! The single entry point for point-in-time state. Every fetcher:
//!
//! 1. computes a cache key from entity kind + address/owner,
//! 2. returns immediately on a cache hit,
//! 3. on a miss with no identical request in flight, routes the read
//!    through the rate limiter, stores the result with an
//!    entity-appropriate TTL and returns it,
//! 4. on a miss with an identical request already in flight, waits on
//!    that flight - two concurrent fetches for the same key issue at
//!    most one network call.
//!
//! Ownership filtering happens client-side after a bulk fetch; the ledger
//! has no server-side ownership filter.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use mindclash_core::{decode_room_code, Address, RateLimiter, TtlCache};

use crate::layout::{
    derive_address, AccountKind, BattleRoomAccount, GameConfigAccount, PlayerProfileAccount,
    WarriorAccount,
};
use crate::rpc::{LedgerRpc, RpcError};
use crate::snapshot::{BattleRoomSnapshot, ConfigSnapshot, ProfileSnapshot, WarriorSnapshot};

/// Per-entity TTLs plus the program addresses the reader needs.
///
/// TTLs match how fast the corresponding on-chain value can legitimately
/// change: config is nearly static, a room in battle changes every few
/// seconds.
#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// The game program id.
    pub program_id: Address,
    /// The delegation program warriors are handed to during battles.
    pub delegation_program: Address,
    /// TTL for the config singleton.
    pub ttl_config: Duration,
    /// TTL for player profiles.
    pub ttl_profile: Duration,
    /// TTL for single warriors.
    pub ttl_warrior: Duration,
    /// TTL for battle rooms.
    pub ttl_room: Duration,
    /// TTL for warrior list fetches.
    pub ttl_warrior_list: Duration,
    /// TTL for wallet balances.
    pub ttl_balance: Duration,
}

impl ReaderConfig {
    /// Creates a config with default TTLs.
    #[must_use]
    pub fn new(program_id: Address, delegation_program: Address) -> Self {
        Self {
            program_id,
            delegation_program,
            ttl_config: Duration::from_secs(120),
            ttl_profile: Duration::from_secs(30),
            ttl_warrior: Duration::from_secs(15),
            ttl_room: Duration::from_secs(5),
            ttl_warrior_list: Duration::from_secs(20),
            ttl_balance: Duration::from_secs(10),
        }
    }
}

/// What the cache stores. One variant per fetcher shape.
#[derive(Clone)]
enum Cached {
    Config(ConfigSnapshot),
    Profile(Option<ProfileSnapshot>),
    Warrior(Option<WarriorSnapshot>),
    Room(Option<BattleRoomSnapshot>),
    Warriors(Vec<WarriorSnapshot>),
    Balance(u64),
}

/// Rate-limited, cached, de-duplicated read layer.
///
/// One instance per connected identity. The reader is the sole writer of
/// cached snapshots; the event stream never mutates cache state.
pub struct LedgerReader {
    rpc: Arc<dyn LedgerRpc>,
    limiter: Arc<RateLimiter>,
    cache: TtlCache<Cached>,
    /// Per-key gates for single-flight de-duplication.
    flights: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: ReaderConfig,
}

impl LedgerReader {
    /// Creates a reader over the given RPC and limiter.
    #[must_use]
    pub fn new(rpc: Arc<dyn LedgerRpc>, limiter: Arc<RateLimiter>, config: ReaderConfig) -> Self {
        Self {
            rpc,
            limiter,
            cache: TtlCache::new(),
            flights: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// The program id this reader is bound to.
    #[must_use]
    pub const fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    /// Evicts cached entries; `None` clears everything (identity switch),
    /// `Some(fragment)` scopes eviction to keys containing the fragment
    /// (one room, one address).
    pub fn invalidate(&self, fragment: Option<&str>) {
        self.cache.invalidate(fragment);
    }

    async fn fetch_cached<F>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Cached, RpcError>
    where
        F: Future<Output = Result<Cached, RpcError>>,
    {
        if let Some(hit) = self.cache.get(key) {
            tracing::trace!(key, "cache hit");
            return Ok(hit);
        }

        let gate = {
            let mut flights = self.flights.lock().await;
            Arc::clone(flights.entry(key.to_string()).or_default())
        };
        let _guard = gate.lock().await;

        // An identical flight may have landed while we waited on the gate.
        if let Some(hit) = self.cache.get(key) {
            tracing::trace!(key, "cache hit after in-flight wait");
            return Ok(hit);
        }

        let result = fetch.await;
        if let Ok(value) = &result {
            self.cache.set(key, value.clone(), ttl);
        }
        self.flights.lock().await.remove(key);
        result
    }

    /// Fetches the global config singleton.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure, exhausted throttle
    /// retries, or a missing/malformed config account.
    pub async fn get_config(&self) -> Result<ConfigSnapshot, RpcError> {
        let address = derive_address(b"config", &[], &self.config.program_id);
        let key = format!("config:{address}");
        let cached = self
            .fetch_cached(&key, self.config.ttl_config, async {
                let raw = self
                    .limiter
                    .run(|| self.rpc.get_account(&address))
                    .await?
                    .ok_or_else(|| RpcError::NotFound(address.to_string()))?;
                let account = GameConfigAccount::decode(&raw.data)?;
                Ok(Cached::Config(ConfigSnapshot::from(&account)))
            })
            .await?;
        match cached {
            Cached::Config(config) => Ok(config),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }

    /// Fetches a player's profile, or `None` for a brand-new player.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure or a malformed account.
    pub async fn get_profile(&self, owner: &Address) -> Result<Option<ProfileSnapshot>, RpcError> {
        let address = derive_address(b"profile", &[owner.as_bytes()], &self.config.program_id);
        let key = format!("profile:{owner}");
        let cached = self
            .fetch_cached(&key, self.config.ttl_profile, async {
                let raw = self.limiter.run(|| self.rpc.get_account(&address)).await?;
                let profile = match raw {
                    Some(raw) => {
                        let account = PlayerProfileAccount::decode(&raw.data)?;
                        Some(ProfileSnapshot::from(&account))
                    }
                    None => None,
                };
                Ok(Cached::Profile(profile))
            })
            .await?;
        match cached {
            Cached::Profile(profile) => Ok(profile),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }

    /// Fetches one warrior by account address.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure or a malformed account.
    pub async fn get_warrior(&self, address: &Address) -> Result<Option<WarriorSnapshot>, RpcError> {
        let key = format!("warrior:{address}");
        let cached = self
            .fetch_cached(&key, self.config.ttl_warrior, async {
                let raw = self.limiter.run(|| self.rpc.get_account(address)).await?;
                let warrior = match raw {
                    Some(raw) => {
                        let account = WarriorAccount::decode(&raw.data)?;
                        Some(WarriorSnapshot::from_account(*address, &account)?)
                    }
                    None => None,
                };
                Ok(Cached::Warrior(warrior))
            })
            .await?;
        match cached {
            Cached::Warrior(warrior) => Ok(warrior),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }

    /// Fetches a battle room by shareable room code.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Core`] for a malformed code (fails fast, no
    /// network call), otherwise [`RpcError`] as for any account read.
    pub async fn get_battle_room(&self, code: &str) -> Result<Option<BattleRoomSnapshot>, RpcError> {
        let seed = decode_room_code(code, &self.config.program_id)?;
        self.get_battle_room_by_address(&seed.room_address).await
    }

    /// Fetches a battle room by derived account address.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure or a malformed account.
    pub async fn get_battle_room_by_address(
        &self,
        address: &Address,
    ) -> Result<Option<BattleRoomSnapshot>, RpcError> {
        let key = format!("room:{address}");
        let cached = self
            .fetch_cached(&key, self.config.ttl_room, async {
                let raw = self.limiter.run(|| self.rpc.get_account(address)).await?;
                let room = match raw {
                    Some(raw) => {
                        let account = BattleRoomAccount::decode(&raw.data)?;
                        Some(BattleRoomSnapshot::from_account(*address, &account)?)
                    }
                    None => None,
                };
                Ok(Cached::Room(room))
            })
            .await?;
        match cached {
            Cached::Room(room) => Ok(room),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }

    /// Fetches every warrior belonging to `owner`.
    ///
    /// The ledger cannot filter by the owner recorded inside the payload,
    /// so this is a bulk fetch filtered client-side. Accounts that fail
    /// to decode are skipped - not every account matching the
    /// discriminator prefix is guaranteed well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure or exhausted retries.
    pub async fn get_player_warriors(
        &self,
        owner: &Address,
    ) -> Result<Vec<WarriorSnapshot>, RpcError> {
        let key = format!("warriors:{owner}");
        let program_id = self.config.program_id;
        let cached = self
            .fetch_cached(&key, self.config.ttl_warrior_list, async {
                let entries = self
                    .limiter
                    .run(|| self.rpc.get_program_accounts(&program_id, AccountKind::Warrior))
                    .await?;
                let warriors = entries
                    .iter()
                    .filter_map(|(address, raw)| {
                        let account = match WarriorAccount::decode(&raw.data) {
                            Ok(account) => account,
                            Err(e) => {
                                tracing::debug!(%address, error = %e, "skipping undecodable warrior");
                                return None;
                            }
                        };
                        WarriorSnapshot::from_account(*address, &account).ok()
                    })
                    .filter(|w| w.owned_by(owner))
                    .collect();
                Ok(Cached::Warriors(warriors))
            })
            .await?;
        match cached {
            Cached::Warriors(warriors) => Ok(warriors),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }

    /// Fetches `owner`'s warriors currently held by the delegation
    /// program.
    ///
    /// Reconciles two independent facts: the account's *current* owning
    /// authority must be the delegation program, and the *original* owner
    /// recorded inside the payload must be the requesting player. Only
    /// entries where both hold belong to the player.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure or exhausted retries.
    pub async fn get_delegated_warriors(
        &self,
        owner: &Address,
    ) -> Result<Vec<WarriorSnapshot>, RpcError> {
        let key = format!("delegated:{owner}");
        let delegation = self.config.delegation_program;
        let cached = self
            .fetch_cached(&key, self.config.ttl_warrior_list, async {
                let entries = self
                    .limiter
                    .run(|| self.rpc.get_program_accounts(&delegation, AccountKind::Warrior))
                    .await?;
                let warriors = entries
                    .iter()
                    .filter(|(_, raw)| raw.authority == delegation)
                    .filter_map(|(address, raw)| {
                        let account = WarriorAccount::decode(&raw.data).ok()?;
                        WarriorSnapshot::from_account(*address, &account).ok()
                    })
                    .filter(|w| w.owned_by(owner))
                    .collect();
                Ok(Cached::Warriors(warriors))
            })
            .await?;
        match cached {
            Cached::Warriors(warriors) => Ok(warriors),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }

    /// Fetches a wallet's lamport balance.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport failure or exhausted retries.
    pub async fn get_balance(&self, owner: &Address) -> Result<u64, RpcError> {
        let key = format!("balance:{owner}");
        let cached = self
            .fetch_cached(&key, self.config.ttl_balance, async {
                let balance = self.limiter.run(|| self.rpc.get_balance(owner)).await?;
                Ok(Cached::Balance(balance))
            })
            .await?;
        match cached {
            Cached::Balance(balance) => Ok(balance),
            _ => Err(RpcError::BadResponse("cache kind mismatch".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RoomSlot;
    use crate::rpc::RawAccount;
    use async_trait::async_trait;
    use mindclash_core::{encode_room_code, LimiterConfig};
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockRpc {
        accounts: SyncMutex<HashMap<Address, RawAccount>>,
        program_accounts: SyncMutex<Vec<(Address, RawAccount)>>,
        calls: AtomicU32,
    }

    impl MockRpc {
        fn new() -> Self {
            Self {
                accounts: SyncMutex::new(HashMap::new()),
                program_accounts: SyncMutex::new(Vec::new()),
                calls: AtomicU32::new(0),
            }
        }

        fn put(&self, address: Address, authority: Address, data: Vec<u8>) {
            self.accounts.lock().insert(
                address,
                RawAccount {
                    authority,
                    data,
                    lamports: 1,
                },
            );
        }
    }

    #[async_trait]
    impl LedgerRpc for MockRpc {
        async fn get_account(&self, address: &Address) -> Result<Option<RawAccount>, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Simulated network latency so concurrent flights overlap.
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(self.accounts.lock().get(address).cloned())
        }

        async fn get_program_accounts(
            &self,
            owner_program: &Address,
            _kind: AccountKind,
        ) -> Result<Vec<(Address, RawAccount)>, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .program_accounts
                .lock()
                .iter()
                .filter(|(_, raw)| raw.authority == *owner_program)
                .cloned()
                .collect())
        }

        async fn get_balance(&self, _address: &Address) -> Result<u64, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(7_777)
        }
    }

    fn make_reader(rpc: Arc<MockRpc>) -> Arc<LedgerReader> {
        let limiter = Arc::new(RateLimiter::new(LimiterConfig {
            min_gap: Duration::from_millis(10),
            ..LimiterConfig::default()
        }));
        Arc::new(LedgerReader::new(
            rpc,
            limiter,
            ReaderConfig::new(Address::repeat_byte(0xF0), Address::repeat_byte(0xDD)),
        ))
    }

    fn warrior_bytes(owner: Address, name: &str) -> Vec<u8> {
        WarriorAccount {
            owner,
            name: name.to_string(),
            class: 0,
            rarity: 1,
            attack: 10,
            defense: 10,
            knowledge: 10,
            hp: 50,
            max_hp: 50,
            cooldown_until: 0,
            battles: 0,
        }
        .encode()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_network() {
        let rpc = Arc::new(MockRpc::new());
        let addr = Address::repeat_byte(9);
        rpc.put(addr, Address::repeat_byte(0xF0), warrior_bytes(Address::repeat_byte(1), "Rex"));
        let reader = make_reader(Arc::clone(&rpc));

        let first = reader.get_warrior(&addr).await.unwrap().unwrap();
        let second = reader.get_warrior(&addr).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_fetches_dedup() {
        let rpc = Arc::new(MockRpc::new());
        let addr = Address::repeat_byte(9);
        rpc.put(addr, Address::repeat_byte(0xF0), warrior_bytes(Address::repeat_byte(1), "Rex"));
        let reader = make_reader(Arc::clone(&rpc));

        let a = {
            let reader = Arc::clone(&reader);
            tokio::spawn(async move { reader.get_warrior(&addr).await })
        };
        let b = {
            let reader = Arc::clone(&reader);
            tokio::spawn(async move { reader.get_warrior(&addr).await })
        };

        let (ra, rb) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(ra, rb);
        // De-duplication: one network call for two concurrent fetches.
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_forces_refetch() {
        let rpc = Arc::new(MockRpc::new());
        let addr = Address::repeat_byte(9);
        rpc.put(addr, Address::repeat_byte(0xF0), warrior_bytes(Address::repeat_byte(1), "Rex"));
        let reader = make_reader(Arc::clone(&rpc));

        let _ = reader.get_warrior(&addr).await.unwrap();
        reader.invalidate(Some(&addr.to_string()));
        let _ = reader.get_warrior(&addr).await.unwrap();

        assert_eq!(rpc.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ownership_filter_client_side() {
        let rpc = Arc::new(MockRpc::new());
        let me = Address::repeat_byte(1);
        let other = Address::repeat_byte(2);
        let program = Address::repeat_byte(0xF0);
        {
            let mut entries = rpc.program_accounts.lock();
            entries.push((
                Address::repeat_byte(0x11),
                RawAccount { authority: program, data: warrior_bytes(me, "Mine"), lamports: 1 },
            ));
            entries.push((
                Address::repeat_byte(0x12),
                RawAccount { authority: program, data: warrior_bytes(other, "Theirs"), lamports: 1 },
            ));
            // Undecodable account is skipped, not fatal.
            entries.push((
                Address::repeat_byte(0x13),
                RawAccount { authority: program, data: vec![1, 2, 3], lamports: 1 },
            ));
        }
        let reader = make_reader(Arc::clone(&rpc));

        let warriors = reader.get_player_warriors(&me).await.unwrap();
        assert_eq!(warriors.len(), 1);
        assert_eq!(warriors[0].name, "Mine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegated_reconciliation() {
        let rpc = Arc::new(MockRpc::new());
        let me = Address::repeat_byte(1);
        let delegation = Address::repeat_byte(0xDD);
        let program = Address::repeat_byte(0xF0);
        {
            let mut entries = rpc.program_accounts.lock();
            // Delegated and mine: both facts hold.
            entries.push((
                Address::repeat_byte(0x21),
                RawAccount { authority: delegation, data: warrior_bytes(me, "Handed"), lamports: 1 },
            ));
            // Delegated but someone else's payload owner.
            entries.push((
                Address::repeat_byte(0x22),
                RawAccount {
                    authority: delegation,
                    data: warrior_bytes(Address::repeat_byte(2), "NotMine"),
                    lamports: 1,
                },
            ));
            // Mine but still held by the game program.
            entries.push((
                Address::repeat_byte(0x23),
                RawAccount { authority: program, data: warrior_bytes(me, "Home"), lamports: 1 },
            ));
        }
        let reader = make_reader(Arc::clone(&rpc));

        let delegated = reader.get_delegated_warriors(&me).await.unwrap();
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].name, "Handed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_fetch_by_code() {
        let rpc = Arc::new(MockRpc::new());
        let reader = make_reader(Arc::clone(&rpc));
        let seed = [5u8; 32];
        let code = encode_room_code(&seed);
        let room_address =
            mindclash_core::derive_room_address(&seed, reader.program_id());

        let account = BattleRoomAccount {
            room_id: 3,
            creator: Address::repeat_byte(1),
            phase: 0,
            hp_a: 0,
            hp_b: 0,
            slots: [
                RoomSlot {
                    present: true,
                    player: Address::repeat_byte(1),
                    warrior: Address::repeat_byte(0x10),
                    name: "Rex".to_string(),
                },
                RoomSlot {
                    present: false,
                    player: Address::ZERO,
                    warrior: Address::ZERO,
                    name: String::new(),
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
        };
        rpc.put(room_address, Address::repeat_byte(0xF0), account.encode());

        let room = reader.get_battle_room(&code).await.unwrap().unwrap();
        assert_eq!(room.room_id, 3);
        assert_eq!(room.address, room_address);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_room_code_fails_without_network() {
        let rpc = Arc::new(MockRpc::new());
        let reader = make_reader(Arc::clone(&rpc));

        let result = reader.get_battle_room("!!!").await;
        assert!(matches!(result, Err(RpcError::Core(_))));
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }
}
