//! # Session
//!
//! One session per connected identity. The session owns the shared
//! resources (notice hub, rate limiter, read layer, stream client) and
//! is the only place they are wired together; switching identity
//! invalidates every cached snapshot wholesale so no data leaks across
//! wallets.

use std::sync::Arc;

use parking_lot::Mutex;

use mindclash_content::{assemble, ConceptStore, ContentError, HttpConceptStore, QuizAssembly, RoomSelection};
use mindclash_core::{
    Address, CoreError, LimiterConfig, NoticeHub, RateLimiter, Settings,
};
use mindclash_ledger::{
    HttpLedgerRpc, LedgerReader, LedgerRpc, LoadSession, ReaderConfig, RpcError,
};
use mindclash_stream::{SocketConnector, StreamClient, StreamConfig, StreamError, WsConnector};

use std::time::Duration;

/// Failures surfaced to UI code. Every public async operation returns
/// one of these; no transport exception crosses the boundary raw.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Malformed input or configuration.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A ledger read failed.
    #[error(transparent)]
    Ledger(#[from] RpcError),

    /// The event stream failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Content fetching or assembly failed.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// The room code resolved but no such room exists on-chain.
    #[error("battle room not found")]
    RoomNotFound,
}

/// The client core for one connected identity.
pub struct Session {
    settings: Settings,
    program_id: Address,
    hub: Arc<NoticeHub>,
    limiter: Arc<RateLimiter>,
    rpc: Arc<dyn LedgerRpc>,
    store: Arc<dyn ConceptStore>,
    stream: StreamClient,
    reader: Mutex<Arc<LedgerReader>>,
    identity: Mutex<Option<Address>>,
}

impl Session {
    /// Builds a session against the production endpoints in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAddress`] when the configured program
    /// id does not parse.
    pub fn new(settings: Settings) -> Result<Self, ClientError> {
        let rpc: Arc<dyn LedgerRpc> = Arc::new(HttpLedgerRpc::new(
            settings.rpc_http_url.clone(),
            settings.commitment.clone(),
        ));
        let store: Arc<dyn ConceptStore> =
            Arc::new(HttpConceptStore::new(settings.content_base_url.clone()));
        let connector: Arc<dyn SocketConnector> =
            Arc::new(WsConnector::new(settings.rpc_socket_url.clone()));
        Self::with_parts(settings, rpc, connector, store)
    }

    /// Builds a session from injected collaborators. The production
    /// constructor and every test go through here.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAddress`] when the configured program
    /// id does not parse.
    pub fn with_parts(
        settings: Settings,
        rpc: Arc<dyn LedgerRpc>,
        connector: Arc<dyn SocketConnector>,
        store: Arc<dyn ConceptStore>,
    ) -> Result<Self, ClientError> {
        let program_id: Address = settings.program_id.parse().map_err(ClientError::Core)?;
        let hub = Arc::new(NoticeHub::new());
        let limiter = Arc::new(RateLimiter::new(LimiterConfig {
            min_gap: Duration::from_millis(settings.read_gap_ms),
            ..LimiterConfig::default()
        }));
        let stream = StreamClient::new(
            StreamConfig::from_settings(program_id, settings.commitment.clone(), &settings.stream),
            connector,
            Arc::clone(&hub),
        );
        // The delegation program is discovered from the on-chain config;
        // until an identity connects, the reader runs unscoped.
        let reader = Arc::new(LedgerReader::new(
            Arc::clone(&rpc),
            Arc::clone(&limiter),
            ReaderConfig::new(program_id, Address::ZERO),
        ));
        Ok(Self {
            settings,
            program_id,
            hub,
            limiter,
            rpc,
            store,
            stream,
            reader: Mutex::new(reader),
            identity: Mutex::new(None),
        })
    }

    /// The program this session is bound to.
    #[must_use]
    pub const fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// The loaded settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The notice hub UI code subscribes to.
    #[must_use]
    pub fn hub(&self) -> Arc<NoticeHub> {
        Arc::clone(&self.hub)
    }

    /// The current read layer.
    #[must_use]
    pub fn reader(&self) -> Arc<LedgerReader> {
        Arc::clone(&self.reader.lock())
    }

    /// The event stream client.
    #[must_use]
    pub const fn stream(&self) -> &StreamClient {
        &self.stream
    }

    /// The identity the session is currently scoped to.
    #[must_use]
    pub fn identity(&self) -> Option<Address> {
        *self.identity.lock()
    }

    /// Scopes the session to a new identity: drops every cached
    /// snapshot, re-reads the on-chain config for the delegation
    /// program, and rebuilds the read layer. Returns the sequenced
    /// cold-start loader for the new identity.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Ledger`] when the config read fails; the
    /// previous identity scope stays invalidated either way.
    pub async fn switch_identity(&self, owner: Address) -> Result<Arc<LoadSession>, ClientError> {
        tracing::info!(%owner, "switching identity");
        self.reader.lock().invalidate(None);
        *self.identity.lock() = None;

        let bootstrap = self.reader();
        let config = bootstrap.get_config().await?;

        let reader = Arc::new(LedgerReader::new(
            Arc::clone(&self.rpc),
            Arc::clone(&self.limiter),
            ReaderConfig::new(self.program_id, config.delegation_program),
        ));
        *self.reader.lock() = Arc::clone(&reader);
        *self.identity.lock() = Some(owner);

        Ok(Arc::new(LoadSession::new(reader, owner)))
    }

    /// Resolves a shareable room code and assembles its quiz content.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Core`] for a malformed code,
    /// [`ClientError::RoomNotFound`] when no account exists at the
    /// derived address, and [`ClientError::Content`] when assembly
    /// fails entirely.
    pub async fn assemble_quiz(&self, room_code: &str) -> Result<QuizAssembly, ClientError> {
        let room = self
            .reader()
            .get_battle_room(room_code)
            .await?
            .ok_or(ClientError::RoomNotFound)?;
        let selection = RoomSelection::from_room(&room);
        let assembly = assemble(&selection, self.store.as_ref(), &self.limiter).await?;
        Ok(assembly)
    }

    /// Arms the redundant battle-start detection for one room: points
    /// the account watcher at it and spawns the polling fallback.
    pub fn arm_battle_start_watch(&self, room: Address) {
        self.stream.watch_battle_start(room);
        self.stream
            .spawn_battle_start_poll(Arc::clone(&self.rpc), room);
    }

    /// Tears the session down. The stream client becomes permanently
    /// unusable; cached state is dropped.
    pub fn shutdown(&self) {
        self.stream.disconnect();
        self.reader.lock().invalidate(None);
        *self.identity.lock() = None;
    }
}
