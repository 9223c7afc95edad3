//! # Stream Client
//!
//! Owns one socket session against the ledger's log-subscription
//! endpoint. The client is a cheap handle; the run loop lives in a
//! spawned task and drives the [`crate::machine`] transitions, feeding
//! decoded events into the history ring and the registered handlers.
//!
//! Teardown is terminal: `disconnect()` sets the destroyed flag, and
//! every callback and timer checks it before touching anything, so no
//! in-flight frame or pending timer has an observable effect afterward.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use mindclash_core::{Address, Notice, NoticeHub, NoticeLevel, StreamSettings};
use mindclash_ledger::layout::BattleRoomAccount;
use mindclash_ledger::rpc::LedgerRpc;

use crate::event::{decode_log_line, ArenaEvent, EventRecord};
use crate::fallback::{poll_battle_start, synthesize_battle_started, BattleStartGuard};
use crate::history::EventHistory;
use crate::machine::{is_clean_close, transition, ConnEffect, ConnInput, ConnState, ReconnectPolicy};
use crate::protocol::{self, ErrorKind, Inbound};
use crate::transport::{Frame, SocketConnector, SocketTransport, StreamError, CLOSE_ABNORMAL};

/// Everything the stream client needs to know up front.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Program whose logs we subscribe to.
    pub program_id: Address,
    /// Commitment level for the subscription.
    pub commitment: String,
    /// Whether `initialize()` should connect immediately.
    pub auto_connect: bool,
    /// Hard ceiling on a single connect attempt.
    pub connect_timeout: Duration,
    /// Delay between socket open and the subscription request.
    pub stabilization: Duration,
    /// Interval between liveness probes.
    pub health_interval: Duration,
    /// Force-close when no event arrived for this long.
    pub event_silence: Duration,
    /// Force-close when no probe response arrived for this long.
    pub probe_silence: Duration,
    /// Reconnect backoff policy.
    pub policy: ReconnectPolicy,
}

impl StreamConfig {
    /// Creates a config with production defaults.
    #[must_use]
    pub fn new(program_id: Address) -> Self {
        Self::from_settings(program_id, "confirmed", &StreamSettings::default())
    }

    /// Builds a config from loaded settings.
    #[must_use]
    pub fn from_settings(
        program_id: Address,
        commitment: impl Into<String>,
        settings: &StreamSettings,
    ) -> Self {
        Self {
            program_id,
            commitment: commitment.into(),
            auto_connect: true,
            connect_timeout: settings.connect_timeout(),
            stabilization: settings.stabilization(),
            health_interval: settings.health_interval(),
            event_silence: Duration::from_millis(settings.event_silence_ms),
            probe_silence: Duration::from_millis(settings.probe_silence_ms),
            policy: ReconnectPolicy {
                base: Duration::from_millis(settings.reconnect_base_ms),
                cap: Duration::from_millis(settings.reconnect_cap_ms),
                max_attempts: settings.max_reconnect_attempts,
            },
        }
    }
}

type Handler = Box<dyn Fn(&EventRecord) + Send + Sync>;

/// Per-kind event callbacks. Unset kinds are reported at debug level and
/// dropped; the dispatch site is the one exhaustive match, so a new
/// event kind cannot be forgotten silently.
#[derive(Default)]
pub struct EventHandlers {
    warrior_created: Option<Handler>,
    room_created: Option<Handler>,
    player_joined: Option<Handler>,
    player_ready: Option<Handler>,
    room_cancelled: Option<Handler>,
    battle_started: Option<Handler>,
    damage_dealt: Option<Handler>,
    answer_submitted: Option<Handler>,
    answer_revealed: Option<Handler>,
    round_scored: Option<Handler>,
    next_question: Option<Handler>,
    player_eliminated: Option<Handler>,
    battle_won: Option<Handler>,
    delegation_changed: Option<Handler>,
    warrior_released: Option<Handler>,
}

macro_rules! handler_setter {
    ($(#[$doc:meta])* $name:ident, $field:ident) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name(mut self, f: impl Fn(&EventRecord) + Send + Sync + 'static) -> Self {
            self.$field = Some(Box::new(f));
            self
        }
    };
}

impl EventHandlers {
    /// Creates an empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    handler_setter!(/// Called for every `WarriorCreated`.
        on_warrior_created, warrior_created);
    handler_setter!(/// Called for every `RoomCreated`.
        on_room_created, room_created);
    handler_setter!(/// Called for every `PlayerJoined`.
        on_player_joined, player_joined);
    handler_setter!(/// Called for every `PlayerReady`.
        on_player_ready, player_ready);
    handler_setter!(/// Called for every `RoomCancelled`.
        on_room_cancelled, room_cancelled);
    handler_setter!(/// Called once per room for `BattleStarted`, whichever detection path fired.
        on_battle_started, battle_started);
    handler_setter!(/// Called for every `DamageDealt`.
        on_damage_dealt, damage_dealt);
    handler_setter!(/// Called for every `AnswerSubmitted`.
        on_answer_submitted, answer_submitted);
    handler_setter!(/// Called for every `AnswerRevealed`.
        on_answer_revealed, answer_revealed);
    handler_setter!(/// Called for every `RoundScored`.
        on_round_scored, round_scored);
    handler_setter!(/// Called for every `NextQuestion`.
        on_next_question, next_question);
    handler_setter!(/// Called for every `PlayerEliminated`.
        on_player_eliminated, player_eliminated);
    handler_setter!(/// Called for every `BattleWon`.
        on_battle_won, battle_won);
    handler_setter!(/// Called for every `DelegationChanged`.
        on_delegation_changed, delegation_changed);
    handler_setter!(/// Called for every `WarriorReleased`.
        on_warrior_released, warrior_released);

    fn dispatch(&self, record: &EventRecord) {
        let handler = match &record.event {
            ArenaEvent::WarriorCreated(_) => &self.warrior_created,
            ArenaEvent::RoomCreated(_) => &self.room_created,
            ArenaEvent::PlayerJoined(_) => &self.player_joined,
            ArenaEvent::PlayerReady(_) => &self.player_ready,
            ArenaEvent::RoomCancelled(_) => &self.room_cancelled,
            ArenaEvent::BattleStarted(_) => &self.battle_started,
            ArenaEvent::DamageDealt(_) => &self.damage_dealt,
            ArenaEvent::AnswerSubmitted(_) => &self.answer_submitted,
            ArenaEvent::AnswerRevealed(_) => &self.answer_revealed,
            ArenaEvent::RoundScored(_) => &self.round_scored,
            ArenaEvent::NextQuestion(_) => &self.next_question,
            ArenaEvent::PlayerEliminated(_) => &self.player_eliminated,
            ArenaEvent::BattleWon(_) => &self.battle_won,
            ArenaEvent::DelegationChanged(_) => &self.delegation_changed,
            ArenaEvent::WarriorReleased(_) => &self.warrior_released,
        };
        match handler {
            Some(f) => f(record),
            None => tracing::debug!(kind = record.event.kind(), "no handler registered"),
        }
    }
}

struct Shared {
    config: StreamConfig,
    connector: Arc<dyn SocketConnector>,
    hub: Arc<NoticeHub>,
    handlers: Mutex<Arc<EventHandlers>>,
    history: Mutex<EventHistory>,
    state: Mutex<ConnState>,
    guard: Arc<BattleStartGuard>,
    watched_room: Mutex<Option<Address>>,
    request_id: AtomicU64,
    destroyed: AtomicBool,
    shutdown: Notify,
    /// Wakes the run loop when the watched room changes mid-session.
    watch_signal: Notify,
}

impl Shared {
    /// The single place state transitions happen.
    fn apply(&self, input: ConnInput) -> Vec<ConnEffect> {
        let mut state = self.state.lock();
        let (next, effects) = transition(*state, input, &self.config.policy, &mut rand::thread_rng());
        if next != *state {
            tracing::debug!(from = ?*state, to = ?next, ?input, "connection transition");
        }
        *state = next;
        effects
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Delivery funnel for all three detection paths.
    fn deliver(&self, record: EventRecord) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        if let ArenaEvent::BattleStarted(payload) = &record.event {
            if !self.guard.claim(payload.room, &record.signature) {
                return;
            }
        }
        self.history.lock().push(record.clone());
        // Handlers may call back into the client; dispatch without
        // holding the lock.
        let handlers = Arc::clone(&*self.handlers.lock());
        handlers.dispatch(&record);
    }

    fn ingest_logs(&self, signature: &str, lines: &[String]) {
        for line in lines {
            if let Some(event) = decode_log_line(line) {
                tracing::debug!(kind = event.kind(), signature, "event decoded");
                self.deliver(EventRecord::now(event, signature));
            }
        }
    }

    fn ingest_account_update(&self, pubkey: Option<&str>, data_b64: &str) {
        let address = match pubkey.and_then(|p| p.parse::<Address>().ok()) {
            Some(a) => Some(a),
            None => *self.watched_room.lock(),
        };
        let Some(room) = address else { return };
        let Ok(bytes) = BASE64.decode(data_b64) else { return };
        let Ok(account) = BattleRoomAccount::decode(&bytes) else { return };
        if let Some(payload) = synthesize_battle_started(room, &account) {
            let signature = format!("account-watch:{room}");
            tracing::info!(%room, "battle start detected by account watcher");
            self.deliver(EventRecord::now(ArenaEvent::BattleStarted(payload), signature));
        }
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.hub.publish(Notice::new(level, message));
    }
}

/// How one connected session ended.
enum SessionEnd {
    /// Server closed with a clean-shutdown code.
    Clean,
    /// Abnormal closure; reconnect.
    Lost(u16),
    /// Silence threshold exceeded; force-close and reconnect.
    Unhealthy,
    /// Server reported an internal fault; force-close and reconnect.
    ServerFault,
    /// The client was destroyed.
    Destroyed,
}

/// Resilient log-subscription client. See the crate docs for the big
/// picture.
pub struct StreamClient {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamClient {
    /// Creates a client. No I/O happens until `initialize`/`connect`.
    #[must_use]
    pub fn new(config: StreamConfig, connector: Arc<dyn SocketConnector>, hub: Arc<NoticeHub>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                hub,
                handlers: Mutex::new(Arc::new(EventHandlers::new())),
                history: Mutex::new(EventHistory::new()),
                state: Mutex::new(ConnState::Disconnected),
                guard: Arc::new(BattleStartGuard::new()),
                watched_room: Mutex::new(None),
                request_id: AtomicU64::new(1),
                destroyed: AtomicBool::new(false),
                shutdown: Notify::new(),
                watch_signal: Notify::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Connects when auto-connect is configured; otherwise a no-op.
    ///
    /// # Errors
    ///
    /// Propagates [`StreamError`] from the connect attempt.
    pub async fn initialize(&self) -> Result<(), StreamError> {
        if self.shared.config.auto_connect {
            self.connect().await
        } else {
            Ok(())
        }
    }

    /// Opens the socket and starts the run loop. No-op when a session is
    /// already open or being dialed.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Destroyed`] after `disconnect()`,
    /// [`StreamError::ConnectTimeout`] when the dial exceeds the hard
    /// timeout, or the transport error otherwise.
    pub async fn connect(&self) -> Result<(), StreamError> {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return Err(StreamError::Destroyed);
        }
        if matches!(
            self.state(),
            ConnState::Connected { .. } | ConnState::Connecting { .. } | ConnState::Reconnecting { .. }
        ) {
            tracing::debug!("connect ignored, session already active");
            return Ok(());
        }
        // A finished run loop may still hold the slot; clear it.
        if let Some(stale) = self.task.lock().take() {
            stale.abort();
        }

        self.shared.apply(ConnInput::ConnectRequested);
        let dial = self.shared.connector.dial();
        let transport = match tokio::time::timeout(self.shared.config.connect_timeout, dial).await {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                self.shared.apply(ConnInput::ConnectFailed);
                return Err(e);
            }
            Err(_) => {
                self.shared.apply(ConnInput::ConnectFailed);
                return Err(StreamError::ConnectTimeout);
            }
        };
        self.shared.apply(ConnInput::DialSucceeded);

        let shared = Arc::clone(&self.shared);
        *self.task.lock() = Some(tokio::spawn(run_loop(shared, transport)));
        Ok(())
    }

    /// Tears the session down for good. Idempotent; after this call no
    /// handler runs and no reconnect is attempted, ever.
    pub fn disconnect(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("stream client destroyed");
        self.shared.apply(ConnInput::DestroyRequested);
        *self.shared.handlers.lock() = Arc::new(EventHandlers::new());
        *self.shared.watched_room.lock() = None;
        self.shared.guard.clear();
        self.shared.shutdown.notify_one();
        self.task.lock().take();
    }

    /// Registers the handler set, replacing any previous one.
    pub fn set_handlers(&self, handlers: EventHandlers) {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        *self.shared.handlers.lock() = Arc::new(handlers);
    }

    /// Points the account watcher at one room: subscribes to the room
    /// account on the live socket (and again after every reconnect), and
    /// attributes account notifications lacking an address to this room.
    pub fn watch_battle_start(&self, room: Address) {
        *self.shared.watched_room.lock() = Some(room);
        self.shared.watch_signal.notify_one();
    }

    /// Stops attributing anonymous account notifications to a room.
    pub fn clear_battle_watch(&self) {
        *self.shared.watched_room.lock() = None;
    }

    /// Spawns the time-boxed polling fallback for `room`. Detections
    /// funnel through the same guard and handler path as live events.
    pub fn spawn_battle_start_poll(&self, rpc: Arc<dyn LedgerRpc>, room: Address) {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let guard = Arc::clone(&self.shared.guard);
        tokio::spawn(async move {
            poll_battle_start(rpc, guard, room, move |record| shared.deliver(record)).await;
        });
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnState {
        *self.shared.state.lock()
    }

    /// Snapshot of recent events, most recent first.
    #[must_use]
    pub fn history(&self) -> Vec<EventRecord> {
        self.shared.history.lock().recent()
    }

    /// Whether `disconnect()` has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }
}

/// Owns the transport across sessions and reconnects until the session
/// ends cleanly, terminally fails, or is destroyed.
async fn run_loop(shared: Arc<Shared>, mut transport: Box<dyn SocketTransport>) {
    loop {
        let end = run_session(&shared, transport.as_mut()).await;
        if shared.destroyed.load(Ordering::SeqCst) {
            let _ = transport.close(1000).await;
            return;
        }
        let input = match end {
            SessionEnd::Destroyed => {
                let _ = transport.close(1000).await;
                return;
            }
            SessionEnd::Clean => {
                shared.apply(ConnInput::CleanClose);
                tracing::info!("server closed the stream cleanly");
                return;
            }
            SessionEnd::Lost(code) => {
                shared.notify(NoticeLevel::Warning, "connection lost, reconnecting");
                ConnInput::UnexpectedClose(code)
            }
            SessionEnd::Unhealthy => {
                shared.notify(NoticeLevel::Warning, "connection unhealthy, reconnecting");
                ConnInput::HealthTimeout
            }
            SessionEnd::ServerFault => ConnInput::ServerInternalError,
        };
        if reconnect(&shared, input, &mut transport).await {
            shared.notify(NoticeLevel::Success, "reconnected to event stream");
        } else {
            return;
        }
    }
}

/// Interprets machine effects until a new socket is open or retries run
/// out. Returns false when the loop must stop.
async fn reconnect(shared: &Arc<Shared>, input: ConnInput, transport: &mut Box<dyn SocketTransport>) -> bool {
    let mut effects = shared.apply(input);
    loop {
        let mut delay = None;
        let mut dial = false;
        let mut terminal = None;
        for effect in effects {
            match effect {
                ConnEffect::CloseSocket { code } => {
                    let _ = transport.close(code).await;
                }
                ConnEffect::ScheduleReconnect { delay: d } => delay = Some(d),
                ConnEffect::Dial => dial = true,
                ConnEffect::FailTerminal(message) => terminal = Some(message),
                // Realized by the next run_session.
                ConnEffect::StartHealth | ConnEffect::Subscribe => {}
                ConnEffect::Resubscribe { .. } | ConnEffect::AbandonSubscription => {}
                ConnEffect::ClearHandlers => {}
            }
        }
        if let Some(message) = terminal {
            tracing::error!(message, "giving up on the event stream");
            shared.notify(NoticeLevel::Error, message);
            return false;
        }
        if let Some(d) = delay {
            tracing::info!(delay_ms = d.as_millis() as u64, "reconnect scheduled");
            tokio::select! {
                () = tokio::time::sleep(d) => {}
                () = shared.shutdown.notified() => return false,
            }
            effects = shared.apply(ConnInput::RetryTimerFired);
            continue;
        }
        if dial {
            let attempt = shared.connector.dial();
            match tokio::time::timeout(shared.config.connect_timeout, attempt).await {
                Ok(Ok(t)) => {
                    *transport = t;
                    shared.apply(ConnInput::DialSucceeded);
                    return true;
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "redial failed");
                    effects = shared.apply(ConnInput::DialFailed);
                    continue;
                }
                Err(_) => {
                    tracing::warn!("redial timed out");
                    effects = shared.apply(ConnInput::DialFailed);
                    continue;
                }
            }
        }
        return false;
    }
}

enum Act {
    Shutdown,
    Subscribe,
    Watch,
    HealthTick,
    Frame(Option<Result<Frame, StreamError>>),
}

/// Sends the account watch subscription for the currently watched room,
/// if any. Returns the request id when a request actually went out;
/// `sent` suppresses resends for a room already watched on this socket.
async fn send_account_watch(
    shared: &Shared,
    transport: &mut dyn SocketTransport,
    sent: &mut Option<Address>,
) -> Result<Option<u64>, StreamError> {
    let Some(room) = *shared.watched_room.lock() else {
        return Ok(None);
    };
    if *sent == Some(room) {
        return Ok(None);
    }
    let id = shared.next_request_id();
    let request = protocol::account_subscribe_request(id, &room, &shared.config.commitment);
    tracing::debug!(%room, "sending account watch subscription");
    transport.send(request).await?;
    *sent = Some(room);
    Ok(Some(id))
}

/// Drives one open socket: stabilization + subscribe, liveness probes,
/// frame handling. Returns how the session ended.
async fn run_session(shared: &Arc<Shared>, transport: &mut dyn SocketTransport) -> SessionEnd {
    let config = &shared.config;
    let mut last_event = tokio::time::Instant::now();
    let mut last_probe_ok = tokio::time::Instant::now();
    let mut subscribed = false;
    let mut watched_sent: Option<Address> = None;
    // One id per session for the log subscription, reused on a throttled
    // resubscribe; watch requests get fresh ids as they go out.
    let log_request = shared.next_request_id();
    let mut watch_request: Option<u64> = None;

    let subscribe = tokio::time::sleep(config.stabilization);
    tokio::pin!(subscribe);
    let mut health = tokio::time::interval_at(
        tokio::time::Instant::now() + config.health_interval,
        config.health_interval,
    );

    loop {
        if shared.destroyed.load(Ordering::SeqCst) {
            return SessionEnd::Destroyed;
        }
        let act = tokio::select! {
            () = shared.shutdown.notified() => Act::Shutdown,
            () = &mut subscribe, if !subscribed => Act::Subscribe,
            () = shared.watch_signal.notified() => Act::Watch,
            _ = health.tick() => Act::HealthTick,
            frame = transport.recv() => Act::Frame(frame),
        };
        match act {
            Act::Shutdown => return SessionEnd::Destroyed,

            Act::Subscribe => {
                subscribed = true;
                let request =
                    protocol::subscribe_request(log_request, &config.program_id, &config.commitment);
                tracing::debug!("sending log subscription");
                if transport.send(request).await.is_err() {
                    return SessionEnd::Lost(CLOSE_ABNORMAL);
                }
                match send_account_watch(shared, transport, &mut watched_sent).await {
                    Ok(Some(id)) => watch_request = Some(id),
                    Ok(None) => {}
                    Err(_) => return SessionEnd::Lost(CLOSE_ABNORMAL),
                }
            }

            // A room was (re)watched; subscribe to its account on the
            // live socket. Before the log subscription goes out the
            // stabilization path picks it up instead.
            Act::Watch => {
                if subscribed {
                    match send_account_watch(shared, transport, &mut watched_sent).await {
                        Ok(Some(id)) => watch_request = Some(id),
                        Ok(None) => {}
                        Err(_) => return SessionEnd::Lost(CLOSE_ABNORMAL),
                    }
                }
            }

            Act::HealthTick => {
                if last_event.elapsed() >= config.event_silence
                    || last_probe_ok.elapsed() >= config.probe_silence
                {
                    tracing::warn!(
                        event_silence_s = last_event.elapsed().as_secs(),
                        "silence threshold exceeded, forcing reconnect"
                    );
                    return SessionEnd::Unhealthy;
                }
                let probe = protocol::probe_request(shared.next_request_id());
                if transport.send(probe).await.is_err() {
                    return SessionEnd::Lost(CLOSE_ABNORMAL);
                }
            }

            Act::Frame(None) => return SessionEnd::Lost(CLOSE_ABNORMAL),
            Act::Frame(Some(Err(e))) => {
                tracing::warn!(error = %e, "transport error");
                return SessionEnd::Lost(CLOSE_ABNORMAL);
            }
            Act::Frame(Some(Ok(Frame::Closed { code }))) => {
                return if is_clean_close(code) {
                    SessionEnd::Clean
                } else {
                    SessionEnd::Lost(code)
                };
            }
            Act::Frame(Some(Ok(Frame::Text(text)))) => {
                match protocol::parse_inbound(&text) {
                    Inbound::Confirmation { request, subscription } => {
                        if request == log_request {
                            tracing::info!(subscription, "log subscription confirmed");
                            shared.apply(ConnInput::SubscriptionConfirmed(subscription));
                        } else if watch_request == Some(request) {
                            tracing::info!(subscription, "account watch confirmed");
                        } else {
                            tracing::debug!(request, subscription, "confirmation for unknown request");
                        }
                    }
                    Inbound::ProbeOk { .. } => {
                        last_probe_ok = tokio::time::Instant::now();
                    }
                    Inbound::Error { code, message } => {
                        match protocol::classify_error(code, &message) {
                            ErrorKind::RateLimited => {
                                let effects = shared.apply(ConnInput::ServerRateLimited);
                                for effect in effects {
                                    if let ConnEffect::Resubscribe { delay } = effect {
                                        tracing::warn!(
                                            delay_ms = delay.as_millis() as u64,
                                            "subscription throttled, backing off"
                                        );
                                        subscribed = false;
                                        subscribe
                                            .as_mut()
                                            .reset(tokio::time::Instant::now() + delay);
                                    }
                                }
                            }
                            ErrorKind::InvalidParams => {
                                shared.apply(ConnInput::ServerInvalidParams);
                                tracing::error!(message, "subscription rejected");
                                shared.notify(NoticeLevel::Error, "event subscription rejected");
                            }
                            ErrorKind::Internal => return SessionEnd::ServerFault,
                            ErrorKind::Other => {
                                tracing::debug!(code, message, "ignoring server error");
                            }
                        }
                    }
                    Inbound::Logs { signature, lines } => {
                        last_event = tokio::time::Instant::now();
                        shared.ingest_logs(&signature, &lines);
                    }
                    Inbound::AccountUpdate { pubkey, data } => {
                        last_event = tokio::time::Instant::now();
                        shared.ingest_account_update(pubkey.as_deref(), &data);
                    }
                    Inbound::Unknown => tracing::trace!("unrecognized frame"),
                }
            }
        }
    }
}
