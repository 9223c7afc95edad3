//! # Load Session
//!
//! Orchestrates the cold-start read sequence for one identity:
//!
//! ```text
//! Idle ──▶ Loading(Balance) ──▶ Loading(Config) ──▶ Loading(Profile)
//!                                                        │
//!            Ready ◀── Loading(Warriors) ◀───────────────┘
//! ```
//!
//! Steps run strictly in order with a short gap between them so a cold
//! start never bursts the provider. Any step failure parks the session in
//! `Error`; a later `load_all` restarts the cycle from the beginning. At
//! most one cycle runs at a time per session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use mindclash_core::Address;

use crate::reader::LedgerReader;
use crate::rpc::RpcError;
use crate::snapshot::{ConfigSnapshot, ProfileSnapshot, WarriorSnapshot};

/// The read currently in progress within a load cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStep {
    /// Wallet balance.
    Balance,
    /// Global config singleton.
    Config,
    /// Player profile.
    Profile,
    /// Owned and delegated warriors.
    Warriors,
}

/// Where the session is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    /// No cycle has run yet.
    Idle,
    /// A cycle is in progress at the given step.
    Loading(LoadStep),
    /// The last cycle completed.
    Ready,
    /// The last cycle failed.
    Error(String),
}

/// Everything a cold start needs, gathered by one completed cycle.
#[derive(Clone, Debug)]
pub struct LoadedState {
    /// Wallet lamport balance.
    pub balance: u64,
    /// Global config.
    pub config: ConfigSnapshot,
    /// Player profile, `None` for a brand-new player.
    pub profile: Option<ProfileSnapshot>,
    /// Warriors held by the player.
    pub warriors: Vec<WarriorSnapshot>,
    /// Warriors currently handed to the delegation program.
    pub delegated: Vec<WarriorSnapshot>,
}

/// Errors from the load cycle.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A cycle is already running; the caller should wait for it.
    #[error("a load cycle is already in flight")]
    AlreadyLoading,

    /// A read step failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// One identity's sequenced cold-start loader.
pub struct LoadSession {
    reader: Arc<LedgerReader>,
    owner: Address,
    phase: Mutex<LoadPhase>,
    loaded: Mutex<Option<LoadedState>>,
    in_flight: AtomicBool,
    step_gap: Duration,
}

impl LoadSession {
    /// Default pause between consecutive load steps.
    pub const DEFAULT_STEP_GAP: Duration = Duration::from_millis(300);

    /// Creates a session for `owner` over the given reader.
    #[must_use]
    pub fn new(reader: Arc<LedgerReader>, owner: Address) -> Self {
        Self {
            reader,
            owner,
            phase: Mutex::new(LoadPhase::Idle),
            loaded: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            step_gap: Self::DEFAULT_STEP_GAP,
        }
    }

    /// Overrides the pause between steps.
    #[must_use]
    pub fn with_step_gap(mut self, gap: Duration) -> Self {
        self.step_gap = gap;
        self
    }

    /// The identity this session loads for.
    #[must_use]
    pub const fn owner(&self) -> &Address {
        &self.owner
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LoadPhase {
        self.phase.lock().clone()
    }

    /// The most recently completed load, if any.
    #[must_use]
    pub fn loaded(&self) -> Option<LoadedState> {
        self.loaded.lock().clone()
    }

    /// Runs the full load cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyLoading`] when a cycle is already in
    /// flight, or the first step failure otherwise. On failure the phase
    /// becomes [`LoadPhase::Error`] and the previous loaded state is kept.
    pub async fn load_all(&self) -> Result<LoadedState, SessionError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyLoading);
        }

        let result = self.run_cycle().await;
        match &result {
            Ok(state) => {
                *self.loaded.lock() = Some(state.clone());
                *self.phase.lock() = LoadPhase::Ready;
                tracing::info!(owner = %self.owner, "load cycle complete");
            }
            Err(e) => {
                *self.phase.lock() = LoadPhase::Error(e.to_string());
                tracing::warn!(owner = %self.owner, error = %e, "load cycle failed");
            }
        }
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_cycle(&self) -> Result<LoadedState, SessionError> {
        self.enter(LoadStep::Balance);
        let balance = self.reader.get_balance(&self.owner).await?;

        self.pause().await;
        self.enter(LoadStep::Config);
        let config = self.reader.get_config().await?;

        self.pause().await;
        self.enter(LoadStep::Profile);
        let profile = self.reader.get_profile(&self.owner).await?;

        self.pause().await;
        self.enter(LoadStep::Warriors);
        let warriors = self.reader.get_player_warriors(&self.owner).await?;
        let delegated = self.reader.get_delegated_warriors(&self.owner).await?;

        Ok(LoadedState {
            balance,
            config,
            profile,
            warriors,
            delegated,
        })
    }

    fn enter(&self, step: LoadStep) {
        tracing::debug!(owner = %self.owner, ?step, "load step");
        *self.phase.lock() = LoadPhase::Loading(step);
    }

    async fn pause(&self) {
        if !self.step_gap.is_zero() {
            tokio::time::sleep(self.step_gap).await;
        }
    }
}
