//! # Connection State Machine
//!
//! Every lifecycle transition flows through one pure function:
//! `(state, input) -> (state, effects)`. The run loop interprets the
//! effects; nothing in here touches a socket or a timer, so the whole
//! reconnection policy is unit-testable without a live transport.
//!
//! ```text
//! Disconnected ──ConnectRequested──▶ Connecting ──DialSucceeded──▶ Connected
//!       ▲                               │  ▲                          │
//!       │ ceiling                DialFailed │ RetryTimerFired   UnexpectedClose
//!       │                               ▼  │                          │
//!       └────────────────────────── Reconnecting ◀────────────────────┘
//!
//!                     any state ──DestroyRequested──▶ Destroyed (terminal)
//! ```
//!
//! `Destroyed` is absorbing: every input yields no effects, so no code
//! path can resurrect a destroyed session.

use std::time::Duration;

use rand::Rng;

/// Close codes the server uses for an intentional shutdown.
#[must_use]
pub const fn is_clean_close(code: u16) -> bool {
    code == 1000 || code == 1001
}

/// Close code this client uses when it force-closes an unhealthy socket.
pub const CLOSE_UNHEALTHY: u16 = 4000;

/// Where the connection lifecycle currently is.
///
/// `attempt` counts dial attempts since the last successful connect;
/// 0 is the caller-initiated connect, 1.. are reconnects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnState {
    /// No socket, no pending retry.
    Disconnected,
    /// A dial is in flight.
    Connecting {
        /// Dial attempt number.
        attempt: u32,
    },
    /// Socket open; subscription id once the server confirmed it.
    Connected {
        /// Server-assigned subscription id.
        subscription: Option<u64>,
    },
    /// Waiting out the backoff before the next dial.
    Reconnecting {
        /// Upcoming dial attempt number.
        attempt: u32,
    },
    /// Terminal. Nothing transitions out of here.
    Destroyed,
}

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnInput {
    /// Caller asked for a connection.
    ConnectRequested,
    /// The dial completed and the socket is open.
    DialSucceeded,
    /// The dial failed; retry per policy.
    DialFailed,
    /// The caller-facing initial dial failed; no retry, the caller sees
    /// the error directly.
    ConnectFailed,
    /// Server confirmed the log subscription.
    SubscriptionConfirmed(u64),
    /// Socket closed with a clean-shutdown code.
    CleanClose,
    /// Socket closed abnormally (anything but 1000/1001).
    UnexpectedClose(u16),
    /// Event or probe silence exceeded its threshold.
    HealthTimeout,
    /// Backoff elapsed; time to dial again.
    RetryTimerFired,
    /// Server throttled the subscription.
    ServerRateLimited,
    /// Server rejected the subscription parameters.
    ServerInvalidParams,
    /// Server reported an internal error.
    ServerInternalError,
    /// Caller asked for teardown.
    DestroyRequested,
}

/// What the run loop must do after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnEffect {
    /// Open a new socket.
    Dial,
    /// Start the health monitor.
    StartHealth,
    /// Send the log-subscription request after the stabilization delay.
    Subscribe,
    /// Wait out the backoff, then feed [`ConnInput::RetryTimerFired`].
    ScheduleReconnect {
        /// Jittered backoff delay.
        delay: Duration,
    },
    /// Re-send the subscription request after a backoff.
    Resubscribe {
        /// Jittered backoff delay.
        delay: Duration,
    },
    /// Close the socket with the given code.
    CloseSocket {
        /// Close code to send.
        code: u16,
    },
    /// This subscription is unusable; report and stop resubscribing.
    AbandonSubscription,
    /// Stop retrying and surface a terminal connection error.
    FailTerminal(&'static str),
    /// Drop registered handlers.
    ClearHandlers,
}

/// Backoff policy for reconnect scheduling.
#[derive(Clone, Copy, Debug)]
pub struct ReconnectPolicy {
    /// First-retry delay.
    pub base: Duration,
    /// Ceiling on the exponential delay, before jitter.
    pub cap: Duration,
    /// Maximum reconnect attempts after a lost connection.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Jittered delay before retry number `retry` (0-based):
    /// `base * 2^retry`, capped, then scaled by a ±20% factor.
    pub fn delay<R: Rng>(&self, retry: u32, rng: &mut R) -> Duration {
        let exp = self
            .base
            .saturating_mul(1u32 << retry.min(16))
            .min(self.cap);
        let jitter = rng.gen_range(0.8..=1.2);
        Duration::from_secs_f64(exp.as_secs_f64() * jitter)
    }
}

/// The single transition entry point.
///
/// Pure given the RNG: no I/O, no timers, no shared mutation. The caller
/// interprets the returned effects.
pub fn transition<R: Rng>(
    state: ConnState,
    input: ConnInput,
    policy: &ReconnectPolicy,
    rng: &mut R,
) -> (ConnState, Vec<ConnEffect>) {
    use ConnEffect as E;
    use ConnInput as I;
    use ConnState as S;

    match (state, input) {
        // Terminal state absorbs everything.
        (S::Destroyed, _) => (S::Destroyed, vec![]),

        (_, I::DestroyRequested) => (
            S::Destroyed,
            vec![E::CloseSocket { code: 1000 }, E::ClearHandlers],
        ),

        (S::Disconnected, I::ConnectRequested) => {
            (S::Connecting { attempt: 0 }, vec![E::Dial])
        }

        (S::Connecting { .. }, I::DialSucceeded) => (
            S::Connected { subscription: None },
            vec![E::StartHealth, E::Subscribe],
        ),

        (S::Connecting { attempt }, I::DialFailed | I::UnexpectedClose(_)) => {
            retry_or_fail(attempt + 1, policy, rng)
        }

        (S::Connecting { .. }, I::ConnectFailed) => (S::Disconnected, vec![]),

        (S::Connected { .. }, I::SubscriptionConfirmed(id)) => (
            S::Connected {
                subscription: Some(id),
            },
            vec![],
        ),

        (S::Connected { .. }, I::CleanClose) => (S::Disconnected, vec![]),

        (S::Connected { .. }, I::UnexpectedClose(_)) => retry_or_fail(1, policy, rng),

        (S::Connected { .. }, I::HealthTimeout) => {
            let (next, mut effects) = retry_or_fail(1, policy, rng);
            effects.insert(0, E::CloseSocket { code: CLOSE_UNHEALTHY });
            (next, effects)
        }

        (S::Connected { .. }, I::ServerRateLimited) => (
            S::Connected { subscription: None },
            vec![E::Resubscribe {
                delay: policy.delay(0, rng),
            }],
        ),

        (S::Connected { .. }, I::ServerInvalidParams) => (
            S::Connected { subscription: None },
            vec![E::AbandonSubscription],
        ),

        (S::Connected { .. }, I::ServerInternalError) => {
            let (next, mut effects) = retry_or_fail(1, policy, rng);
            effects.insert(0, E::CloseSocket { code: 1012 });
            (next, effects)
        }

        (S::Reconnecting { attempt }, I::RetryTimerFired) => {
            (S::Connecting { attempt }, vec![E::Dial])
        }

        // Anything else is a stale or out-of-order input; ignore it.
        (state, input) => {
            tracing::trace!(?state, ?input, "ignoring out-of-order input");
            (state, vec![])
        }
    }
}

fn retry_or_fail<R: Rng>(
    attempt: u32,
    policy: &ReconnectPolicy,
    rng: &mut R,
) -> (ConnState, Vec<ConnEffect>) {
    if attempt > policy.max_attempts {
        (
            ConnState::Disconnected,
            vec![ConnEffect::FailTerminal("reconnect attempts exhausted")],
        )
    } else {
        (
            ConnState::Reconnecting { attempt },
            vec![ConnEffect::ScheduleReconnect {
                delay: policy.delay(attempt - 1, rng),
            }],
        )
    }
}
