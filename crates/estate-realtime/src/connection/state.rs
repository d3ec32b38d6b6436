//! Connection state machine.
//!
//! [`transition`] is a pure function from the current state and an event to
//! the next state plus the effects the driver must carry out. Nothing here
//! touches a socket or a timer.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use estate_core::types::Severity;

use crate::events;
use crate::message::ErrorCode;

use super::backoff::ReconnectPolicy;

/// Notice shown once automatic reconnects are exhausted.
pub const DEGRADED_NOTICE: &str = "Lost connection to real-time updates";

/// Lifecycle of the single connection a channel owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected, or disconnected on purpose.
    Idle,
    /// Transport open requested. `attempt` counts consecutive failures.
    Connecting {
        /// Consecutive failures so far.
        attempt: u32,
    },
    /// Transport open, waiting for the server to accept the token.
    OpenUnauthenticated {
        /// Consecutive failures so far.
        attempt: u32,
    },
    /// Transport open and token accepted.
    OpenAuthenticated,
    /// Transport closed.
    Closed {
        /// Consecutive failures, including this one.
        attempts: u32,
        /// Whether a reconnect is scheduled.
        retrying: bool,
    },
}

impl ConnectionState {
    /// Transport is open.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::OpenUnauthenticated { .. } | Self::OpenAuthenticated
        )
    }

    /// Transport is open and the token accepted.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::OpenAuthenticated)
    }

    /// Transport is open or being opened.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting { .. }) || self.is_open()
    }

    /// Consecutive failures counted by this state.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Idle | Self::OpenAuthenticated => 0,
            Self::Connecting { attempt } | Self::OpenUnauthenticated { attempt } => *attempt,
            Self::Closed { attempts, .. } => *attempts,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// `connect()` was called.
    Connect,
    /// The transport finished opening.
    TransportOpened,
    /// The transport could not be opened.
    TransportFailed(String),
    /// The open transport reported an error. A close follows.
    TransportError(String),
    /// The transport closed.
    TransportClosed,
    /// The server accepted the token.
    Authenticated(Value),
    /// The server sent an error frame.
    RemoteError {
        /// Parsed code.
        code: ErrorCode,
        /// The whole frame.
        payload: Value,
    },
    /// An application event arrived.
    Inbound {
        /// Value of the frame's `type`.
        event_type: String,
        /// The whole frame.
        payload: Value,
    },
    /// The scheduled reconnect delay elapsed.
    ReconnectDue,
    /// `disconnect()` was called.
    Disconnect,
}

/// Work the driver performs after a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a new transport.
    OpenTransport,
    /// Send `authenticate` with the stored token.
    SendAuthenticate,
    /// Send `subscribe` for every remembered channel.
    ReplaySubscriptions,
    /// Fire [`ConnectionEvent::ReconnectDue`] after the delay.
    ScheduleReconnect(Duration),
    /// Drop a scheduled reconnect.
    CancelReconnect,
    /// Close the current transport.
    CloseTransport,
    /// Show a transient notice.
    Notify {
        /// Message text.
        message: &'static str,
        /// Severity.
        severity: Severity,
    },
    /// Show the persistent degraded-mode notice.
    NotifyDegraded,
    /// Deliver an event to listeners.
    Emit {
        /// Event name.
        event: String,
        /// Payload handed to each listener.
        payload: Value,
    },
}

impl Effect {
    fn emit(event: impl Into<String>, payload: Value) -> Self {
        Self::Emit {
            event: event.into(),
            payload,
        }
    }
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Next state.
    pub state: ConnectionState,
    /// Effects to run, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: ConnectionState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    fn stay(state: ConnectionState) -> Self {
        Self::to(state, Vec::new())
    }
}

/// Computes the next state and effects.
///
/// Events that make no sense in the current state (a late open after a
/// disconnect, a reconnect timer that lost a race) leave it unchanged.
pub fn transition(
    state: ConnectionState,
    event: ConnectionEvent,
    policy: &ReconnectPolicy,
) -> Transition {
    use ConnectionEvent as E;
    use ConnectionState as S;

    match (state, event) {
        (S::Idle, E::Connect) | (S::Closed { retrying: false, .. }, E::Connect) => {
            Transition::to(S::Connecting { attempt: 0 }, vec![Effect::OpenTransport])
        }
        (
            S::Closed {
                attempts,
                retrying: true,
            },
            E::Connect,
        ) => Transition::to(
            S::Connecting { attempt: attempts },
            vec![Effect::CancelReconnect, Effect::OpenTransport],
        ),
        (s, E::Connect) => Transition::stay(s),

        (S::Connecting { attempt }, E::TransportOpened) => Transition::to(
            S::OpenUnauthenticated { attempt },
            vec![
                Effect::SendAuthenticate,
                Effect::Notify {
                    message: "Connected to real-time updates",
                    severity: Severity::Info,
                },
                Effect::emit(events::CONNECTED, Value::Null),
            ],
        ),

        (S::Connecting { attempt }, E::TransportFailed(message)) => {
            let mut next = closing(attempt, policy);
            next.effects
                .insert(0, Effect::emit(events::ERROR, json!({ "message": message })));
            next
        }

        (s, E::TransportError(message)) if s.is_active() => Transition::to(
            s,
            vec![Effect::emit(events::ERROR, json!({ "message": message }))],
        ),

        (S::Connecting { attempt }, E::TransportClosed)
        | (S::OpenUnauthenticated { attempt }, E::TransportClosed) => closing(attempt, policy),
        (S::OpenAuthenticated, E::TransportClosed) => closing(0, policy),

        (S::OpenUnauthenticated { .. }, E::Authenticated(payload)) => Transition::to(
            S::OpenAuthenticated,
            vec![
                Effect::emit(events::AUTHENTICATED, payload),
                Effect::ReplaySubscriptions,
            ],
        ),
        (S::OpenAuthenticated, E::Authenticated(payload)) => Transition::to(
            S::OpenAuthenticated,
            vec![Effect::emit(events::AUTHENTICATED, payload)],
        ),

        (s, E::RemoteError { code, payload }) if s.is_open() => {
            let next = match (s, &code) {
                (S::OpenAuthenticated, ErrorCode::Unauthorized) => {
                    S::OpenUnauthenticated { attempt: 0 }
                }
                _ => s,
            };
            let mut effects = Vec::with_capacity(2);
            if code == ErrorCode::Unauthorized {
                effects.push(Effect::Notify {
                    message: "Real-time authentication failed",
                    severity: Severity::Error,
                });
            }
            effects.push(Effect::emit(code.event(), payload));
            Transition::to(next, effects)
        }

        (s, E::Inbound {
            event_type,
            payload,
        }) if s.is_open() => Transition::to(s, vec![Effect::emit(event_type, payload)]),

        (
            S::Closed {
                attempts,
                retrying: true,
            },
            E::ReconnectDue,
        ) => Transition::to(
            S::Connecting { attempt: attempts },
            vec![Effect::OpenTransport],
        ),

        (_, E::Disconnect) => Transition::to(
            S::Idle,
            vec![Effect::CancelReconnect, Effect::CloseTransport],
        ),

        (s, _) => Transition::stay(s),
    }
}

/// The transport went away after `failures` consecutive failures.
fn closing(failures: u32, policy: &ReconnectPolicy) -> Transition {
    let disconnected = Effect::emit(events::DISCONNECTED, Value::Null);

    if policy.allows_retry(failures) {
        let attempts = failures + 1;
        Transition::to(
            ConnectionState::Closed {
                attempts,
                retrying: true,
            },
            vec![
                disconnected,
                Effect::ScheduleReconnect(policy.delay(attempts)),
            ],
        )
    } else {
        Transition::to(
            ConnectionState::Closed {
                attempts: failures,
                retrying: false,
            },
            vec![disconnected, Effect::NotifyDegraded],
        )
    }
}
