//! The realtime channel: drives the connection state machine against a
//! real transport, timers and listeners.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use estate_core::config::RealtimeConfig;
use estate_core::error::AppError;
use estate_core::result::AppResult;
use estate_core::traits::Collaborators;
use estate_core::types::Severity;
use estate_storage::CredentialStore;

use crate::channel::{SubscriptionSet, names};
use crate::connection::backoff::ReconnectPolicy;
use crate::connection::state::{
    ConnectionEvent, ConnectionState, DEGRADED_NOTICE, Effect, transition,
};
use crate::connection::transport::{Connector, TransportFrame};
use crate::events::emitter::{EventEmitter, ListenerHandle};
use crate::message::{ClientMessage, ServerMessage};

/// Read-only snapshot of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    /// Transport is open.
    pub connected: bool,
    /// Server accepted the token.
    pub authenticated: bool,
    /// Consecutive failed connection attempts.
    pub reconnect_attempts: u32,
    /// Full state.
    pub state: ConnectionState,
}

/// Mutable driver state. Guarded by one lock that is never held across an
/// await or while listeners run.
#[derive(Debug)]
struct Core {
    state: ConnectionState,
    /// Bumped on every transport open or close. Frames and open results
    /// tagged with an older value are dropped.
    generation: u64,
    tenant_id: Option<String>,
    subscriptions: SubscriptionSet,
    outbound: Option<mpsc::UnboundedSender<String>>,
    reconnect: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
}

impl Core {
    fn write(&self, message: &str) -> bool {
        match &self.outbound {
            Some(tx) => tx.send(message.to_string()).is_ok(),
            None => false,
        }
    }

    fn write_message(&self, message: &ClientMessage) -> bool {
        self.write(&message.to_json().to_string())
    }

    fn drop_transport(&mut self) {
        self.outbound = None;
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.abort();
        }
    }
}

/// Side effects that run after the lock is released.
enum Deferred {
    Notify(&'static str, Severity),
    Emit(String, Value),
}

struct Inner {
    config: RealtimeConfig,
    policy: ReconnectPolicy,
    store: CredentialStore,
    connector: Arc<dyn Connector>,
    collaborators: Collaborators,
    emitter: EventEmitter,
    core: Mutex<Core>,
}

/// One authenticated push channel, multiplexing named subscriptions over a
/// single transport.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("url", &self.inner.config.url)
            .field("status", &self.status())
            .finish()
    }
}

impl RealtimeChannel {
    /// Creates an idle channel.
    pub fn new(
        config: RealtimeConfig,
        store: CredentialStore,
        connector: Arc<dyn Connector>,
        collaborators: Collaborators,
    ) -> Self {
        let emitter = EventEmitter::new(Arc::clone(&collaborators.reporter));
        Self {
            inner: Arc::new(Inner {
                policy: ReconnectPolicy::from_config(&config),
                config,
                store,
                connector,
                collaborators,
                emitter,
                core: Mutex::new(Core {
                    state: ConnectionState::Idle,
                    generation: 0,
                    tenant_id: None,
                    subscriptions: SubscriptionSet::new(),
                    outbound: None,
                    reconnect: None,
                    pump: None,
                }),
            }),
        }
    }

    /// Records the tenant sent with `authenticate` and connects.
    pub fn init(&self, tenant_id: Option<String>) {
        self.inner.lock().tenant_id = tenant_id;
        self.connect();
    }

    /// Opens the transport. No-op while connecting or open; from a terminal
    /// close this starts a fresh reconnect budget.
    pub fn connect(&self) {
        self.inner.apply(None, ConnectionEvent::Connect, None);
    }

    /// Closes the transport, cancels any scheduled reconnect and removes
    /// every listener. Subscriptions are kept.
    pub fn disconnect(&self) {
        self.inner.apply(None, ConnectionEvent::Disconnect, None);
        self.inner.emitter.clear();
        info!("Realtime channel disconnected");
    }

    /// Sends a raw message. Dropped unless the transport is open.
    pub fn send(&self, message: &Value) -> bool {
        let core = self.inner.lock();
        if !core.state.is_open() {
            debug!(state = ?core.state, "Channel not open; message dropped");
            return false;
        }
        core.write(&message.to_string())
    }

    /// Registers a listener for `event`.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) -> AppResult<()> + Send + Sync + 'static,
    {
        self.inner.emitter.on(event, callback)
    }

    /// Registers a listener for the next `event` only.
    pub fn once<F>(&self, event: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) -> AppResult<()> + Send + Sync + 'static,
    {
        self.inner.emitter.once(event, callback)
    }

    /// Delivers `payload` to the listeners of `event`.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        self.inner.emitter.emit(event, payload)
    }

    /// Remembers `channel` and subscribes to it now if authenticated,
    /// otherwise after the next authentication. Subscribing twice is a no-op.
    pub fn subscribe_to_channel(&self, channel: &str) -> bool {
        let mut core = self.inner.lock();
        if !core.subscriptions.insert(channel) {
            debug!(channel, "Already subscribed");
            return false;
        }
        if core.state.is_authenticated() {
            core.write_message(&ClientMessage::Subscribe {
                channel: channel.to_string(),
            });
        } else {
            debug!(channel, "Subscription queued until authenticated");
        }
        true
    }

    /// Forgets `channel`, telling the server now if authenticated.
    pub fn unsubscribe(&self, channel: &str) -> bool {
        let mut core = self.inner.lock();
        let removed = core.subscriptions.remove(channel);
        if removed && core.state.is_authenticated() {
            core.write_message(&ClientMessage::Unsubscribe {
                channel: channel.to_string(),
            });
        }
        removed
    }

    /// Subscribes to a company's events.
    pub fn subscribe_to_company(&self, company_id: impl std::fmt::Display) -> bool {
        self.subscribe_to_channel(&names::company(company_id))
    }

    /// Subscribes to a user's events.
    pub fn subscribe_to_user(&self, user_id: impl std::fmt::Display) -> bool {
        self.subscribe_to_channel(&names::user(user_id))
    }

    /// Subscribes to an allocation's events.
    pub fn subscribe_to_allocation(&self, allocation_id: impl std::fmt::Display) -> bool {
        self.subscribe_to_channel(&names::allocation(allocation_id))
    }

    /// Subscribes to a payment's events.
    pub fn subscribe_to_payment(&self, payment_id: impl std::fmt::Display) -> bool {
        self.subscribe_to_channel(&names::payment(payment_id))
    }

    /// Remembered channels, in subscription order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner
            .lock()
            .subscriptions
            .iter()
            .map(str::to_string)
            .collect()
    }

    /// Current status.
    pub fn status(&self) -> ChannelStatus {
        let state = self.inner.lock().state;
        ChannelStatus {
            connected: state.is_open(),
            authenticated: state.is_authenticated(),
            reconnect_attempts: state.attempts(),
            state,
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Feeds `event` through the state machine and runs the resulting
    /// effects. `generation` tags events that came from a transport;
    /// `outbound` is attached when a transport finishes opening.
    fn apply(
        self: &Arc<Self>,
        generation: Option<u64>,
        event: ConnectionEvent,
        outbound: Option<mpsc::UnboundedSender<String>>,
    ) {
        let mut deferred = Vec::new();
        {
            let mut core = self.lock();
            if generation.is_some_and(|g| g != core.generation) {
                debug!(?event, "Stale transport event ignored");
                return;
            }
            if let Some(tx) = outbound {
                core.outbound = Some(tx);
            }

            let mut pending = VecDeque::from([event]);
            while let Some(event) = pending.pop_front() {
                let from = core.state;
                let step = transition(from, event, &self.policy);
                if step.state != from {
                    debug!(from = ?from, to = ?step.state, "Connection state changed");
                }
                core.state = step.state;
                if !core.state.is_open() && !matches!(core.state, ConnectionState::Connecting { .. })
                {
                    core.drop_transport();
                }

                for effect in step.effects {
                    self.run_effect(&mut core, effect, &mut pending, &mut deferred);
                }
            }
        }

        for action in deferred {
            match action {
                Deferred::Notify(message, severity) => {
                    self.collaborators.notifier.notify(message, severity)
                }
                Deferred::Emit(event, payload) => {
                    self.emitter.emit(&event, &payload);
                }
            }
        }
    }

    fn run_effect(
        self: &Arc<Self>,
        core: &mut Core,
        effect: Effect,
        pending: &mut VecDeque<ConnectionEvent>,
        deferred: &mut Vec<Deferred>,
    ) {
        match effect {
            Effect::OpenTransport => {
                core.drop_transport();
                core.generation += 1;
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    pending.push_back(ConnectionEvent::TransportFailed(
                        "no async runtime".to_string(),
                    ));
                    return;
                };
                info!(url = %self.config.url, attempt = core.state.attempts(), "Opening realtime transport");
                core.pump = Some(runtime.spawn(run_transport(
                    Arc::downgrade(self),
                    Arc::clone(&self.connector),
                    self.config.url.clone(),
                    core.generation,
                )));
            }
            Effect::SendAuthenticate => {
                let Some(token) = self.store.token() else {
                    warn!("No stored token; authenticate skipped");
                    return;
                };
                core.write_message(&ClientMessage::Authenticate {
                    token,
                    tenant_id: core.tenant_id.clone(),
                });
            }
            Effect::ReplaySubscriptions => {
                let mut replayed = 0;
                for channel in core.subscriptions.iter() {
                    if core.write_message(&ClientMessage::Subscribe {
                        channel: channel.to_string(),
                    }) {
                        replayed += 1;
                    }
                }
                info!(replayed, "Realtime channel authenticated");
            }
            Effect::ScheduleReconnect(delay) => {
                core.cancel_reconnect();
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    warn!("No async runtime; reconnect not scheduled");
                    return;
                };
                info!(
                    delay_ms = delay.as_millis() as u64,
                    attempt = core.state.attempts(),
                    max_attempts = self.policy.max_attempts,
                    "Scheduling reconnect"
                );
                let weak = Arc::downgrade(self);
                core.reconnect = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(inner) = weak.upgrade() {
                        inner.apply(None, ConnectionEvent::ReconnectDue, None);
                    }
                }));
            }
            Effect::CancelReconnect => core.cancel_reconnect(),
            Effect::CloseTransport => {
                core.drop_transport();
                core.generation += 1;
            }
            Effect::Notify { message, severity } => {
                deferred.push(Deferred::Notify(message, severity))
            }
            Effect::NotifyDegraded => {
                warn!("Realtime reconnect attempts exhausted");
                deferred.push(Deferred::Notify(DEGRADED_NOTICE, Severity::Warning));
            }
            Effect::Emit { event, payload } => deferred.push(Deferred::Emit(event, payload)),
        }
    }

    fn report(&self, error: &AppError, context: &str) {
        self.collaborators.reporter.report(error, context);
    }
}

/// Opens one transport and pumps its frames into the state machine.
async fn run_transport(
    inner: Weak<Inner>,
    connector: Arc<dyn Connector>,
    url: String,
    generation: u64,
) {
    let link = match connector.connect(&url).await {
        Ok(link) => link,
        Err(e) => {
            if let Some(inner) = inner.upgrade() {
                inner.report(&e, "realtime.connect");
                inner.apply(
                    Some(generation),
                    ConnectionEvent::TransportFailed(e.message.clone()),
                    None,
                );
            }
            return;
        }
    };

    let mut inbound = link.inbound;
    match inner.upgrade() {
        Some(inner) => inner.apply(
            Some(generation),
            ConnectionEvent::TransportOpened,
            Some(link.outbound),
        ),
        None => return,
    }

    let mut closed = false;
    while let Some(frame) = inbound.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let event = match frame {
            TransportFrame::Text(raw) => match ServerMessage::parse(&raw) {
                Ok(message) => into_event(message),
                Err(e) => {
                    inner.report(&e, "realtime.inbound");
                    continue;
                }
            },
            TransportFrame::Error(message) => ConnectionEvent::TransportError(message),
            TransportFrame::Closed => {
                closed = true;
                ConnectionEvent::TransportClosed
            }
        };
        inner.apply(Some(generation), event, None);
        if closed {
            break;
        }
    }

    if !closed {
        if let Some(inner) = inner.upgrade() {
            inner.apply(Some(generation), ConnectionEvent::TransportClosed, None);
        }
    }
}

fn into_event(message: ServerMessage) -> ConnectionEvent {
    match message {
        ServerMessage::Authenticated(payload) => ConnectionEvent::Authenticated(payload),
        ServerMessage::Error { code, payload } => ConnectionEvent::RemoteError { code, payload },
        ServerMessage::Event {
            event_type,
            payload,
        } => ConnectionEvent::Inbound {
            event_type,
            payload,
        },
    }
}
