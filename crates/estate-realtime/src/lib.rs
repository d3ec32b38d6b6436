//! # estate-realtime
//!
//! Push-notification channel for the estate console. Provides:
//!
//! - A pure connection state machine with exponential backoff reconnect
//! - Token authentication on every (re)connect, read from the shared store
//! - Per-resource channel subscriptions replayed after re-authentication
//! - An event emitter that isolates failing listeners
//! - A WebSocket transport behind the [`Connector`] trait

pub mod channel;
pub mod client;
pub mod connection;
pub mod events;
pub mod message;

pub use client::{ChannelStatus, RealtimeChannel};
pub use connection::backoff::ReconnectPolicy;
pub use connection::state::{ConnectionEvent, ConnectionState, Effect, Transition, transition};
pub use connection::transport::{Connector, TransportFrame, TransportLink, WsConnector};
pub use events::emitter::{EventEmitter, ListenerHandle};
