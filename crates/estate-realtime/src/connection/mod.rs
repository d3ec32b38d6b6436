//! Connection lifecycle: state machine, backoff, and transport.

pub mod backoff;
pub mod state;
pub mod transport;
