//! Wire messages exchanged with the push endpoint.

pub mod types;

pub use types::{ClientMessage, ErrorCode, ServerMessage};
