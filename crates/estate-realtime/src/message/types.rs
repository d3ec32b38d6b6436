//! Outbound and inbound JSON envelopes. Every envelope carries a `type` tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use estate_core::error::AppError;

use crate::events;

/// Messages sent by the console to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Presents the bearer token, optionally scoped to a tenant.
    Authenticate {
        /// Bearer token.
        token: String,
        /// Selected tenant.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tenant_id: Option<String>,
    },
    /// Subscribe to a channel.
    Subscribe {
        /// Channel name.
        channel: String,
    },
    /// Unsubscribe from a channel.
    Unsubscribe {
        /// Channel name.
        channel: String,
    },
}

impl ClientMessage {
    /// Serializes the message to its wire form.
    pub fn to_json(&self) -> Value {
        // Serializing a plain tagged enum of strings cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Error codes the server reports in `error` frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// The token was rejected.
    Unauthorized,
    /// The tenant was rejected.
    InvalidTenant,
    /// Any other code, or none.
    Other(Option<String>),
}

impl ErrorCode {
    /// Parses the `code` field of an error frame.
    pub fn parse(code: Option<&str>) -> Self {
        match code {
            Some("UNAUTHORIZED") => Self::Unauthorized,
            Some("INVALID_TENANT") => Self::InvalidTenant,
            other => Self::Other(other.map(str::to_string)),
        }
    }

    /// Event emitted for this code.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Unauthorized => events::AUTHENTICATION_FAILED,
            Self::InvalidTenant => events::TENANT_INVALID,
            Self::Other(_) => events::ERROR,
        }
    }
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// The token was accepted. Carries the whole frame.
    Authenticated(Value),
    /// The server reported an error. Carries the whole frame.
    Error {
        /// Parsed code.
        code: ErrorCode,
        /// The whole frame.
        payload: Value,
    },
    /// Any other application event, emitted under its `type`.
    Event {
        /// Value of the `type` field.
        event_type: String,
        /// The whole frame.
        payload: Value,
    },
}

impl ServerMessage {
    /// Parses a text frame. Frames that are not JSON objects with a string
    /// `type` are protocol errors.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let payload: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::protocol(format!("Unparseable frame: {e}")))?;

        let event_type = payload
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::protocol("Frame has no string `type`"))?;

        Ok(match event_type.as_str() {
            "authenticated" => Self::Authenticated(payload),
            "error" => Self::Error {
                code: ErrorCode::parse(payload.get("code").and_then(Value::as_str)),
                payload,
            },
            _ => Self::Event {
                event_type,
                payload,
            },
        })
    }
}
