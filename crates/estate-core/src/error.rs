//! Unified error types for the estate console.
//!
//! Every failure the session guard or the realtime channel can observe is
//! mapped into [`AppError`]. The closed [`ErrorKind`] enumeration replaces
//! ad-hoc "what sort of error is this" checks: [`ErrorKind::disposition`] is
//! the single exhaustive match that decides what the user sees.

use std::fmt;

use thiserror::Error;

/// Top-level error kind categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The stored credential is absent, malformed, or expired.
    Credential,
    /// The credential is valid but lacks the claims this console requires.
    Authorization,
    /// The renewal endpoint failed or rejected the token.
    Renewal,
    /// The realtime transport refused, dropped, or failed the connection.
    Transport,
    /// The remote side sent an error frame or an unparseable message.
    Protocol,
    /// An application listener failed while handling an event.
    Listener,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// The persisted key/value store failed.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

/// What the console does with an error once it reaches the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fatal to the session: tear down and redirect with a reason.
    Redirect,
    /// Recoverable or degraded: surface a user-visible notice.
    Notice,
    /// Internal bookkeeping: log and continue.
    LogOnly,
}

impl ErrorKind {
    /// Decides the user-visible outcome for this kind of error.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Credential | Self::Authorization | Self::Renewal => Disposition::Redirect,
            Self::Transport => Disposition::Notice,
            Self::Protocol
            | Self::Listener
            | Self::Serialization
            | Self::Storage
            | Self::Configuration
            | Self::Internal => Disposition::LogOnly,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "CREDENTIAL"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Renewal => write!(f, "RENEWAL"),
            Self::Transport => write!(f, "TRANSPORT"),
            Self::Protocol => write!(f, "PROTOCOL"),
            Self::Listener => write!(f, "LISTENER"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the estate console crates.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a credential error.
    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Credential, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a renewal error.
    pub fn renewal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Renewal, message)
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Create a listener error.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Listener, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Shortcut for `self.kind.disposition()`.
    pub fn disposition(&self) -> Disposition {
        self.kind.disposition()
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
