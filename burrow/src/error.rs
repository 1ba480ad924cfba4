//! Crate-wide error type.
//!
//! These errors are returned by the synchronous, caller-facing API
//! (building a connection, registering channels, queueing frames).
//! Failures that happen on the I/O thread are never returned through
//! this type; they are recorded as [`Fault`](crate::Fault)s instead.

use crate::connection::State;

use std::io;
use std::path::PathBuf;

/// Errors produced by the caller-facing API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operating system level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The TLS stack rejected the configuration or the session.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// A key, certificate, or CA bundle could not be loaded.
    #[error("could not load TLS material from {}: {reason}", path.display())]
    TlsMaterial { path: PathBuf, reason: String },

    /// The TLS options are inconsistent.
    #[error("invalid TLS options: {0}")]
    TlsOptions(&'static str),

    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name {0:?}")]
    ServerName(String),

    /// Name resolution produced no usable address.
    #[error("could not resolve {host}:{port}")]
    Unresolved { host: String, port: u16 },

    /// A channel id is already in use.
    #[error("channel {0} is already registered")]
    DuplicateChannel(u16),

    /// Channel 0 is owned by the connection itself.
    #[error("channel 0 is reserved for connection control frames")]
    ReservedChannel,

    /// A lifecycle transition that the state machine does not allow.
    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidTransition { from: State, to: State },

    /// The connection is closing or closed.
    #[error("connection is closed")]
    Closed,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
