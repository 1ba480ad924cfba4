//! Structured failures carried out of the I/O thread.

use crate::signals::{Signal, Signals};

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::fmt;
use std::sync::Arc;

/// Classification of a [`Fault`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// The socket failed after the control channel reported itself open.
    ConnectionReset,

    /// Resolution, connect, or TLS setup failed, or the socket failed
    /// before the control channel opened.
    Connection,

    /// A frame arrived for a channel with no live registration.
    UnknownChannel(u16),
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::ConnectionReset => f.write_str("connection reset"),
            FaultKind::Connection => f.write_str("connection error"),
            FaultKind::UnknownChannel(id) => write!(f, "frame for unknown channel {id}"),
        }
    }
}

/// One failure event reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} ({host}:{port}): {message}")]
pub struct Fault {
    pub kind: FaultKind,
    pub host: String,
    pub port: u16,
    pub message: String,
}

/// A multi-producer queue of [`Fault`]s.
///
/// Clones share the same queue. Each fault is handed out at most once.
#[derive(Clone, Debug)]
pub struct FaultSink {
    transmitter: Sender<Fault>,
    receiver: Receiver<Fault>,
}

impl FaultSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        let (transmitter, receiver) = unbounded();

        Self {
            transmitter,
            receiver,
        }
    }

    /// Appends a fault.
    pub fn put(&self, fault: Fault) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.transmitter.send(fault);
    }

    /// Returns `true` if no fault is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Number of faults waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Removes and returns the oldest fault, if any.
    pub fn take(&self) -> Option<Fault> {
        self.receiver.try_recv().ok()
    }

    /// Removes and returns every waiting fault, oldest first.
    pub fn drain(&self) -> Vec<Fault> {
        self.receiver.try_iter().collect()
    }
}

impl Default for FaultSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Records faults for one connection target.
///
/// Every report goes to the sink and raises
/// [`Signal::ExceptionRaised`].
#[derive(Clone, Debug)]
pub struct FaultReporter {
    host: String,
    port: u16,
    sink: FaultSink,
    signals: Arc<Signals>,
}

impl FaultReporter {
    pub fn new(host: &str, port: u16, sink: FaultSink, signals: Arc<Signals>) -> Self {
        Self {
            host: host.to_owned(),
            port,
            sink,
            signals,
        }
    }

    pub fn report(&self, kind: FaultKind, message: impl Into<String>) {
        let fault = Fault {
            kind,
            host: self.host.clone(),
            port: self.port,
            message: message.into(),
        };

        log::debug!("fault recorded: {fault}");

        self.sink.put(fault);
        self.signals.set(Signal::ExceptionRaised);
    }
}
