//! Named cross-thread flags.
//!
//! The I/O thread and the threads that own a [`Connection`](crate::Connection)
//! coordinate through a small fixed set of booleans instead of sharing
//! locks. Every flag is an independent atomic; no ordering between two
//! flags is implied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// The names in a [`Signals`] set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The data socket connected and the event loop is about to run.
    SocketOpened,

    /// The data socket is gone; the event loop no longer consumes input.
    SocketClosed,

    /// At least one fault was placed on the fault sink.
    ExceptionRaised,
}

impl Signal {
    /// Every signal in declaration order.
    pub const ALL: [Signal; 3] = [
        Signal::SocketOpened,
        Signal::SocketClosed,
        Signal::ExceptionRaised,
    ];

    fn index(self) -> usize {
        match self {
            Signal::SocketOpened => 0,
            Signal::SocketClosed => 1,
            Signal::ExceptionRaised => 2,
        }
    }
}

/// A lock-free set of named boolean flags.
#[derive(Debug, Default)]
pub struct Signals {
    flags: [AtomicBool; 3],
}

impl Signals {
    /// Creates a set with every flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `signal`. Setting an already set flag is harmless.
    pub fn set(&self, signal: Signal) {
        self.flags[signal.index()].store(true, Ordering::Release);
    }

    /// Clears `signal`.
    pub fn clear(&self, signal: Signal) {
        self.flags[signal.index()].store(false, Ordering::Release);
    }

    /// Returns `true` if `signal` is set.
    pub fn is_set(&self, signal: Signal) -> bool {
        self.flags[signal.index()].load(Ordering::Acquire)
    }

    /// Blocks until one of `signals` is set or `timeout` elapses.
    ///
    /// Returns the first set signal in the order given, or `None` on
    /// timeout.
    pub fn wait_any(&self, signals: &[Signal], timeout: Duration) -> Option<Signal> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(signal) = signals.iter().copied().find(|s| self.is_set(*s)) {
                return Some(signal);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            thread::sleep((deadline - now).min(Duration::from_millis(1)));
        }
    }
}
