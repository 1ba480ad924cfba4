//! Event loop and its building blocks.
//!
//! The reactor owns the I/O side of a connection:
//! - a [`Poller`](poller::Poller) watching the data socket and the
//!   wakeup descriptor,
//! - a [`WakeupPair`](wakeup::WakeupPair) producers use to interrupt a
//!   blocked poll,
//! - the [`EventLoop`] moving queued frames out and received bytes in.
//!
//! It runs on the connection's I/O thread and never returns errors
//! across that boundary. Fatal conditions go to a [`LoopHandler`].

mod core;
mod outbound;

pub mod poller;
pub mod wakeup;

pub use self::core::{EventLoop, LoopHandler};
pub use outbound::{FrameWriter, Outbound, OutboundQueue, outbound_queue};
