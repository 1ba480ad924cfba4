//! Channel demultiplexing.
//!
//! Channel 0 carries connection-control frames and is handled inline on
//! the I/O thread under the control lock. Every other channel gets its
//! frames through an inbound queue consumed by the channel's own thread.

mod dispatch;
mod registry;

pub use dispatch::Dispatcher;
pub use registry::{ChannelRegistry, ChannelState, ControlHandler, Undelivered};
