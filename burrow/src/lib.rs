//! # Burrow
//!
//! **Burrow** is the transport core of an AMQP client. It owns one
//! connection to a broker and moves frames between that socket and the
//! channels multiplexed over it.
//!
//! A connection runs on a dedicated I/O thread that:
//!
//! - resolves the broker and tries every candidate address in order,
//! - optionally upgrades the socket to TLS with `rustls`,
//! - polls the socket with epoll, kqueue, or `select(2)`, whichever the
//!   host offers,
//! - marshals queued frames and writes them in enqueue order, surviving
//!   short writes,
//! - demultiplexes received frames: channel 0 inline under a lock, every
//!   other channel onto its own inbound queue.
//!
//! Producers on other threads queue frames and interrupt the poll
//! through a loopback wakeup pair. Failures never cross the thread
//! boundary as errors; they land in a [`FaultSink`] and raise
//! [`Signal::ExceptionRaised`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use burrow::{AmqpCodec, ConnectionBuilder, ControlHandler, RawFrame, Signal};
//! use std::time::Duration;
//!
//! struct Control;
//!
//! impl ControlHandler<RawFrame> for Control {
//!     fn on_frame(&mut self, frame: RawFrame) {
//!         println!("control frame: {frame:?}");
//!     }
//!
//!     fn is_open(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let connection = ConnectionBuilder::new("localhost").open(AmqpCodec::new(), Control)?;
//!
//! match connection
//!     .signals()
//!     .wait_any(&[Signal::SocketOpened, Signal::ExceptionRaised], Duration::from_secs(5))
//! {
//!     Some(Signal::SocketOpened) => connection.write_frame(0, RawFrame::heartbeat())?,
//!     _ => eprintln!("{:?}", connection.faults().drain()),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`reactor`]: Poller backends, wakeup pair, and the event loop
//! - [`net`]: Resolution, connect, plain and TLS transports
//! - [`channel`]: Channel registry and frame dispatch
//! - [`codec`]: Frame codec seam and the AMQP general-frame codec

#[cfg(not(unix))]
compile_error!("burrow supports unix targets only");

mod config;
mod connection;
mod error;
mod fault;
mod signals;

pub mod channel;
pub mod codec;
pub mod net;
pub mod reactor;

pub use channel::{ChannelState, ControlHandler};
pub use codec::{AmqpCodec, CodecError, Decoded, FRAME_MAX_SIZE, FrameCodec, FrameKind, RawFrame};
pub use config::{
    CONNECT_TIMEOUT, CertVerification, ConnectionConfig, DEFAULT_PORT, TlsOptions, TlsVersion,
};
pub use connection::{Connection, ConnectionBuilder, State, StateCell};
pub use error::{Error, Result};
pub use fault::{Fault, FaultKind, FaultReporter, FaultSink};
pub use signals::{Signal, Signals};
