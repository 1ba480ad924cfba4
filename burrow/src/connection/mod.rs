//! Connection lifecycle.
//!
//! A [`Connection`] owns one socket and the I/O thread that drives it.
//! The thread resolves and connects, optionally upgrades to TLS, runs
//! the event loop, and releases the socket, moving [`State`] through
//! `Opening -> Open -> Closing -> Closed`.

mod builder;
mod handle;
mod state;
mod worker;

pub use builder::ConnectionBuilder;
pub use handle::Connection;
pub use state::{State, StateCell};
