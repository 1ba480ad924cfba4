//! Sockets: resolution, connect, and the byte transports the event
//! loop drives.

mod resolve;
mod tls;
mod transport;

pub use resolve::{connect_first, ipv6_supported, resolve};
pub use tls::{TlsTransport, client_config};
pub use transport::{PlainTransport, Transport};
