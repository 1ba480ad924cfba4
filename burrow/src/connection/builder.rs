use super::handle::Connection;
use crate::channel::ControlHandler;
use crate::codec::FrameCodec;
use crate::config::{ConnectionConfig, TlsOptions};
use crate::error::Result;

use std::net::SocketAddr;
use std::time::Duration;

/// Builder for configuring and opening a [`Connection`].
///
/// # Examples
///
/// ```rust,ignore
/// let connection = ConnectionBuilder::new("broker.local")
///     .port(5671)
///     .tls(TlsOptions::new().ca_bundle("ca.pem"))
///     .open(AmqpCodec::new(), control)?;
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    config: ConnectionConfig,
}

impl ConnectionBuilder {
    /// Starts from the defaults for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: ConnectionConfig::new(host),
        }
    }

    /// Starts from a prepared configuration.
    pub fn from_config(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Broker port, 5672 unless set.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Bounds each connect attempt and the TLS handshake.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "connect_timeout must be > 0");

        self.config.connect_timeout = timeout;
        self
    }

    /// Upper bound on one poll of the I/O thread.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout = timeout;
        self
    }

    pub fn tls(mut self, options: TlsOptions) -> Self {
        self.config.tls = Some(options);
        self
    }

    /// Connect to these addresses, in order, instead of resolving the
    /// host name. The host is still used for TLS and fault context.
    pub fn addresses(mut self, addresses: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.config.addresses = addresses.into_iter().collect();
        self
    }

    /// The configuration `open` will use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Spawns the I/O thread. See [`Connection::open`].
    pub fn open<C, H>(self, codec: C, control: H) -> Result<Connection<C>>
    where
        C: FrameCodec,
        H: ControlHandler<C::Frame> + 'static,
    {
        Connection::open(self.config, codec, control)
    }
}
