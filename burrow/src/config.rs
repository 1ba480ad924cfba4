//! Connection settings consumed by the transport.

use crate::reactor::poller::POLL_TIMEOUT;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default AMQP port.
pub const DEFAULT_PORT: u16 = 5672;

/// Default bound on each connect attempt and on the TLS handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Where and how to connect.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub poll_timeout: Duration,
    pub tls: Option<TlsOptions>,

    /// Connect candidates tried in order. Empty means resolve `host`.
    pub addresses: Vec<SocketAddr>,
}

impl ConnectionConfig {
    /// Defaults for `host`: port 5672, 3 s connect timeout, 1 h poll
    /// timeout, plain TCP.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_timeout: CONNECT_TIMEOUT,
            poll_timeout: POLL_TIMEOUT,
            tls: None,
            addresses: Vec::new(),
        }
    }

    /// `true` when the socket will be upgraded to TLS.
    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }
}

/// Server certificate checking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CertVerification {
    /// Accept any server certificate.
    None,

    /// Verify the chain against the CA bundle and check the host name.
    #[default]
    Required,
}

/// Pin the TLS protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

/// TLS material and policy.
#[derive(Clone, Debug, Default)]
pub struct TlsOptions {
    /// PEM private key for client authentication.
    pub key_file: Option<PathBuf>,

    /// PEM certificate chain for client authentication.
    pub cert_file: Option<PathBuf>,

    pub verification: CertVerification,

    /// `None` negotiates any version the provider supports.
    pub version: Option<TlsVersion>,

    /// PEM bundle of trusted CA certificates.
    pub ca_bundle: Option<PathBuf>,
}

impl TlsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_auth(mut self, cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(cert_file.into());
        self.key_file = Some(key_file.into());
        self
    }

    pub fn verification(mut self, verification: CertVerification) -> Self {
        self.verification = verification;
        self
    }

    pub fn version(mut self, version: TlsVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }
}
