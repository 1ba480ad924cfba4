//! TLS upgrade of a connected socket with `rustls`.
//!
//! The handshake runs while the socket is still blocking, bounded by the
//! connect timeout. After that the session is driven by the event loop
//! through [`Transport`]: ciphertext is pulled in on `recv`, plaintext
//! is encrypted on `send`, and any records that could not be written yet
//! are reported through `wants_write` until `flush` gets them out.

use super::transport::Transport;
use crate::config::{CertVerification, TlsOptions, TlsVersion};
use crate::error::{Error, Result};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
    SupportedProtocolVersion,
};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Builds a client configuration from `options`.
pub fn client_config(options: &TlsOptions) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let versions = match options.version {
        Some(TlsVersion::Tls12) => TLS12_ONLY,
        Some(TlsVersion::Tls13) => TLS13_ONLY,
        None => rustls::ALL_VERSIONS,
    };

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(versions)?;

    let builder = match options.verification {
        CertVerification::Required => {
            let bundle = options.ca_bundle.as_deref().ok_or(Error::TlsOptions(
                "certificate verification requires a CA bundle",
            ))?;
            builder.with_root_certificates(load_roots(bundle)?)
        }
        CertVerification::None => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider))),
    };

    let config = match (&options.cert_file, &options.key_file) {
        (Some(cert), Some(key)) => {
            builder.with_client_auth_cert(load_certificates(cert)?, load_key(key)?)?
        }
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(Error::TlsOptions(
                "client authentication needs both a certificate and a key",
            ));
        }
    };

    Ok(config)
}

fn material_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::TlsMaterial {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let certificates = CertificateDer::pem_file_iter(path)
        .map_err(|err| material_error(path, err))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| material_error(path, err))?;

    if certificates.is_empty() {
        return Err(material_error(path, "no certificates found"));
    }

    Ok(certificates)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_file(path).map_err(|err| material_error(path, err))
}

fn load_roots(path: &Path) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    for certificate in load_certificates(path)? {
        roots
            .add(certificate)
            .map_err(|err| material_error(path, err))?;
    }

    Ok(roots)
}

/// Verifier used for [`CertVerification::None`]. Signatures are still
/// checked so the handshake itself stays sound.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// A TLS client session over TCP.
#[derive(Debug)]
pub struct TlsTransport {
    session: ClientConnection,
    stream: TcpStream,
}

impl TlsTransport {
    /// Runs the client handshake on a connected, blocking `stream`.
    pub fn connect(
        stream: TcpStream,
        host: &str,
        config: Arc<ClientConfig>,
        timeout: Duration,
    ) -> Result<Self> {
        let server_name =
            ServerName::try_from(host.to_owned()).map_err(|_| Error::ServerName(host.to_owned()))?;

        let session = ClientConnection::new(config, server_name)?;

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut transport = Self { session, stream };

        while transport.session.is_handshaking() {
            transport.session.complete_io(&mut transport.stream)?;
        }

        transport.stream.set_read_timeout(None)?;
        transport.stream.set_write_timeout(None)?;

        log::debug!(
            "TLS established with {host} ({:?})",
            transport.session.protocol_version()
        );

        Ok(transport)
    }

    /// Writes queued records until done or the socket would block.
    fn write_records(&mut self) -> io::Result<()> {
        while self.session.wants_write() {
            match self.session.write_tls(&mut self.stream) {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Transport for TlsTransport {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.session.reader().read(buffer) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => return Err(err),
        }

        if self.session.read_tls(&mut self.stream)? == 0 {
            return Ok(0);
        }

        self.session
            .process_new_packets()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        // Alerts or key updates produced while processing.
        self.write_records()?;

        self.session.reader().read(buffer)
    }

    fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        self.write_records()?;

        if self.session.wants_write() {
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let accepted = self.session.writer().write(buffer)?;
        self.write_records()?;

        Ok(accepted)
    }

    fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        self.stream.set_nonblocking(nonblocking)
    }

    fn close(&mut self) {
        self.session.send_close_notify();
        let _ = self.write_records();

        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("socket shutdown: {err}");
        }
    }

    fn wants_write(&self) -> bool {
        self.session.wants_write()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_records()
    }
}
