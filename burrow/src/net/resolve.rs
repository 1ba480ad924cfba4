use crate::error::{Error, Result};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;

/// Whether this host can open IPv6 sockets. Probed once.
pub fn ipv6_supported() -> bool {
    static SUPPORTED: OnceLock<bool> = OnceLock::new();

    *SUPPORTED.get_or_init(|| {
        let supported = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP)).is_ok();
        if !supported {
            log::debug!("IPv6 unavailable, resolving IPv4 only");
        }
        supported
    })
}

/// Resolves `host:port` into connect candidates, in resolver order.
///
/// IPv6 results are dropped when the host has no IPv6 support.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let unresolved = || Error::Unresolved {
        host: host.to_owned(),
        port,
    };

    let addresses = (host, port).to_socket_addrs().map_err(|err| {
        log::warn!("could not resolve {host}:{port}: {err}");
        unresolved()
    })?;

    let ipv6 = ipv6_supported();
    let candidates: Vec<SocketAddr> = addresses.filter(|address| ipv6 || address.is_ipv4()).collect();

    if candidates.is_empty() {
        return Err(unresolved());
    }

    Ok(candidates)
}

/// Connects to the first candidate that accepts within `timeout`.
///
/// The returned stream is blocking. On total failure the error of the
/// last attempt is returned.
pub fn connect_first(
    candidates: &[SocketAddr],
    timeout: Duration,
) -> io::Result<(TcpStream, SocketAddr)> {
    let mut last_error = None;

    for &address in candidates {
        match connect_one(address, timeout) {
            Ok(stream) => {
                log::debug!("connected to {address}");
                return Ok((stream, address));
            }
            Err(err) => {
                log::warn!("connect to {address} failed: {err}");
                last_error = Some(err);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no addresses to connect to")))
}

fn connect_one(address: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))?;

    socket.connect_timeout(&SockAddr::from(address), timeout)?;

    let stream: TcpStream = socket.into();
    stream.set_nodelay(true)?;

    Ok(stream)
}
