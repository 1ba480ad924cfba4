//! Loopback byte pipe used to interrupt a blocked poll.
//!
//! The pipe carries no payload. Producers write a single filler byte to
//! say "something changed"; the event loop drains and discards whatever
//! is there. A native connected socket pair is preferred. Where one
//! cannot be created, a loopback TCP connection is emulated by
//! listening on an ephemeral port and connecting to it. The connect
//! completes against the listen backlog, so the accept that follows
//! never waits on another thread.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Bound on the emulated pair's loopback connect.
const EMULATED_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// How the pair was established.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeupKind {
    /// `socketpair(2)`.
    Native,

    /// Connected loopback TCP sockets.
    Emulated,
}

#[derive(Debug)]
enum Endpoint {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Endpoint {
    fn raw_fd(&self) -> RawFd {
        match self {
            Endpoint::Unix(stream) => stream.as_raw_fd(),
            Endpoint::Tcp(stream) => stream.as_raw_fd(),
        }
    }

    fn read(&self, buffer: &mut [u8]) -> io::Result<usize> {
        match self {
            Endpoint::Unix(stream) => (&*stream).read(buffer),
            Endpoint::Tcp(stream) => (&*stream).read(buffer),
        }
    }

    fn write(&self, buffer: &[u8]) -> io::Result<usize> {
        match self {
            Endpoint::Unix(stream) => (&*stream).write(buffer),
            Endpoint::Tcp(stream) => (&*stream).write(buffer),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Endpoint::Unix(stream) => stream.shutdown(Shutdown::Both),
            Endpoint::Tcp(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

/// The end of the pair the event loop polls and drains.
#[derive(Debug)]
pub struct WakeupReader {
    endpoint: Endpoint,
    closed: bool,
}

impl WakeupReader {
    /// Descriptor to hand to the poller.
    pub fn raw_fd(&self) -> RawFd {
        self.endpoint.raw_fd()
    }

    /// Reads and discards every pending byte. Returns how many were
    /// discarded.
    pub fn drain(&mut self) -> usize {
        let mut scratch = [0u8; 1024];
        let mut total = 0;

        loop {
            match self.endpoint.read(&mut scratch) {
                Ok(0) => {
                    self.closed = true;
                    break;
                }
                Ok(n) => total += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }

        total
    }

    /// `true` once a drain has seen the trigger side shut down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

struct TriggerInner {
    endpoint: Endpoint,
    closed: AtomicBool,
}

/// The end producers write to. Clones share the same socket.
#[derive(Clone)]
pub struct WakeupTrigger {
    inner: Arc<TriggerInner>,
}

impl WakeupTrigger {
    fn new(endpoint: Endpoint) -> Self {
        Self {
            inner: Arc::new(TriggerInner {
                endpoint,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Interrupts a blocked poll. Fails silently once closed or when the
    /// pipe is already full.
    pub fn notify(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }

        let _ = self.inner.endpoint.write(b"0");
    }

    /// Shuts the write side down. The reader observes end-of-file, which
    /// wakes the poll one last time.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Err(err) = self.inner.endpoint.shutdown() {
            log::debug!("wakeup trigger shutdown: {err}");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for WakeupTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeupTrigger")
            .field("fd", &self.inner.endpoint.raw_fd())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A connected, non-blocking wakeup pair.
#[derive(Debug)]
pub struct WakeupPair {
    pub reader: WakeupReader,
    pub trigger: WakeupTrigger,
    pub kind: WakeupKind,
}

impl WakeupPair {
    /// Establishes a pair, preferring a native socket pair.
    pub fn new() -> io::Result<Self> {
        match Self::native() {
            Ok(pair) => Ok(pair),
            Err(err) => {
                log::debug!("socketpair unavailable ({err}), falling back to loopback TCP");
                Self::emulated()
            }
        }
    }

    /// `socketpair(2)` based pair.
    pub fn native() -> io::Result<Self> {
        let (reader, trigger) = UnixStream::pair()?;

        reader.set_nonblocking(true)?;
        trigger.set_nonblocking(true)?;

        Ok(Self {
            reader: WakeupReader {
                endpoint: Endpoint::Unix(reader),
                closed: false,
            },
            trigger: WakeupTrigger::new(Endpoint::Unix(trigger)),
            kind: WakeupKind::Native,
        })
    }

    /// Loopback TCP pair for platforms without `socketpair(2)`.
    pub fn emulated() -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let address = listener.local_addr()?;

        let client = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        client.connect_timeout(&SockAddr::from(address), EMULATED_CONNECT_TIMEOUT)?;

        let client_address = client.local_addr()?.as_socket();
        let client: TcpStream = client.into();

        // Anything else that raced onto the ephemeral port is rejected.
        let server = loop {
            let (stream, peer) = listener.accept()?;
            if Some(peer) == client_address {
                break stream;
            }
            log::warn!("dropping unexpected loopback connection from {peer}");
        };

        for stream in [&server, &client] {
            stream.set_nonblocking(true)?;
            stream.set_nodelay(true)?;
        }

        Ok(Self {
            reader: WakeupReader {
                endpoint: Endpoint::Tcp(server),
                closed: false,
            },
            trigger: WakeupTrigger::new(Endpoint::Tcp(client)),
            kind: WakeupKind::Emulated,
        })
    }

    pub fn into_parts(self) -> (WakeupReader, WakeupTrigger) {
        (self.reader, self.trigger)
    }
}
