use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};

/// A connected byte stream the event loop can drive.
///
/// `send` may write fewer bytes than offered and the loop relies on
/// that. `recv` returning `Ok(0)` means the peer closed the stream.
pub trait Transport: Send {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    fn send(&mut self, buffer: &[u8]) -> io::Result<usize>;

    /// Descriptor watched by the poller.
    fn raw_fd(&self) -> RawFd;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()>;

    fn close(&mut self);

    /// `true` while bytes accepted by `send` still sit in a user-space
    /// buffer (encrypted TLS records, for instance).
    fn wants_write(&self) -> bool {
        false
    }

    /// Pushes buffered bytes towards the socket.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// `"local -> peer"` label used in logs.
    fn label(&self) -> String {
        match (self.local_addr(), self.peer_addr()) {
            (Ok(local), Ok(peer)) => format!("{local} -> {peer}"),
            _ => format!("fd {}", self.raw_fd()),
        }
    }
}

/// Cleartext TCP.
#[derive(Debug)]
pub struct PlainTransport {
    stream: TcpStream,
}

impl PlainTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for PlainTransport {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buffer)
    }

    fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        self.stream.write(buffer)
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
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("socket shutdown: {err}");
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buffer)
    }

    fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        (**self).send(buffer)
    }

    fn raw_fd(&self) -> RawFd {
        (**self).raw_fd()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        (**self).peer_addr()
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        (**self).set_nonblocking(nonblocking)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn wants_write(&self) -> bool {
        (**self).wants_write()
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}
