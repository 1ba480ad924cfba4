#![allow(dead_code)]

use burrow::net::Transport;
use burrow::reactor::LoopHandler;
use burrow::{ChannelState, ControlHandler, RawFrame};

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Transport over one end of a `UnixStream` pair whose sends can be
/// capped per call. A cap of zero reports `WouldBlock`.
pub struct ScriptedTransport {
    stream: UnixStream,
    caps: VecDeque<usize>,
}

impl ScriptedTransport {
    pub fn new(stream: UnixStream, caps: impl IntoIterator<Item = usize>) -> Self {
        stream
            .set_nonblocking(true)
            .expect("Failed to set stream non-blocking");

        Self {
            stream,
            caps: caps.into_iter().collect(),
        }
    }
}

impl Transport for ScriptedTransport {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buffer)
    }

    fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        match self.caps.pop_front() {
            Some(0) => Err(io::ErrorKind::WouldBlock.into()),
            Some(cap) => self.stream.write(&buffer[..cap.min(buffer.len())]),
            None => self.stream.write(buffer),
        }
    }

    fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        self.stream.set_nonblocking(nonblocking)
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Loop handler that keeps everything it is given.
#[derive(Default)]
pub struct Recording {
    pub read: Vec<u8>,
    pub errors: Vec<io::ErrorKind>,
}

impl LoopHandler for Recording {
    fn on_read(&mut self, bytes: &[u8]) {
        self.read.extend_from_slice(bytes);
    }

    fn on_error(&mut self, error: io::Error) {
        self.errors.push(error.kind());
    }
}

/// Channel 0 handler recording the frames it receives.
#[derive(Clone, Default)]
pub struct RecordingControl {
    pub frames: Arc<Mutex<Vec<RawFrame>>>,
    pub open: Arc<AtomicBool>,
    opens_on_frame: bool,
}

impl RecordingControl {
    /// A handler that reports open from its first frame on.
    pub fn opening() -> Self {
        Self {
            opens_on_frame: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<RawFrame> {
        self.frames.lock().expect("Control frames poisoned").clone()
    }
}

impl ControlHandler<RawFrame> for RecordingControl {
    fn on_frame(&mut self, frame: RawFrame) {
        self.frames
            .lock()
            .expect("Control frames poisoned")
            .push(frame);

        if self.opens_on_frame {
            self.open.store(true, Ordering::Release);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

pub struct OpenChannel;

impl ChannelState for OpenChannel {
    fn is_open(&self) -> bool {
        true
    }
}

/// An address nothing listens on.
pub fn refused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    listener.local_addr().expect("Failed to get local address")
}

/// Routes `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
