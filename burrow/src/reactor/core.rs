use super::outbound::OutboundQueue;
use super::poller::{Poller, Readiness};
use super::wakeup::WakeupReader;
use crate::codec::{FRAME_MAX_SIZE, FrameCodec};
use crate::net::Transport;
use crate::signals::{Signal, Signals};

use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Callbacks invoked from the loop thread.
pub trait LoopHandler {
    /// Bytes from exactly one socket read, in arrival order.
    fn on_read(&mut self, bytes: &[u8]);

    /// A fatal socket condition. The loop stops after this returns.
    fn on_error(&mut self, error: io::Error);
}

/// Buffers owned by the loop thread alone.
struct LoopState {
    /// Marshaled chunks not yet on the wire, oldest first.
    write_buffer: VecDeque<Bytes>,

    /// Scratch for one read, `FRAME_MAX_SIZE` long.
    read_buffer: Box<[u8]>,
}

/// The read/write loop over one connected transport.
///
/// Each [`turn`](EventLoop::turn) drains the outbound queue, polls,
/// then performs at most one read and at most one write.
pub struct EventLoop<T: Transport, C: FrameCodec> {
    transport: T,
    codec: Arc<C>,
    outbound: OutboundQueue<C::Frame>,
    wakeup: WakeupReader,
    poller: Poller,
    running: Arc<AtomicBool>,
    signals: Arc<Signals>,
    state: LoopState,
}

impl<T: Transport, C: FrameCodec> EventLoop<T, C> {
    /// Binds a loop to a connected, non-blocking `transport`.
    pub fn new(
        transport: T,
        codec: Arc<C>,
        outbound: OutboundQueue<C::Frame>,
        wakeup: WakeupReader,
        running: Arc<AtomicBool>,
        signals: Arc<Signals>,
    ) -> io::Result<Self> {
        let poller = Poller::new(transport.raw_fd(), wakeup.raw_fd())?;

        Ok(Self {
            transport,
            codec,
            outbound,
            wakeup,
            poller,
            running,
            signals,
            state: LoopState {
                write_buffer: VecDeque::new(),
                read_buffer: vec![0u8; FRAME_MAX_SIZE].into_boxed_slice(),
            },
        })
    }

    /// Bounds each poll to `timeout`.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poller.set_timeout(timeout);
        self
    }

    /// `false` once the running flag is cleared, the socket closed, or the
    /// wakeup trigger shut down.
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.signals.is_set(Signal::SocketClosed)
    }

    /// Turns until [`is_active`](EventLoop::is_active) is `false`.
    pub fn run<H: LoopHandler>(&mut self, handler: &mut H) {
        log::debug!(
            "event loop started on {} ({} poller)",
            self.transport.label(),
            self.poller.backend()
        );

        while self.is_active() {
            self.turn(handler);
        }

        log::debug!("event loop stopped");
    }

    /// One iteration.
    pub fn turn<H: LoopHandler>(&mut self, handler: &mut H) {
        self.marshal_pending();

        let write_wanted = !self.state.write_buffer.is_empty() || self.transport.wants_write();

        let ready = match self.poller.poll(write_wanted) {
            Ok(ready) => ready,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return,
            Err(err) => {
                log::error!("poll failed: {err}");
                self.fail(handler, err);
                return;
            }
        };

        if !ready.errored.is_empty() {
            log::error!("socket error reported by poller on {}", self.transport.label());

            self.signals.set(Signal::SocketClosed);
            self.running.store(false, Ordering::Release);
            handler.on_error(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "Connection reset",
            ));
            return;
        }

        if ready.is_readable(self.wakeup.raw_fd()) {
            let drained = self.wakeup.drain();
            log::trace!("drained {drained} wakeup bytes");

            if self.wakeup.is_closed() {
                log::debug!("wakeup trigger closed, stopping {}", self.transport.label());
                self.running.store(false, Ordering::Release);
                return;
            }
        }

        self.handle_io(&ready, handler);
    }

    fn handle_io<H: LoopHandler>(&mut self, ready: &Readiness, handler: &mut H) {
        let fd = self.transport.raw_fd();

        if ready.is_readable(fd) {
            self.read_once(handler);

            if !self.running.load(Ordering::Acquire) {
                return;
            }
        }

        if ready.is_writable(fd) {
            self.write_once(handler);
        }
    }

    /// Moves every queued frame into the write buffer, in order.
    fn marshal_pending(&mut self) {
        for item in self.outbound.pending() {
            let bytes = self.codec.marshal(&item.frame, item.channel);
            log::trace!("queued {} bytes for channel {}", bytes.len(), item.channel);
            self.state.write_buffer.push_back(bytes);
        }
    }

    fn read_once<H: LoopHandler>(&mut self, handler: &mut H) {
        match self.transport.recv(&mut self.state.read_buffer) {
            Ok(0) => {
                log::error!("peer closed {}", self.transport.label());
                self.fail(
                    handler,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by peer"),
                );
            }
            Ok(n) => {
                log::trace!("read {n} bytes");
                handler.on_read(&self.state.read_buffer[..n]);
            }
            Err(err) if is_transient(&err) => {
                if err.kind() == io::ErrorKind::TimedOut {
                    log::warn!("socket read timed out, retrying");
                }
            }
            Err(err) => {
                log::error!("socket read failed: {err}");
                self.fail(handler, err);
            }
        }
    }

    fn write_once<H: LoopHandler>(&mut self, handler: &mut H) {
        if self.transport.wants_write() {
            match self.transport.flush() {
                Ok(()) => {}
                Err(err) if is_transient(&err) => return,
                Err(err) => {
                    log::error!("socket flush failed: {err}");
                    self.fail(handler, err);
                    return;
                }
            }
        }

        let Some(chunk) = self.state.write_buffer.pop_front() else {
            return;
        };

        match self.transport.send(&chunk) {
            Ok(n) if n < chunk.len() => {
                log::trace!("short send: {n} of {} bytes", chunk.len());
                self.state.write_buffer.push_front(chunk.slice(n..));
            }
            Ok(n) => log::trace!("sent {n} bytes"),
            Err(err) if is_transient(&err) => {
                if err.kind() == io::ErrorKind::TimedOut {
                    log::warn!("socket write timed out, retrying");
                }
                self.state.write_buffer.push_front(chunk);
            }
            Err(err) => {
                log::error!("socket write failed: {err}");
                self.state.write_buffer.push_front(chunk);
                self.fail(handler, err);
            }
        }
    }

    fn fail<H: LoopHandler>(&mut self, handler: &mut H, error: io::Error) {
        self.running.store(false, Ordering::Release);
        handler.on_error(error);
    }

    /// Marshaled chunks still waiting to be sent, front first.
    pub fn write_buffer(&self) -> &VecDeque<Bytes> {
        &self.state.write_buffer
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

/// Timeouts, would-block, and interrupted calls are retried next turn.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
