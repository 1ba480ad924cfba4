use super::registry::{ChannelRegistry, Undelivered};
use crate::codec::{Decoded, FrameCodec};
use crate::fault::{FaultKind, FaultReporter};

use bytes::{Buf, BytesMut};
use std::sync::Arc;

/// Carves frames off the inbound byte stream and routes them by channel.
///
/// Bytes of an incomplete frame stay buffered until the next read
/// completes it.
pub struct Dispatcher<C: FrameCodec> {
    buffer: BytesMut,
    codec: Arc<C>,
    registry: Arc<ChannelRegistry<C::Frame>>,
    faults: FaultReporter,
}

impl<C: FrameCodec> Dispatcher<C> {
    pub fn new(
        codec: Arc<C>,
        registry: Arc<ChannelRegistry<C::Frame>>,
        faults: FaultReporter,
    ) -> Self {
        Self {
            buffer: BytesMut::new(),
            codec,
            registry,
            faults,
        }
    }

    /// Appends `bytes` and dispatches every complete frame, in order.
    ///
    /// Returns how many frames were decoded.
    pub fn on_read(&mut self, bytes: &[u8]) -> usize {
        self.buffer.extend_from_slice(bytes);

        let mut decoded = 0;

        while !self.buffer.is_empty() {
            match self.codec.unmarshal(&self.buffer) {
                Decoded::Frame {
                    consumed,
                    channel,
                    frame,
                } => {
                    self.buffer.advance(consumed);
                    decoded += 1;
                    self.dispatch(channel, frame);
                }
                Decoded::NeedMoreData => break,
                Decoded::Malformed(err) => {
                    log::error!(
                        "could not decode frame ({err}), {} bytes held",
                        self.buffer.len()
                    );
                    break;
                }
            }
        }

        decoded
    }

    fn dispatch(&self, channel: u16, frame: C::Frame) {
        if channel == 0 {
            self.registry.dispatch_control(frame);
            return;
        }

        match self.registry.deliver(channel, frame) {
            Ok(()) => {}
            Err(Undelivered::Unknown(_)) => {
                log::error!("frame for unregistered channel {channel} discarded");
                self.faults.report(
                    FaultKind::UnknownChannel(channel),
                    format!("no channel {channel} registered"),
                );
            }
            Err(Undelivered::Disconnected(_)) => {
                log::error!("inbound queue of channel {channel} is gone, frame discarded");
                self.faults.report(
                    FaultKind::UnknownChannel(channel),
                    format!("channel {channel} stopped consuming"),
                );
            }
        }
    }

    /// Bytes held for an incomplete (or undecodable) frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry<C::Frame>> {
        &self.registry
    }

    pub fn faults(&self) -> &FaultReporter {
        &self.faults
    }
}
