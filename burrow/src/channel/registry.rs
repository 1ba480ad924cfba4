use crate::error::{Error, Result};

use crossbeam_channel::Sender;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The connection-control consumer on channel 0.
///
/// `on_frame` runs on the I/O thread with the control lock held, so it
/// must not block on I/O of its own.
pub trait ControlHandler<F>: Send {
    fn on_frame(&mut self, frame: F);

    /// Whether the connection handshake has completed.
    ///
    /// Sampled once at registration and again after every `on_frame`,
    /// inside the same lock.
    fn is_open(&self) -> bool;
}

/// Minimal view of a channel consumer.
pub trait ChannelState: Send + Sync {
    fn is_open(&self) -> bool;
}

/// Why a frame could not be handed to a channel.
#[derive(Debug, PartialEq, Eq)]
pub enum Undelivered<F> {
    /// No registration for the channel id.
    Unknown(F),

    /// The channel's inbound queue was dropped.
    Disconnected(F),
}

struct ChannelEntry<F> {
    consumer: Arc<dyn ChannelState>,
    inbound: Sender<F>,
}

/// Channel id to consumer mapping for one connection.
///
/// Channel 0 is fixed at construction. Other ids are added with
/// [`register`](ChannelRegistry::register) and must be unique.
pub struct ChannelRegistry<F> {
    control: Mutex<Box<dyn ControlHandler<F>>>,
    control_open: AtomicBool,
    channels: DashMap<u16, ChannelEntry<F>>,
}

impl<F> ChannelRegistry<F> {
    /// Creates a registry with `control` on channel 0 and nothing else.
    pub fn new(control: Box<dyn ControlHandler<F>>) -> Self {
        Self {
            control_open: AtomicBool::new(control.is_open()),
            control: Mutex::new(control),
            channels: DashMap::new(),
        }
    }

    /// Adds a channel.
    ///
    /// Fails with [`Error::ReservedChannel`] for id 0 and with
    /// [`Error::DuplicateChannel`] for an id already in use.
    pub fn register(
        &self,
        channel: u16,
        consumer: Arc<dyn ChannelState>,
        inbound: Sender<F>,
    ) -> Result<()> {
        if channel == 0 {
            return Err(Error::ReservedChannel);
        }

        match self.channels.entry(channel) {
            Entry::Occupied(_) => Err(Error::DuplicateChannel(channel)),
            Entry::Vacant(slot) => {
                slot.insert(ChannelEntry { consumer, inbound });
                log::debug!("channel {channel} registered");
                Ok(())
            }
        }
    }

    /// Removes a channel. Returns `true` if it was registered.
    pub fn remove(&self, channel: u16) -> bool {
        let removed = self.channels.remove(&channel).is_some();
        if removed {
            log::debug!("channel {channel} removed");
        }
        removed
    }

    /// `true` for channel 0 and every registered id.
    pub fn contains(&self, channel: u16) -> bool {
        channel == 0 || self.channels.contains_key(&channel)
    }

    /// Number of registered channels, excluding channel 0.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// `true` when only channel 0 is present.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The open state of `channel`, or `None` if it is not registered.
    pub fn is_open(&self, channel: u16) -> Option<bool> {
        if channel == 0 {
            return Some(self.control_is_open());
        }

        self.channels
            .get(&channel)
            .map(|entry| entry.consumer.is_open())
    }

    /// Open state of channel 0 as of its last frame. Never takes the
    /// control lock.
    pub fn control_is_open(&self) -> bool {
        self.control_open.load(Ordering::Acquire)
    }

    /// Runs the channel 0 handler for `frame` under the control lock.
    pub fn dispatch_control(&self, frame: F) {
        let mut control = self.control.lock();
        control.on_frame(frame);
        self.control_open.store(control.is_open(), Ordering::Release);
    }

    /// Pushes `frame` onto the inbound queue of `channel`.
    pub fn deliver(&self, channel: u16, frame: F) -> std::result::Result<(), Undelivered<F>> {
        let Some(entry) = self.channels.get(&channel) else {
            return Err(Undelivered::Unknown(frame));
        };

        entry
            .inbound
            .send(frame)
            .map_err(|err| Undelivered::Disconnected(err.into_inner()))
    }
}

impl<F> fmt::Debug for ChannelRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<u16> = self.channels.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();

        f.debug_struct("ChannelRegistry")
            .field("control_open", &self.control_is_open())
            .field("channels", &ids)
            .finish()
    }
}
