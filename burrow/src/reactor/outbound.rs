use super::wakeup::WakeupTrigger;
use crate::error::{Error, Result};

use crossbeam_channel::{Receiver, Sender, TryIter, unbounded};

/// A frame waiting to be marshaled.
#[derive(Debug)]
pub struct Outbound<F> {
    pub channel: u16,
    pub frame: F,
}

/// Producer side of the outbound queue.
///
/// Every write wakes the event loop. Clones share the queue and the
/// wakeup trigger.
pub struct FrameWriter<F> {
    sender: Sender<Outbound<F>>,
    trigger: WakeupTrigger,
}

impl<F> FrameWriter<F> {
    /// Queues `frame` for `channel` and interrupts the poll.
    ///
    /// Fails with [`Error::Closed`] once the loop has been asked to stop
    /// or has gone away.
    pub fn write(&self, channel: u16, frame: F) -> Result<()> {
        if self.trigger.is_closed() {
            return Err(Error::Closed);
        }

        self.sender
            .send(Outbound { channel, frame })
            .map_err(|_| Error::Closed)?;

        self.trigger.notify();
        Ok(())
    }

    /// Closes the wakeup trigger. Later writes fail and the event loop
    /// stops on its next turn.
    pub fn close(&self) {
        self.trigger.close();
    }

    /// `true` after [`close`](FrameWriter::close) on any clone.
    pub fn is_closed(&self) -> bool {
        self.trigger.is_closed()
    }
}

impl<F> Clone for FrameWriter<F> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            trigger: self.trigger.clone(),
        }
    }
}

impl<F> std::fmt::Debug for FrameWriter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("queued", &self.sender.len())
            .field("trigger", &self.trigger)
            .finish()
    }
}

/// Consumer side, owned by the event loop.
#[derive(Debug)]
pub struct OutboundQueue<F> {
    receiver: Receiver<Outbound<F>>,
}

impl<F> OutboundQueue<F> {
    /// Everything queued right now, in enqueue order. Never blocks.
    pub(crate) fn pending(&self) -> TryIter<'_, Outbound<F>> {
        self.receiver.try_iter()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Creates an unbounded outbound queue whose writes notify `trigger`.
pub fn outbound_queue<F>(trigger: WakeupTrigger) -> (FrameWriter<F>, OutboundQueue<F>) {
    let (sender, receiver) = unbounded();

    (FrameWriter { sender, trigger }, OutboundQueue { receiver })
}
