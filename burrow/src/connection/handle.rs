use super::state::{State, StateCell};
use super::worker::Worker;
use crate::channel::{ChannelRegistry, ChannelState, ControlHandler};
use crate::codec::FrameCodec;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::fault::{FaultReporter, FaultSink};
use crate::net::client_config;
use crate::reactor::wakeup::WakeupPair;
use crate::reactor::{FrameWriter, outbound_queue};
use crate::signals::Signals;

use crossbeam_channel::{Receiver, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

/// Name of the I/O thread.
const IO_THREAD_NAME: &str = "burrow-io";

/// Handle to one broker connection and its I/O thread.
///
/// Opening never blocks on the network: the connect happens on the I/O
/// thread and its outcome is observed through [`signals`] and
/// [`faults`]. Dropping the handle stops the thread and waits for it.
///
/// [`signals`]: Connection::signals
/// [`faults`]: Connection::faults
pub struct Connection<C: FrameCodec> {
    host: String,
    port: u16,
    state: Arc<StateCell>,
    signals: Arc<Signals>,
    faults: FaultSink,
    registry: Arc<ChannelRegistry<C::Frame>>,
    writer: FrameWriter<C::Frame>,
    running: Arc<AtomicBool>,
    label: Arc<OnceLock<String>>,
    worker: Option<JoinHandle<()>>,
}

impl<C: FrameCodec> Connection<C> {
    /// Spawns the I/O thread for `config`.
    ///
    /// Only local setup errors are returned here: unusable TLS options,
    /// no wakeup pair, or a failed thread spawn.
    pub fn open<H>(config: ConnectionConfig, codec: C, control: H) -> Result<Self>
    where
        H: ControlHandler<C::Frame> + 'static,
    {
        let tls = config
            .tls
            .as_ref()
            .map(client_config)
            .transpose()?
            .map(Arc::new);

        let (wakeup, trigger) = WakeupPair::new()?.into_parts();
        let (writer, outbound) = outbound_queue(trigger);

        let state = Arc::new(StateCell::new());
        let signals = Arc::new(Signals::new());
        let faults = FaultSink::new();
        let registry = Arc::new(ChannelRegistry::new(Box::new(control)));
        let running = Arc::new(AtomicBool::new(true));
        let label = Arc::new(OnceLock::new());

        let host = config.host.clone();
        let port = config.port;
        log::debug!(
            "opening connection to {host}:{port} (tls: {})",
            config.tls_enabled()
        );

        let worker = Worker {
            reporter: FaultReporter::new(&host, port, faults.clone(), signals.clone()),
            config,
            tls,
            codec: Arc::new(codec),
            registry: registry.clone(),
            state: state.clone(),
            signals: signals.clone(),
            running: running.clone(),
            faults: faults.clone(),
            outbound,
            wakeup,
            label: label.clone(),
        };

        let handle = thread::Builder::new()
            .name(IO_THREAD_NAME.to_owned())
            .spawn(move || worker.run())?;

        log::debug!("I/O thread started for {host}:{port}");

        Ok(Self {
            host,
            port,
            state,
            signals,
            faults,
            registry,
            writer,
            running,
            label,
            worker: Some(handle),
        })
    }

    /// Queues `frame` on `channel` and wakes the I/O thread.
    pub fn write_frame(&self, channel: u16, frame: C::Frame) -> Result<()> {
        if !self.running.load(Ordering::Acquire) || self.state.get().is_closing() {
            return Err(Error::Closed);
        }

        self.writer.write(channel, frame)
    }

    /// A producer handle for other threads.
    pub fn writer(&self) -> FrameWriter<C::Frame> {
        self.writer.clone()
    }

    /// Registers `channel` and returns its inbound queue.
    pub fn register_channel(
        &self,
        channel: u16,
        consumer: Arc<dyn ChannelState>,
    ) -> Result<Receiver<C::Frame>> {
        let (inbound, frames) = unbounded();
        self.registry.register(channel, consumer, inbound)?;
        Ok(frames)
    }

    /// Unregisters `channel`. Later frames for it become faults.
    pub fn remove_channel(&self, channel: u16) -> bool {
        self.registry.remove(channel)
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry<C::Frame>> {
        &self.registry
    }

    pub fn signals(&self) -> &Arc<Signals> {
        &self.signals
    }

    pub fn faults(&self) -> &FaultSink {
        &self.faults
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `"local -> peer"` once the socket has connected.
    pub fn label(&self) -> Option<&str> {
        self.label.get().map(String::as_str)
    }

    /// Asks the I/O thread to stop. Does not wait; see [`join`].
    ///
    /// [`join`]: Connection::join
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            log::debug!("stopping connection to {}:{}", self.host, self.port);
        }

        self.writer.close();
    }

    /// Waits for the I/O thread to exit.
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("I/O thread for {}:{} panicked", self.host, self.port);
            }
        }
    }
}

impl<C: FrameCodec> Drop for Connection<C> {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

impl<C: FrameCodec> std::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state.get())
            .field("label", &self.label.get())
            .finish()
    }
}
