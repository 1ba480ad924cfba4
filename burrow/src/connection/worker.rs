use super::state::{State, StateCell};
use crate::channel::{ChannelRegistry, Dispatcher};
use crate::codec::FrameCodec;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::fault::{FaultKind, FaultReporter, FaultSink};
use crate::net::{PlainTransport, TlsTransport, Transport, connect_first, resolve};
use crate::reactor::wakeup::WakeupReader;
use crate::reactor::{EventLoop, LoopHandler, OutboundQueue};
use crate::signals::{Signal, Signals};

use rustls::ClientConfig;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Everything the I/O thread owns or shares with the handle.
pub(crate) struct Worker<C: FrameCodec> {
    pub(crate) config: ConnectionConfig,
    pub(crate) tls: Option<Arc<ClientConfig>>,
    pub(crate) codec: Arc<C>,
    pub(crate) registry: Arc<ChannelRegistry<C::Frame>>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) signals: Arc<Signals>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) faults: FaultSink,
    pub(crate) reporter: FaultReporter,
    pub(crate) outbound: OutboundQueue<C::Frame>,
    pub(crate) wakeup: WakeupReader,
    pub(crate) label: Arc<OnceLock<String>>,
}

impl<C: FrameCodec> Worker<C> {
    /// Body of the I/O thread: connect, run the loop, tear down.
    pub(crate) fn run(self) {
        let Worker {
            config,
            tls,
            codec,
            registry,
            state,
            signals,
            running,
            faults,
            reporter,
            outbound,
            wakeup,
            label,
        } = self;

        let transport = match establish(&config, tls.as_ref()) {
            Ok(transport) => transport,
            Err(err) => {
                log::error!("could not connect to {}:{}: {err}", config.host, config.port);
                reporter.report(FaultKind::Connection, format!("Could not connect: {err}"));
                teardown(&state, &signals, None);
                return;
            }
        };

        let name = transport.label();
        let _ = label.set(name.clone());

        if !running.load(Ordering::Acquire) || state.transition(State::Open).is_err() {
            log::debug!("stop requested before {name} opened");
            teardown(&state, &signals, Some(transport));
            return;
        }

        signals.set(Signal::SocketOpened);

        let event_loop = EventLoop::new(
            transport,
            codec.clone(),
            outbound,
            wakeup,
            running.clone(),
            signals.clone(),
        );

        let mut event_loop = match event_loop {
            Ok(event_loop) => event_loop.with_poll_timeout(config.poll_timeout),
            Err(err) => {
                log::error!("could not start event loop for {name}: {err}");
                reporter.report(FaultKind::Connection, format!("Poller unavailable: {err}"));
                teardown(&state, &signals, None);
                return;
            }
        };

        let mut handler = IoHandler {
            dispatcher: Dispatcher::new(codec, registry, reporter),
        };

        event_loop.run(&mut handler);

        if !faults.is_empty() {
            signals.set(Signal::ExceptionRaised);
        }

        teardown(&state, &signals, Some(event_loop.into_transport()));
    }
}

/// Resolves, connects, and optionally wraps the socket in TLS.
fn establish(
    config: &ConnectionConfig,
    tls: Option<&Arc<ClientConfig>>,
) -> Result<Box<dyn Transport>> {
    let candidates = if config.addresses.is_empty() {
        resolve(&config.host, config.port)?
    } else {
        config.addresses.clone()
    };

    let (stream, address) = connect_first(&candidates, config.connect_timeout)?;

    let mut transport: Box<dyn Transport> = match tls {
        Some(tls) => Box::new(TlsTransport::connect(
            stream,
            &config.host,
            tls.clone(),
            config.connect_timeout,
        )?),
        None => Box::new(PlainTransport::new(stream)),
    };

    transport.set_nonblocking(true)?;
    log::debug!("socket to {address} ready");

    Ok(transport)
}

/// Releases the socket and walks the state to `Closed`.
fn teardown(state: &StateCell, signals: &Signals, transport: Option<Box<dyn Transport>>) {
    if state.get() != State::Closing {
        let _ = state.transition(State::Closing);
    }

    if let Some(mut transport) = transport {
        transport.close();
    }

    signals.clear(Signal::SocketOpened);
    signals.set(Signal::SocketClosed);

    let _ = state.transition(State::Closed);
}

struct IoHandler<C: FrameCodec> {
    dispatcher: Dispatcher<C>,
}

impl<C: FrameCodec> LoopHandler for IoHandler<C> {
    fn on_read(&mut self, bytes: &[u8]) {
        self.dispatcher.on_read(bytes);
    }

    fn on_error(&mut self, error: io::Error) {
        let kind = if self.dispatcher.registry().control_is_open() {
            FaultKind::ConnectionReset
        } else {
            FaultKind::Connection
        };

        self.dispatcher.faults().report(kind, error.to_string());
    }
}
