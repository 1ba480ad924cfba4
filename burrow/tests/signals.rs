#[cfg(test)]
mod tests {
    use burrow::{Error, Fault, FaultKind, FaultSink, Signal, Signals, State, StateCell};

    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn fault(kind: FaultKind, message: &str) -> Fault {
        Fault {
            kind,
            host: "broker".into(),
            port: 5672,
            message: message.into(),
        }
    }

    #[test]
    fn test_signals_are_independent() {
        let signals = Signals::new();
        assert!(Signal::ALL.iter().all(|s| !signals.is_set(*s)));

        signals.set(Signal::SocketOpened);
        signals.set(Signal::SocketOpened);
        assert!(signals.is_set(Signal::SocketOpened));
        assert!(!signals.is_set(Signal::SocketClosed));
        assert!(!signals.is_set(Signal::ExceptionRaised));

        signals.clear(Signal::SocketOpened);
        assert!(!signals.is_set(Signal::SocketOpened));
    }

    #[test]
    fn test_wait_any_times_out() {
        let signals = Signals::new();
        let start = Instant::now();

        assert_eq!(
            signals.wait_any(&[Signal::ExceptionRaised], Duration::from_millis(20)),
            None
        );
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_any_sees_other_thread() {
        let signals = Arc::new(Signals::new());
        let setter = signals.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            setter.set(Signal::SocketClosed);
        });

        assert_eq!(
            signals.wait_any(
                &[Signal::SocketOpened, Signal::SocketClosed],
                Duration::from_secs(5)
            ),
            Some(Signal::SocketClosed)
        );

        handle.join().expect("Thread panicked");
    }

    #[test]
    fn test_fault_sink_hands_out_each_fault_once() {
        let sink = FaultSink::new();
        assert!(sink.is_empty());

        let producer = sink.clone();
        thread::spawn(move || {
            producer.put(fault(FaultKind::Connection, "first"));
            producer.put(fault(FaultKind::ConnectionReset, "second"));
            producer.put(fault(FaultKind::UnknownChannel(4), "third"));
        })
        .join()
        .expect("Thread panicked");

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.take().map(|f| f.message),
            Some("first".to_owned())
        );

        let rest = sink.drain();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].kind, FaultKind::UnknownChannel(4));
        assert!(sink.is_empty());
        assert_eq!(sink.take(), None);
    }

    #[test]
    fn test_fault_display_names_target() {
        let text = fault(FaultKind::ConnectionReset, "Connection reset").to_string();
        assert_eq!(text, "connection reset (broker:5672): Connection reset");
    }

    #[test]
    fn test_state_walks_forward_only() {
        let state = StateCell::new();
        assert_eq!(state.get(), State::Opening);

        assert_eq!(state.transition(State::Open).expect("Opening -> Open"), State::Opening);
        assert!(matches!(
            state.transition(State::Closed),
            Err(Error::InvalidTransition {
                from: State::Open,
                to: State::Closed
            })
        ));

        state.transition(State::Closing).expect("Open -> Closing");
        state.transition(State::Closed).expect("Closing -> Closed");

        for next in [State::Opening, State::Open, State::Closing, State::Closed] {
            assert!(state.transition(next).is_err());
        }
        assert_eq!(state.get(), State::Closed);
    }

    #[test]
    fn test_aborted_open_goes_straight_to_closing() {
        let state = StateCell::new();

        state.transition(State::Closing).expect("Opening -> Closing");
        assert!(state.get().is_closing());
        assert!(state.transition(State::Open).is_err());
    }
}
