#[cfg(test)]
mod tests {
    use burrow::reactor::poller::{Backend, Poller};
    use burrow::reactor::wakeup::WakeupPair;

    use std::io::{ErrorKind, Write};
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    struct Fixture {
        poller: Poller,
        local: UnixStream,
        remote: UnixStream,
        wakeup: WakeupPair,
    }

    fn fixture(backend: Backend) -> Fixture {
        let (local, remote) = UnixStream::pair().expect("Failed to create socket pair");
        local
            .set_nonblocking(true)
            .expect("Failed to set socket non-blocking");
        let wakeup = WakeupPair::native().expect("Failed to create wakeup pair");

        let mut poller = Poller::with_backend(backend, local.as_raw_fd(), wakeup.reader.raw_fd())
            .expect("Failed to create poller");
        poller.set_timeout(Duration::from_millis(200));

        Fixture {
            poller,
            local,
            remote,
            wakeup,
        }
    }

    #[test]
    fn test_default_backend_is_most_capable() {
        let (local, _remote) = UnixStream::pair().expect("Failed to create socket pair");
        let wakeup = WakeupPair::new().expect("Failed to create wakeup pair");

        let poller =
            Poller::new(local.as_raw_fd(), wakeup.reader.raw_fd()).expect("Failed to create poller");

        assert_eq!(poller.backend(), Backend::available()[0]);
        assert_eq!(Backend::available().last(), Some(&Backend::Select));
    }

    #[test]
    fn test_timeout_returns_empty_readiness() {
        for &backend in Backend::available() {
            let mut fx = fixture(backend);
            fx.poller.set_timeout(Duration::from_millis(20));

            let ready = fx.poller.poll(false).expect("Poll failed");
            assert!(ready.is_empty(), "{backend}: {ready:?}");
        }
    }

    #[test]
    fn test_readable_data_socket() {
        for &backend in Backend::available() {
            let mut fx = fixture(backend);
            fx.remote.write_all(b"x").expect("Failed to write to socket");

            let ready = fx.poller.poll(false).expect("Poll failed");
            assert!(ready.is_readable(fx.local.as_raw_fd()), "{backend}: {ready:?}");
            assert!(ready.errored.is_empty(), "{backend}: {ready:?}");
        }
    }

    #[test]
    fn test_wakeup_interrupts_poll() {
        for &backend in Backend::available() {
            let mut fx = fixture(backend);
            fx.poller.set_timeout(Duration::from_secs(10));
            fx.wakeup.trigger.notify();

            let ready = fx.poller.poll(false).expect("Poll failed");
            assert!(ready.is_readable(fx.wakeup.reader.raw_fd()), "{backend}: {ready:?}");
            assert!(!ready.is_readable(fx.local.as_raw_fd()), "{backend}: {ready:?}");
            assert_eq!(fx.wakeup.reader.drain(), 1);
        }
    }

    #[test]
    fn test_write_interest_follows_request() {
        for &backend in Backend::available() {
            let mut fx = fixture(backend);

            let ready = fx.poller.poll(true).expect("Poll failed");
            assert!(ready.is_writable(fx.local.as_raw_fd()), "{backend}: {ready:?}");

            fx.poller.set_timeout(Duration::from_millis(20));
            let ready = fx.poller.poll(false).expect("Poll failed");
            assert!(ready.is_empty(), "{backend}: {ready:?}");

            fx.poller.set_timeout(Duration::from_millis(200));
            let ready = fx.poller.poll(true).expect("Poll failed");
            assert!(ready.is_writable(fx.local.as_raw_fd()), "{backend}: {ready:?}");
        }
    }

    #[test]
    fn test_closed_trigger_is_a_wakeup_not_an_error() {
        for &backend in Backend::available() {
            let mut fx = fixture(backend);
            fx.wakeup.trigger.close();

            let ready = fx.poller.poll(false).expect("Poll failed");
            assert!(ready.is_readable(fx.wakeup.reader.raw_fd()), "{backend}: {ready:?}");
            assert!(ready.errored.is_empty(), "{backend}: {ready:?}");
        }
    }

    #[test]
    fn test_select_rejects_descriptor_beyond_fd_setsize() {
        let wakeup = WakeupPair::native().expect("Failed to create wakeup pair");

        let err = Poller::with_backend(Backend::Select, 65_536, wakeup.reader.raw_fd())
            .expect_err("Select accepted an out of range descriptor");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_unavailable_backend_is_unsupported() {
        let (local, _remote) = UnixStream::pair().expect("Failed to create socket pair");
        let wakeup = WakeupPair::native().expect("Failed to create wakeup pair");

        for backend in [Backend::Epoll, Backend::Kqueue] {
            if Backend::available().contains(&backend) {
                continue;
            }

            let err = Poller::with_backend(backend, local.as_raw_fd(), wakeup.reader.raw_fd())
                .expect_err("Backend should not exist on this platform");
            assert_eq!(err.kind(), ErrorKind::Unsupported);
        }
    }
}
