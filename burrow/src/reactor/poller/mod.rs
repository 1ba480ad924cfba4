//! Readiness polling over the data socket and the wakeup descriptor.
//!
//! Three interchangeable backends satisfy one contract:
//!
//! - `epoll` (Linux/Android): registration based, level-triggered,
//!   write interest toggled incrementally;
//! - `kqueue` (macOS and the BSDs): interest deltas submitted per call,
//!   bounded event batches, `EV_EOF` treated as an error;
//! - `select`: descriptor sets rebuilt on every call, available on every
//!   unix target.
//!
//! [`Poller::new`] picks the most capable backend the host offers and
//! falls back down the list if one fails to initialise. After that the
//! choice is invisible to the caller.

mod common;
mod select;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
mod kqueue;

pub use common::Readiness;

pub(crate) use common::PollBackend;

use std::fmt;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Default upper bound on a single poll.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(3600);

/// A polling strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Epoll,
    Kqueue,
    Select,
}

impl Backend {
    /// Backends compiled for this target, most capable first.
    pub fn available() -> &'static [Backend] {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            &[Backend::Epoll, Backend::Select]
        }

        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        {
            &[Backend::Kqueue, Backend::Select]
        }

        #[cfg(not(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        )))]
        {
            &[Backend::Select]
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Epoll => f.write_str("epoll"),
            Backend::Kqueue => f.write_str("kqueue"),
            Backend::Select => f.write_str("select"),
        }
    }
}

enum Inner {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Epoll(epoll::EpollPoller),

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    Kqueue(kqueue::KqueuePoller),

    Select(select::SelectPoller),
}

/// Watches the data socket and the wakeup descriptor.
pub struct Poller {
    inner: Inner,
    backend: Backend,
}

impl Poller {
    /// Creates a poller with the best backend available on this host.
    pub fn new(fd: RawFd, wake: RawFd) -> io::Result<Self> {
        let mut last_error = None;

        for &backend in Backend::available() {
            match Self::with_backend(backend, fd, wake) {
                Ok(poller) => {
                    log::debug!("using {backend} poller");
                    return Ok(poller);
                }
                Err(err) => {
                    log::warn!("{backend} poller unavailable: {err}");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| io::Error::other("no poller backend available")))
    }

    /// Creates a poller with an explicit backend.
    ///
    /// Returns `Unsupported` if the backend is not compiled for this
    /// target.
    pub fn with_backend(backend: Backend, fd: RawFd, wake: RawFd) -> io::Result<Self> {
        let inner = match backend {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Backend::Epoll => Inner::Epoll(epoll::EpollPoller::new(fd, wake, POLL_TIMEOUT)?),

            #[cfg(any(
                target_os = "macos",
                target_os = "ios",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            ))]
            Backend::Kqueue => Inner::Kqueue(kqueue::KqueuePoller::new(fd, wake, POLL_TIMEOUT)?),

            Backend::Select => Inner::Select(select::SelectPoller::new(fd, wake, POLL_TIMEOUT)?),

            other => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("{other} is not available on this platform"),
                ));
            }
        };

        Ok(Self { inner, backend })
    }

    /// The backend in use.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Lowers (or raises) the maximum time a single poll may block.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.backend_mut().set_timeout(timeout);
    }

    /// Waits for readiness.
    ///
    /// The data socket is watched for writability only while
    /// `write_wanted` is set. An interrupted wait returns an empty
    /// [`Readiness`].
    pub fn poll(&mut self, write_wanted: bool) -> io::Result<Readiness> {
        self.backend_mut().poll(write_wanted)
    }

    fn backend_mut(&mut self) -> &mut dyn PollBackend {
        match &mut self.inner {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Inner::Epoll(poller) => poller,

            #[cfg(any(
                target_os = "macos",
                target_os = "ios",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            ))]
            Inner::Kqueue(poller) => poller,

            Inner::Select(poller) => poller,
        }
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("backend", &self.backend)
            .finish()
    }
}
