//! Linux `epoll` backend.
//!
//! Level-triggered and registration based: both descriptors are added
//! once at construction, and write interest on the data socket is
//! toggled with `EPOLL_CTL_MOD` only when it changes between polls.

use super::common::{Interest, PollBackend, Readiness, cvt};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT,
    epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

/// Events fetched per `epoll_wait`. Only two descriptors are watched.
const MAX_EVENTS: usize = 8;

pub(crate) struct EpollPoller {
    /// Epoll instance; closed on drop.
    epoll: OwnedFd,

    /// Data socket.
    fd: RawFd,

    /// Wakeup read end.
    wake: RawFd,

    /// Whether `EPOLLOUT` is currently registered for `fd`.
    write_registered: bool,

    /// Reusable buffer for `epoll_wait`.
    events: Vec<epoll_event>,

    timeout: Duration,
}

impl EpollPoller {
    pub(crate) fn new(fd: RawFd, wake: RawFd, timeout: Duration) -> io::Result<Self> {
        let raw = cvt(unsafe { epoll_create1(EPOLL_CLOEXEC) })?;
        let epoll = unsafe { OwnedFd::from_raw_fd(raw) };

        let poller = Self {
            epoll,
            fd,
            wake,
            write_registered: false,
            events: Vec::with_capacity(MAX_EVENTS),
            timeout,
        };

        poller.control(EPOLL_CTL_ADD, fd, Interest::READ)?;
        poller.control(EPOLL_CTL_ADD, wake, Interest::READ)?;

        Ok(poller)
    }

    fn control(&self, op: libc::c_int, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: fd as u64,
        };

        cvt(unsafe { epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) })?;
        Ok(())
    }

    fn update_interest(&mut self, write_wanted: bool) -> io::Result<()> {
        if write_wanted == self.write_registered {
            return Ok(());
        }

        self.control(EPOLL_CTL_MOD, self.fd, Interest::with_write(write_wanted))?;
        self.write_registered = write_wanted;

        Ok(())
    }
}

impl PollBackend for EpollPoller {
    fn poll(&mut self, write_wanted: bool) -> io::Result<Readiness> {
        self.update_interest(write_wanted)?;

        let timeout_ms = self.timeout.as_millis().min(i32::MAX as u128) as i32;

        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                self.events.as_mut_ptr(),
                MAX_EVENTS as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        let mut readiness = Readiness::default();

        for ev in &self.events {
            let fd = ev.u64 as RawFd;
            let flags = ev.events;

            if fd == self.wake {
                // A closed trigger shows up as a hang-up; it is still just a wakeup.
                if flags & ((EPOLLIN | EPOLLHUP | EPOLLERR) as u32) != 0 {
                    readiness.push_readable(fd);
                }
                continue;
            }

            if flags & (EPOLLIN as u32) != 0 {
                readiness.push_readable(fd);
            }
            if flags & (EPOLLOUT as u32) != 0 {
                readiness.push_writable(fd);
            }
            if flags & ((EPOLLERR | EPOLLHUP) as u32) != 0 {
                readiness.push_errored(fd);
            }
        }

        Ok(readiness)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
