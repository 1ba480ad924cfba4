//! BSD `kqueue` backend.
//!
//! Read filters for both descriptors are added at construction. Changes
//! to write interest are submitted as a delta in the same `kevent` call
//! that waits for events, and at most [`MAX_EVENTS`] events are taken
//! per call. An `EV_EOF` on the data socket is reported as an error, and
//! a change receipt for a filter that no longer exists is ignored.

use super::common::{PollBackend, Readiness, cvt};

use libc::{EV_ADD, EV_DELETE, EV_EOF, EV_ERROR, EVFILT_READ, EVFILT_WRITE, kevent, kqueue};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;
use std::time::Duration;

/// Upper bound on events returned by one `kevent` call.
const MAX_EVENTS: usize = 32;

pub(crate) struct KqueuePoller {
    kq: OwnedFd,
    fd: RawFd,
    wake: RawFd,

    /// Whether the write filter for `fd` is currently installed.
    write_registered: bool,

    events: Vec<kevent>,
    timeout: Duration,
}

fn change(fd: RawFd, filter: i16, flags: u16) -> kevent {
    let mut ev: kevent = unsafe { mem::zeroed() };
    ev.ident = fd as _;
    ev.filter = filter as _;
    ev.flags = flags as _;
    ev
}

impl KqueuePoller {
    pub(crate) fn new(fd: RawFd, wake: RawFd, timeout: Duration) -> io::Result<Self> {
        let raw = cvt(unsafe { kqueue() })?;
        let kq = unsafe { OwnedFd::from_raw_fd(raw) };

        let poller = Self {
            kq,
            fd,
            wake,
            write_registered: false,
            events: Vec::with_capacity(MAX_EVENTS),
            timeout,
        };

        let changes = [
            change(fd, EVFILT_READ as i16, EV_ADD as u16),
            change(wake, EVFILT_READ as i16, EV_ADD as u16),
        ];

        cvt(unsafe {
            kevent(
                poller.kq.as_raw_fd(),
                changes.as_ptr(),
                changes.len() as _,
                ptr::null_mut(),
                0,
                ptr::null(),
            )
        })?;

        Ok(poller)
    }

    /// The interest delta needed to move to `write_wanted`.
    fn changelist(&mut self, write_wanted: bool) -> Option<kevent> {
        match (write_wanted, self.write_registered) {
            (true, false) => {
                self.write_registered = true;
                Some(change(self.fd, EVFILT_WRITE as i16, EV_ADD as u16))
            }
            (false, true) => {
                self.write_registered = false;
                Some(change(self.fd, EVFILT_WRITE as i16, EV_DELETE as u16))
            }
            _ => None,
        }
    }
}

/// Folds one returned event into `readiness`.
///
/// An `EV_ERROR` entry is a change receipt carrying an errno in `data`,
/// not a readiness event. `ENOENT` means the write filter being deleted
/// was already gone and is dropped.
fn classify(ev: &kevent, wake: RawFd, readiness: &mut Readiness) {
    let fd = ev.ident as RawFd;

    if ev.flags & (EV_ERROR as _) != 0 {
        if ev.data == libc::ENOENT as _ {
            log::trace!("stale kqueue filter {} on fd {fd}", ev.filter);
        } else {
            log::debug!("kqueue change on fd {fd} failed: errno {}", ev.data);
            readiness.push_errored(fd);
        }
        return;
    }

    if fd == wake {
        readiness.push_readable(fd);
        return;
    }

    if ev.filter == EVFILT_READ {
        readiness.push_readable(fd);
    } else if ev.filter == EVFILT_WRITE {
        readiness.push_writable(fd);
    }

    if ev.flags & (EV_EOF as _) != 0 {
        readiness.push_errored(fd);
    }
}

impl PollBackend for KqueuePoller {
    fn poll(&mut self, write_wanted: bool) -> io::Result<Readiness> {
        let delta = self.changelist(write_wanted);
        let (changes, nchanges) = match delta.as_ref() {
            Some(ev) => (ev as *const kevent, 1),
            None => (ptr::null(), 0),
        };

        let timeout = libc::timespec {
            tv_sec: self.timeout.as_secs() as libc::time_t,
            tv_nsec: self.timeout.subsec_nanos() as _,
        };

        let n = unsafe {
            kevent(
                self.kq.as_raw_fd(),
                changes,
                nchanges,
                self.events.as_mut_ptr(),
                MAX_EVENTS as _,
                &timeout,
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
            classify(ev, self.wake, &mut readiness);
        }

        Ok(readiness)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
