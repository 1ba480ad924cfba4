//! Portable `select(2)` backend.
//!
//! Keeps no kernel state: the full descriptor sets are rebuilt on every
//! call. The data socket is in the read and exception sets, and in the
//! write set while writes are wanted; the wakeup descriptor is in the
//! read set.

use super::common::{PollBackend, Readiness};

use libc::{FD_ISSET, FD_SET, FD_SETSIZE, FD_ZERO, fd_set, select, timeval};
use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

pub(crate) struct SelectPoller {
    fd: RawFd,
    wake: RawFd,
    timeout: Duration,
}

fn empty_set() -> fd_set {
    let mut set: fd_set = unsafe { mem::zeroed() };
    unsafe { FD_ZERO(&mut set) };
    set
}

impl SelectPoller {
    pub(crate) fn new(fd: RawFd, wake: RawFd, timeout: Duration) -> io::Result<Self> {
        for descriptor in [fd, wake] {
            if descriptor < 0 || descriptor as usize >= FD_SETSIZE as usize {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("descriptor {descriptor} cannot be used with select()"),
                ));
            }
        }

        Ok(Self { fd, wake, timeout })
    }
}

impl PollBackend for SelectPoller {
    fn poll(&mut self, write_wanted: bool) -> io::Result<Readiness> {
        let mut read_set = empty_set();
        let mut write_set = empty_set();
        let mut except_set = empty_set();

        unsafe {
            FD_SET(self.fd, &mut read_set);
            FD_SET(self.wake, &mut read_set);
            FD_SET(self.fd, &mut except_set);
            if write_wanted {
                FD_SET(self.fd, &mut write_set);
            }
        }

        let mut tv = timeval {
            tv_sec: self.timeout.as_secs() as libc::time_t,
            tv_usec: self.timeout.subsec_micros() as libc::suseconds_t,
        };

        let write_ptr = if write_wanted {
            &mut write_set as *mut fd_set
        } else {
            ptr::null_mut()
        };

        let rc = unsafe {
            select(
                self.fd.max(self.wake) + 1,
                &mut read_set,
                write_ptr,
                &mut except_set,
                &mut tv,
            )
        };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }
            return Err(err);
        }

        let mut readiness = Readiness::default();

        unsafe {
            if FD_ISSET(self.wake, &read_set) {
                readiness.push_readable(self.wake);
            }
            if FD_ISSET(self.fd, &read_set) {
                readiness.push_readable(self.fd);
            }
            if write_wanted && FD_ISSET(self.fd, &write_set) {
                readiness.push_writable(self.fd);
            }
            if FD_ISSET(self.fd, &except_set) {
                readiness.push_errored(self.fd);
            }
        }

        Ok(readiness)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
