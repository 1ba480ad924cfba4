use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Readiness a descriptor is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    pub(crate) const READ: Interest = Interest {
        read: true,
        write: false,
    };

    pub(crate) const READ_WRITE: Interest = Interest {
        read: true,
        write: true,
    };

    pub(crate) fn with_write(write_wanted: bool) -> Self {
        if write_wanted {
            Self::READ_WRITE
        } else {
            Self::READ
        }
    }
}

/// Descriptor sets reported by one poll.
///
/// Each list holds a descriptor at most once. Only the data socket
/// ever appears in `errored`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: Vec<RawFd>,
    pub writable: Vec<RawFd>,
    pub errored: Vec<RawFd>,
}

impl Readiness {
    /// `true` when nothing was reported (timeout or interrupted call).
    pub fn is_empty(&self) -> bool {
        self.readable.is_empty() && self.writable.is_empty() && self.errored.is_empty()
    }

    pub fn is_readable(&self, fd: RawFd) -> bool {
        self.readable.contains(&fd)
    }

    pub fn is_writable(&self, fd: RawFd) -> bool {
        self.writable.contains(&fd)
    }

    pub(crate) fn push_readable(&mut self, fd: RawFd) {
        push_unique(&mut self.readable, fd);
    }

    pub(crate) fn push_writable(&mut self, fd: RawFd) {
        push_unique(&mut self.writable, fd);
    }

    pub(crate) fn push_errored(&mut self, fd: RawFd) {
        push_unique(&mut self.errored, fd);
    }
}

fn push_unique(list: &mut Vec<RawFd>, fd: RawFd) {
    if !list.contains(&fd) {
        list.push(fd);
    }
}

/// Behaviour shared by every backend.
///
/// A backend watches exactly two descriptors: the data socket, always
/// for reading and for writing only while `write_wanted` is set, and
/// the wakeup descriptor for reading.
pub(crate) trait PollBackend {
    fn poll(&mut self, write_wanted: bool) -> io::Result<Readiness>;

    fn set_timeout(&mut self, timeout: Duration);
}

/// Converts a raw syscall return value, mapping `-1` to `errno`.
pub(crate) fn cvt(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}
