//! Standard input that gives way to shutdown requests
//!
//! A signal can arrive after the loop last looked at the shutdown flag but
//! before read(2) starts; that read would then block until more input shows
//! up. Waiting in poll(2) on both the input and the shutdown wake pipe closes
//! the gap: a request made at any point before the wait makes it return.

use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};

/// Reads straight from a descriptor, reporting [`io::ErrorKind::Interrupted`]
/// instead of blocking once the wake descriptor is readable.
///
/// Reads bypass any userspace buffer of `F` so that a readable descriptor
/// always means readable data.
#[derive(Debug)]
pub struct SignalAwareInput<F> {
    source: F,
    wake: Option<RawFd>,
}

impl<F: AsRawFd> SignalAwareInput<F> {
    /// Without a wake descriptor this is a plain unbuffered reader
    pub fn new(source: F, wake: Option<RawFd>) -> Self {
        Self { source, wake }
    }

    /// Block until either descriptor is ready. Returns false when the wake
    /// descriptor is.
    fn wait(&self, wake: RawFd) -> io::Result<bool> {
        let mut fds = [
            libc::pollfd {
                fd: self.source.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: wake,
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        // # Safety
        //
        // `fds` is a live array of two initialized pollfd entries for the
        // whole call.
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if ready < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(fds[1].revents == 0)
    }
}

impl<F: AsRawFd> Read for SignalAwareInput<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(wake) = self.wake {
            if !self.wait(wake)? {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
        }

        // # Safety
        //
        // `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe {
            libc::read(
                self.source.as_raw_fd(),
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}
