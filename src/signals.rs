//! Signal handling
//!
//! SIGINT and SIGALRM are the only intercepted signals. Their handler records
//! the first signal number in an atomic and writes one byte to a wake pipe;
//! the command loop polls the pipe next to standard input, and the termination
//! controller performs the actual cleanup on the normal thread of control.

use std::io;
use std::os::fd::{IntoRawFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

use tracing::debug;

/// Signal number of the first delivered shutdown signal, 0 while none
static PENDING: AtomicI32 = AtomicI32::new(0);

/// Ends of the process wake pipe, -1 until [`install`] runs
static WAKE_READ: AtomicI32 = AtomicI32::new(-1);
static WAKE_WRITE: AtomicI32 = AtomicI32::new(-1);

/// Shutdown signals the process reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT
    Interrupt,
    /// SIGALRM
    Alarm,
}

impl Signal {
    pub fn signum(&self) -> libc::c_int {
        match self {
            Signal::Interrupt => libc::SIGINT,
            Signal::Alarm => libc::SIGALRM,
        }
    }

    pub fn from_signum(signum: libc::c_int) -> Option<Self> {
        match signum {
            libc::SIGINT => Some(Signal::Interrupt),
            libc::SIGALRM => Some(Signal::Alarm),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Alarm => "SIGALRM",
        }
    }
}

/// A pipe that becomes readable once shutdown is requested.
///
/// Only the first request writes, so the pipe holds at most one byte and the
/// write never blocks.
#[derive(Debug, Clone, Copy)]
struct WakePipe {
    read: RawFd,
    write: RawFd,
}

impl WakePipe {
    /// Open a pipe that lives for the rest of the process
    fn open() -> io::Result<Self> {
        let (read, write) = io::pipe()?;
        Ok(Self {
            read: read.into_raw_fd(),
            write: write.into_raw_fd(),
        })
    }

    fn process() -> Option<Self> {
        let read = WAKE_READ.load(Ordering::SeqCst);
        let write = WAKE_WRITE.load(Ordering::SeqCst);
        (read >= 0 && write >= 0).then_some(Self { read, write })
    }
}

fn notify(fd: RawFd) {
    let byte = 1u8;
    // # Safety
    //
    // `write` is async-signal-safe and `byte` outlives the call. A failed
    // write only means the poll will not wake; the flag is still set.
    unsafe {
        libc::write(fd, (&byte as *const u8).cast(), 1);
    }
}

/// Read side of a shutdown request
#[derive(Debug, Clone, Copy)]
pub struct ShutdownSignal {
    pending: &'static AtomicI32,
    wake: Option<WakePipe>,
}

impl ShutdownSignal {
    /// Flag fed by the process signal handlers
    pub fn process() -> Self {
        Self {
            pending: &PENDING,
            wake: WakePipe::process(),
        }
    }

    /// Flag not connected to any signal handler; only [`request`](Self::request)
    /// sets it. Each call leaks one atomic.
    pub fn detached() -> Self {
        Self {
            pending: Box::leak(Box::new(AtomicI32::new(0))),
            wake: None,
        }
    }

    /// Like [`detached`](Self::detached), with its own wake pipe. Each call
    /// also leaks the pipe.
    pub fn detached_with_wake() -> io::Result<Self> {
        Ok(Self {
            wake: Some(WakePipe::open()?),
            ..Self::detached()
        })
    }

    /// First signal recorded, if any
    pub fn pending(&self) -> Option<Signal> {
        Signal::from_signum(self.pending.load(Ordering::SeqCst))
    }

    pub fn is_requested(&self) -> bool {
        self.pending().is_some()
    }

    /// Descriptor that turns readable once shutdown is requested
    pub fn wake_fd(&self) -> Option<RawFd> {
        self.wake.map(|pipe| pipe.read)
    }

    /// Record `signal` unless one is already pending. Returns whether this
    /// call was the first.
    pub fn request(&self, signal: Signal) -> bool {
        let first = record(self.pending, signal.signum());
        if first {
            if let Some(pipe) = self.wake {
                notify(pipe.write);
            }
        }
        first
    }
}

fn record(pending: &AtomicI32, signum: libc::c_int) -> bool {
    pending
        .compare_exchange(0, signum, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

extern "C" fn on_shutdown_signal(signum: libc::c_int) {
    // Only async-signal-safe work here
    if record(&PENDING, signum) {
        let fd = WAKE_WRITE.load(Ordering::SeqCst);
        if fd >= 0 {
            notify(fd);
        }
    }
}

/// Open the wake pipe and install the SIGINT and SIGALRM handlers.
///
/// Handlers are installed without `SA_RESTART` so a blocking read returns
/// `EINTR` and the loop gets to observe the request.
pub fn install() -> io::Result<ShutdownSignal> {
    if WakePipe::process().is_none() {
        let pipe = WakePipe::open()?;
        WAKE_READ.store(pipe.read, Ordering::SeqCst);
        WAKE_WRITE.store(pipe.write, Ordering::SeqCst);
    }

    for signal in [Signal::Interrupt, Signal::Alarm] {
        install_one(signal.signum())?;
        debug!(signal = signal.name(), "installed shutdown handler");
    }
    Ok(ShutdownSignal::process())
}

fn install_one(signum: libc::c_int) -> io::Result<()> {
    // # Safety
    //
    // `sigaction` is a plain C struct; all-zero is a valid starting value.
    // The handler only performs an atomic compare-exchange and a one-byte
    // write(2), both async-signal-safe.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction =
            on_shutdown_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Schedule SIGALRM after `seconds`. Zero cancels a pending alarm.
pub fn arm_alarm(seconds: u32) {
    // # Safety
    //
    // `alarm` has no memory-safety preconditions.
    let previous = unsafe { libc::alarm(seconds as libc::c_uint) };
    debug!(seconds, previous, "armed alarm");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_numbers_round_trip() {
        for signal in [Signal::Interrupt, Signal::Alarm] {
            assert_eq!(Signal::from_signum(signal.signum()), Some(signal));
        }
        assert_eq!(Signal::from_signum(libc::SIGTERM), None);
        assert_eq!(Signal::from_signum(0), None);
    }

    #[test]
    fn test_first_request_wins() {
        let shutdown = ShutdownSignal::detached();
        assert!(!shutdown.is_requested());

        assert!(shutdown.request(Signal::Alarm));
        assert!(!shutdown.request(Signal::Interrupt));
        assert_eq!(shutdown.pending(), Some(Signal::Alarm));
    }

    #[test]
    fn test_wake_pipe_turns_readable_on_first_request() {
        let shutdown = ShutdownSignal::detached_with_wake().unwrap();
        let fd = shutdown.wake_fd().unwrap();
        assert_eq!(ShutdownSignal::detached().wake_fd(), None);

        let mut poll = [libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        }];
        // # Safety: one valid pollfd, zero timeout
        let ready = unsafe { libc::poll(poll.as_mut_ptr(), 1, 0) };
        assert_eq!(ready, 0);

        assert!(shutdown.request(Signal::Interrupt));
        assert!(!shutdown.request(Signal::Alarm));
        let ready = unsafe { libc::poll(poll.as_mut_ptr(), 1, 0) };
        assert_eq!(ready, 1);

        // exactly one byte, from the first request
        let mut buf = [0u8; 4];
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        assert_eq!(n, 1);
    }

    #[test]
    fn test_detached_flags_are_independent() {
        let a = ShutdownSignal::detached();
        let b = ShutdownSignal::detached();
        a.request(Signal::Interrupt);
        assert!(a.is_requested());
        assert!(!b.is_requested());
    }
}
