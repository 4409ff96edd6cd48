//! Interrupt handling
//!
//! SIGINT and SIGTERM only raise a flag. The handlers are installed without
//! `SA_RESTART`, and every blocking wait in the installer (download streams,
//! retry backoff, the reboot prompt) polls the flag so an interrupt ends the
//! run promptly. A foreground child gets the signal itself and exits, which
//! fails its step. No further command is started once the flag is up, and
//! the workspace is still torn down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Granularity of interruptible waits
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

extern "C" fn on_signal(_: nix::libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the SIGINT/SIGTERM handlers
pub fn install_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores into an atomic, which is async-signal-safe.
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

/// The flag raised by the handlers
pub fn interrupt_flag() -> &'static AtomicBool {
    &INTERRUPTED
}

/// Sleep for `duration` unless `flag` goes up first; returns whether it did
pub fn sleep_unless_interrupted(flag: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_returns_at_once_when_flag_is_up() {
        let flag = AtomicBool::new(true);
        let started = Instant::now();
        assert!(sleep_unless_interrupted(&flag, Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_wakes_when_flag_goes_up() {
        let flag = AtomicBool::new(false);
        let started = Instant::now();
        let interrupted = std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(Duration::from_millis(150));
                flag.store(true, Ordering::SeqCst);
            });
            sleep_unless_interrupted(&flag, Duration::from_secs(30))
        });
        assert!(interrupted);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_runs_out_without_flag() {
        let flag = AtomicBool::new(false);
        assert!(!sleep_unless_interrupted(&flag, Duration::from_millis(20)));
    }
}
