//! Human acknowledgment before continuing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};

use console::Term;

use crate::error::{InstallerError, Result};
use crate::signal::POLL_INTERVAL;

/// Blocks until the operator acknowledges `message`
pub trait Confirm {
    fn acknowledge(&self, message: &str) -> Result<()>;
}

/// Prompts on the controlling terminal and waits for Enter
///
/// The line is read on a helper thread so the wait can end as soon as the
/// interrupt flag goes up; a blocked terminal read is not woken by a signal.
pub struct TerminalConfirm<'a> {
    interrupted: &'a AtomicBool,
}

impl<'a> TerminalConfirm<'a> {
    pub fn new(interrupted: &'a AtomicBool) -> Self {
        Self { interrupted }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

impl Confirm for TerminalConfirm<'_> {
    fn acknowledge(&self, message: &str) -> Result<()> {
        if self.is_interrupted() {
            return Err(InstallerError::Interrupted);
        }
        let term = Term::stderr();
        term.write_line(message)?;
        term.write_str("Press Enter to continue...")?;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(Term::stderr().read_line());
        });

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(_) | Err(_) if self.is_interrupted() => {
                    term.write_line("")?;
                    return Err(InstallerError::Interrupted);
                }
                Ok(line) => {
                    line?;
                    return Ok(());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(InstallerError::IoError {
                        message: "terminal reader stopped".to_string(),
                    });
                }
            }
        }
    }
}

/// Never blocks
pub struct NoConfirm;

impl Confirm for NoConfirm {
    fn acknowledge(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}
