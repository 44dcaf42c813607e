//! Puts the controlling terminal into raw, unbuffered, no-echo mode for the
//! duration of the VM's run and restores it on every exit path.

use crate::error::VmError;
use log::debug;
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

const STDIN_FILENO: i32 = 0;

pub struct Terminal {
    original: Termios,
}

impl Terminal {
    /// Disables canonical mode and echo on stdin, stashing the previous
    /// settings so `Drop` can put them back.
    pub fn enable_raw_mode() -> Result<Terminal, VmError> {
        let original = termios::tcgetattr(STDIN_FILENO).map_err(VmError::Terminal)?;

        let mut raw = original.clone();
        raw.local_flags &= !(LocalFlags::ICANON | LocalFlags::ECHO);

        termios::tcsetattr(STDIN_FILENO, SetArg::TCSANOW, &raw).map_err(VmError::Terminal)?;

        debug!("terminal switched to raw, no-echo mode");

        Ok(Terminal { original })
    }

    /// Restores the terminal's settings as they were before `enable_raw_mode`.
    /// Safe to call from a signal handler context in spirit (it only touches
    /// already-captured state), and safe to call more than once.
    pub fn restore(&self) {
        let _ = termios::tcsetattr(STDIN_FILENO, SetArg::TCSANOW, &self.original);
    }

    /// A copy of the settings that `restore` puts back, for handing to the
    /// interrupt handler.
    pub fn original(&self) -> Termios {
        self.original.clone()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.restore();
    }
}
