//! Installs a `Ctrl+C` handler that restores the terminal before exiting.
//!
//! Cancellation here is intentionally coarse: there is no mechanism to
//! unwind the fetch-decode-execute loop cleanly, so an interrupt restores
//! the one piece of external state the VM owns (the terminal) and then
//! terminates the process directly from the handler.

use log::warn;
use nix::sys::termios::{self, SetArg, Termios};

const STDIN_FILENO: i32 = 0;
const INTERRUPTED_EXIT_CODE: i32 = 130; // 128 + SIGINT

/// Registers a handler that restores `original` and exits with a non-zero
/// code on the next `Ctrl+C`.
pub fn install(original: Termios) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        warn!("interrupted, restoring terminal");
        let _ = termios::tcsetattr(STDIN_FILENO, SetArg::TCSANOW, &original);
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
}
