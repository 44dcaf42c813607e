mod config;
mod cpu;
mod debugger;
mod error;
mod file_loader;
mod instruction;
mod interrupt;
mod opcode;
mod sign_extend;
mod state;
mod terminal;
mod trap_vector;

pub use crate::config::Config;
pub use crate::error::VmError;
pub use crate::interrupt::install as install_interrupt_handler;
pub use crate::terminal::Terminal;

use crate::file_loader::load_files;
use crate::state::State;
use log::info;

/// Loads the configured images and runs the VM to completion (a `HALT` trap
/// or a fatal error), dispatching to the interactive debugger when asked.
pub fn run(config: Config) -> Result<(), VmError> {
    let state = load_files(&config.images, State::new())?;

    info!("loaded {} image(s)", config.images.len());

    if config.debug {
        debugger::run(state)
    } else {
        cpu::run(state)
    }
}
