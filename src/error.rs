use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop the interpreter short of a HALT trap.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("{0}")]
    Usage(String),

    #[error("couldn't load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("opcode {opcode:#06b} is reserved or privileged (pc={pc:#06x})")]
    ReservedOpcode { opcode: u16, pc: u16 },

    #[error("unknown trap vector {0:#04x}")]
    UnknownTrap(u16),

    #[error("invalid register index {0} (expected 0..=7)")]
    InvalidRegister(u16),

    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to configure the terminal: {0}")]
    Terminal(#[source] nix::Error),
}
