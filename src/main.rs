use lc3_vm::{install_interrupt_handler, Config, Terminal, VmError};
use log::error;
use std::process;

fn main() {
    env_logger::init();

    let config = Config::parse();

    let terminal = Terminal::enable_raw_mode().unwrap_or_else(|err| {
        eprintln!("couldn't configure the terminal: {}", err);
        process::exit(4);
    });

    if let Err(err) = install_interrupt_handler(terminal.original()) {
        eprintln!("couldn't install interrupt handler: {}", err);
        process::exit(4);
    }

    let exit_code = match lc3_vm::run(config) {
        Ok(()) => 0,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            exit_code_for(&err)
        }
    };

    terminal.restore();
    process::exit(exit_code);
}

fn exit_code_for(err: &VmError) -> i32 {
    match err {
        VmError::Usage(_) => 2,
        VmError::ImageLoad { .. } => 1,
        VmError::ReservedOpcode { .. } | VmError::UnknownTrap(_) | VmError::InvalidRegister(_) => {
            3
        }
        VmError::Io(_) | VmError::Terminal(_) => 4,
    }
}
