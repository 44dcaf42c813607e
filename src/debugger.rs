mod disassemble;

use crate::cpu;
use crate::debugger::disassemble::disassemble;
use crate::error::VmError;
use crate::state::State;
use lazy_static::lazy_static;
use regex::Regex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

lazy_static! {
    static ref READ_REGEX: Regex = Regex::new(r"^read 0x([a-f0-9]{1,4})$").unwrap();
    static ref BREAK_ADDRESS_REGEX: Regex =
        Regex::new(r"^break-address 0x([a-f0-9]{1,4})$").unwrap();
}

/// Drives the fetch-decode-execute loop one instruction at a time, pausing
/// for a command before each one unless the user has asked to `continue`.
pub fn run(mut state: State) -> Result<(), VmError> {
    let mut editor = DefaultEditor::new().expect("failed to start line editor");

    while state.running {
        if !state.debug_continue {
            prompt(&mut editor, &mut state);
        }

        if !state.running {
            break;
        }

        if let Some(break_address) = state.break_address {
            if state.pc == break_address {
                state.debug_continue = false;
                state.break_address = None;
                println!("reached break address {:#06x}", break_address);
                continue;
            }
        }

        cpu::step(&mut state)?;
    }

    Ok(())
}

fn prompt(editor: &mut DefaultEditor, state: &mut State) {
    let readline = editor.readline(&format!("{:#06x}> ", state.pc));
    let instruction = state.read_memory(state.pc);

    match readline {
        Ok(line) => {
            let _ = editor.add_history_entry(line.as_str());
            handle_command(&line, state, instruction);
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            state.running = false;
        }
        Err(err) => {
            println!("readline error: {:?}", err);
            state.running = false;
        }
    }
}

fn handle_command(line: &str, state: &mut State, instruction: u16) {
    match line {
        "c" | "continue" => state.debug_continue = true,

        "i" | "inspect" => println!(
            "pc={:#06x} cond={:?} registers={:?} instruction={:#06x} ({:#018b})",
            state.pc, state.condition, state.registers, instruction, instruction
        ),

        "d" | "disassemble" => println!("{}", disassemble(instruction)),

        "h" | "help" => print_help(),

        "exit" => state.running = false,

        "" => {}

        line if READ_REGEX.is_match(line) => {
            let captures = READ_REGEX.captures(line).unwrap();
            let address = u16::from_str_radix(&captures[1], 16).unwrap();
            let value = state.read_memory(address);
            println!("{:#06x}: {:#06x} ({:#018b})", address, value, value);
        }

        line if BREAK_ADDRESS_REGEX.is_match(line) => {
            let captures = BREAK_ADDRESS_REGEX.captures(line).unwrap();
            let address = u16::from_str_radix(&captures[1], 16).unwrap();
            state.break_address = Some(address);
            println!("break address set to {:#06x}", address);
        }

        other => println!("unknown command {:?} (try \"help\")", other),
    }
}

fn print_help() {
    println!("c, continue               Continue execution.");
    println!("i, inspect                Inspect register and condition state.");
    println!("d, disassemble            Disassemble the current instruction.");
    println!("   read <addr>            Read and display a memory address. e.g. read 0x3000");
    println!(
        "   break-address <addr>   Stop stepping when PC reaches <addr>. e.g. break-address 0x3000"
    );
    println!("exit                      Stop the VM.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_regex_matches_lowercase_hex() {
        assert!(READ_REGEX.is_match("read 0x3000"));
        assert!(!READ_REGEX.is_match("read 0xZZZZ"));
    }

    #[test]
    fn break_address_regex_matches_lowercase_hex() {
        assert!(BREAK_ADDRESS_REGEX.is_match("break-address 0x3ffe"));
        assert!(!BREAK_ADDRESS_REGEX.is_match("break-address"));
    }

    #[test]
    fn continue_command_sets_debug_continue() {
        let mut state = State::new();

        handle_command("c", &mut state, 0);

        assert!(state.debug_continue);
    }

    #[test]
    fn exit_command_stops_running() {
        let mut state = State::new();

        handle_command("exit", &mut state, 0);

        assert!(!state.running);
    }

    #[test]
    fn break_address_command_sets_break_address() {
        let mut state = State::new();

        handle_command("break-address 0x4000", &mut state, 0);

        assert_eq!(state.break_address, Some(0x4000));
    }
}
