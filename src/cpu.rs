//! The fetch-decode-execute loop and the fifteen defined opcode handlers.

use crate::error::VmError;
use crate::instruction::Instruction;
use crate::instruction::Register::*;
use crate::sign_extend::SignExtend;
use crate::state::State;
use crate::trap_vector::TrapVector;
use log::{error, trace};
use std::io::{self, Read, Write};

/// Runs the fetch-decode-execute loop until a HALT trap clears `running`.
pub fn run(mut state: State) -> Result<(), VmError> {
    while state.running {
        step(&mut state)?;
    }

    Ok(())
}

/// Fetches and executes a single instruction. The program counter is
/// post-incremented before the handler runs, so every PC-relative offset
/// in the handlers below is relative to the *next* instruction.
pub fn step(state: &mut State) -> Result<(), VmError> {
    let pc = state.pc;
    let word = state.read_memory(pc);
    state.pc = state.pc.wrapping_add(1);

    trace!("fetch pc={:#06x} word={:#06x}", pc, word);

    match Instruction::decode(word) {
        Ok(instruction) => execute(state, instruction),
        Err(err) => {
            error!("decode failed at pc={:#06x}: {}", pc, err);
            Err(err)
        }
    }
}

fn execute(state: &mut State, instruction: Instruction) -> Result<(), VmError> {
    match instruction {
        // BR - Conditional Branch
        //
        // The condition codes specified by bits [11:9] are tested. If any of
        // the condition codes tested is set, the program branches to the
        // location specified by adding the sign-extended PCoffset9 field to
        // the incremented PC.
        Instruction::Br(condition, pc_offset) => {
            let taken = (condition.n && state.condition == crate::state::Condition::N)
                || (condition.z && state.condition == crate::state::Condition::Z)
                || (condition.p && state.condition == crate::state::Condition::P);

            if taken {
                state.pc = state.pc.wrapping_add(pc_offset.sign_extend(9));
            }
        }

        // ADD - Addition. Second operand is either SR2 or a sign-extended
        // imm5, selected by bit [5] at decode time.
        Instruction::Add(dr, sr1, sr2) => {
            let value = state.read_register(sr1).wrapping_add(state.read_register(sr2));
            state.write_register(dr, value);
            state.update_flags(dr);
        }
        Instruction::AddImm(dr, sr1, imm5) => {
            let value = state.read_register(sr1).wrapping_add(imm5.sign_extend(5));
            state.write_register(dr, value);
            state.update_flags(dr);
        }

        // LD - Load. DR <- mem[PC + sext(pc_offset9)].
        Instruction::Ld(dr, pc_offset) => {
            let address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            let value = state.read_memory(address);
            state.write_register(dr, value);
            state.update_flags(dr);
        }

        // ST - Store. mem[PC + sext(pc_offset9)] <- SR.
        Instruction::St(sr, pc_offset) => {
            let address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            state.write_memory(address, state.read_register(sr));
        }

        // JSR / JSRR - Jump to Subroutine. R7 is always loaded with the
        // already-incremented PC before the jump, so `JSR foo ... RET`
        // round-trips even though both addresses are derived from the same
        // pre-jump PC.
        Instruction::Jsr(pc_offset) => {
            let return_address = state.pc;
            state.pc = state.pc.wrapping_add(pc_offset.sign_extend(11));
            state.write_register(R7, return_address);
        }
        Instruction::Jsrr(base_r) => {
            let return_address = state.pc;
            state.pc = state.read_register(base_r);
            state.write_register(R7, return_address);
        }

        // AND - Bit-wise Logical AND, same shape as ADD.
        Instruction::And(dr, sr1, sr2) => {
            let value = state.read_register(sr1) & state.read_register(sr2);
            state.write_register(dr, value);
            state.update_flags(dr);
        }
        Instruction::AndImm(dr, sr1, imm5) => {
            let value = state.read_register(sr1) & imm5.sign_extend(5);
            state.write_register(dr, value);
            state.update_flags(dr);
        }

        // LDR - Load Base+offset. DR <- mem[BaseR + sext(offset6)].
        Instruction::Ldr(dr, base_r, offset) => {
            let address = state.read_register(base_r).wrapping_add(offset.sign_extend(6));
            let value = state.read_memory(address);
            state.write_register(dr, value);
            state.update_flags(dr);
        }

        // STR - Store Base+offset. mem[BaseR + sext(offset6)] <- SR.
        Instruction::Str(sr, base_r, offset) => {
            let address = state.read_register(base_r).wrapping_add(offset.sign_extend(6));
            state.write_memory(address, state.read_register(sr));
        }

        Instruction::Rti => {
            return Err(VmError::ReservedOpcode {
                opcode: 0b1000,
                pc: state.pc,
            });
        }

        // NOT - Bit-wise complement.
        Instruction::Not(dr, sr) => {
            state.write_register(dr, !state.read_register(sr));
            state.update_flags(dr);
        }

        // LDI - Load Indirect. DR <- mem[mem[PC + sext(pc_offset9)]].
        Instruction::Ldi(dr, pc_offset) => {
            let indirect_address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            let address = state.read_memory(indirect_address);
            let value = state.read_memory(address);
            state.write_register(dr, value);
            state.update_flags(dr);
        }

        // STI - Store Indirect. mem[mem[PC + sext(pc_offset9)]] <- SR.
        Instruction::Sti(sr, pc_offset) => {
            let indirect_address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            let address = state.read_memory(indirect_address);
            state.write_memory(address, state.read_register(sr));
        }

        // JMP / RET - PC <- contents of the base register. RET is JMP R7.
        Instruction::Jmp(base_r) => {
            state.pc = state.read_register(base_r);
        }

        Instruction::Reserved => {
            return Err(VmError::ReservedOpcode {
                opcode: 0b1101,
                pc: state.pc,
            });
        }

        // LEA - Load Effective Address. The address itself is loaded into
        // DR; memory is never read.
        Instruction::Lea(dr, pc_offset) => {
            let address = state.pc.wrapping_add(pc_offset.sign_extend(9));
            state.write_register(dr, address);
            state.update_flags(dr);
        }

        Instruction::Trap(trap_vector) => {
            state.write_register(R7, state.pc);
            run_trap(state, trap_vector)?;
        }
    }

    Ok(())
}

fn run_trap(state: &mut State, trap_vector: TrapVector) -> Result<(), VmError> {
    match trap_vector {
        // GETC - read one character from the terminal, no echo, into R0.
        TrapVector::Getc => {
            let mut buffer = [0; 1];
            io::stdin().read_exact(&mut buffer)?;

            state.write_register(R0, u16::from(buffer[0]));
            state.update_flags(R0);
        }

        // OUT - write the low byte of R0 to the terminal.
        TrapVector::Out => {
            let c = state.read_register(R0) as u8;
            print!("{}", c as char);
            io::stdout().flush()?;
        }

        // PUTS - R0 is the address of a NUL-terminated string, one character
        // per memory word.
        TrapVector::Puts => {
            let mut address = state.read_register(R0);
            let mut word = state.read_memory(address);

            while word != 0 {
                print!("{}", (word as u8) as char);
                address = address.wrapping_add(1);
                word = state.read_memory(address);
            }

            io::stdout().flush()?;
        }

        // IN - prompt, read and echo one character, place it in R0.
        TrapVector::In => {
            print!("Enter a character: ");
            io::stdout().flush()?;

            let mut buffer = [0; 1];
            io::stdin().read_exact(&mut buffer)?;
            print!("{}", buffer[0] as char);
            io::stdout().flush()?;

            state.write_register(R0, u16::from(buffer[0]));
            state.update_flags(R0);
        }

        // PUTSP - like PUTS, but two characters packed per memory word,
        // low byte first.
        TrapVector::Putsp => {
            let mut address = state.read_register(R0);
            let mut word = state.read_memory(address);

            while word != 0 {
                let low = (word & 0xFF) as u8;
                print!("{}", low as char);

                let high = (word >> 8) as u8;
                if high != 0 {
                    print!("{}", high as char);
                }

                address = address.wrapping_add(1);
                word = state.read_memory(address);
            }

            io::stdout().flush()?;
        }

        // HALT - stop the fetch-execute loop.
        TrapVector::Halt => {
            println!("\n--- halted ---");
            io::stdout().flush()?;
            state.running = false;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Register::*;
    use crate::state::Condition;

    fn new_state() -> State {
        let mut state = State::new();
        state.pc = 0x3000;
        state
    }

    #[test]
    fn step_increments_pc_before_dispatch() {
        let mut state = new_state();
        state.write_memory(0x3000, 0x1261); // ADD R1, R1, #1

        step(&mut state).unwrap();

        assert_eq!(state.pc, 0x3001);
        assert_eq!(state.read_register(R1), 1);
        assert_eq!(state.condition, Condition::P);
    }

    #[test]
    fn add_immediate_negative_sets_n_flag() {
        let mut state = new_state();
        state.write_memory(0x3000, 0x127F); // ADD R1, R1, #-1

        step(&mut state).unwrap();

        assert_eq!(state.read_register(R1), 0xFFFF);
        assert_eq!(state.condition, Condition::N);
        assert_eq!(state.pc, 0x3001);
    }

    #[test]
    fn ldi_follows_indirection() {
        let mut state = new_state();
        state.write_memory(0x3000, 0xA201); // LDI R1, #1
        state.write_memory(0x3002, 0x3050);
        state.write_memory(0x3050, 0xBEEF);

        step(&mut state).unwrap();

        assert_eq!(state.read_register(R1), 0xBEEF);
        assert_eq!(state.condition, Condition::N);
        assert_eq!(state.pc, 0x3001);
    }

    #[test]
    fn br_taken_then_not_taken() {
        let mut state = new_state();
        state.write_memory(0x3000, 0x5020); // AND R0, R0, #0
        state.write_memory(0x3001, 0x0402); // BRz #2

        step(&mut state).unwrap();
        step(&mut state).unwrap();

        assert_eq!(state.pc, 0x3004);
    }

    #[test]
    fn jsr_and_ret_round_trip() {
        let mut state = new_state();
        state.write_memory(0x3000, 0x4802); // JSR #2
        state.write_memory(0x3003, 0xC1C0); // RET (JMP R7)

        step(&mut state).unwrap();
        assert_eq!(state.read_register(R7), 0x3001);
        assert_eq!(state.pc, 0x3003);

        step(&mut state).unwrap();
        assert_eq!(state.pc, 0x3001);
    }

    #[test]
    fn negate_via_not_and_add_one() {
        let mut state = new_state();
        state.write_register(R1, 3);
        state.write_register(R2, 4);

        // ADD R0, R1, R2
        execute(&mut state, Instruction::Add(R0, R1, R2)).unwrap();
        // NOT R0, R0
        execute(&mut state, Instruction::Not(R0, R0)).unwrap();
        // ADD R0, R0, #1
        execute(&mut state, Instruction::AddImm(R0, R0, 1)).unwrap();

        assert_eq!(state.read_register(R0), (-(7i32) as u16));
    }

    #[test]
    fn lea_then_ldr_matches_ld() {
        let mut state = new_state();
        state.write_memory(0x3005, 0xCAFE);

        let mut via_ld = State::new();
        via_ld.pc = 0x3000;
        via_ld.memory = state.memory;
        execute(&mut via_ld, Instruction::Ld(R0, 5)).unwrap();

        execute(&mut state, Instruction::Lea(R1, 5)).unwrap();
        execute(&mut state, Instruction::Ldr(R2, R1, 0)).unwrap();

        assert_eq!(state.read_register(R2), via_ld.read_register(R0));
    }

    #[test]
    fn rti_is_a_fatal_error() {
        let mut state = new_state();

        let err = execute(&mut state, Instruction::Rti).unwrap_err();

        assert!(matches!(err, VmError::ReservedOpcode { .. }));
    }

    #[test]
    fn reserved_opcode_is_a_fatal_error() {
        let mut state = new_state();

        let err = execute(&mut state, Instruction::Reserved).unwrap_err();

        assert!(matches!(err, VmError::ReservedOpcode { .. }));
    }

    #[test]
    fn trap_halt_stops_the_loop() {
        let mut state = new_state();

        execute(&mut state, Instruction::Trap(TrapVector::Halt)).unwrap();

        assert!(!state.running);
    }

    #[test]
    fn br_to_self_on_matching_condition() {
        let mut state = new_state();
        // BRz #-1: branches to the instruction's own address when COND=Z.
        state.write_memory(0x3000, 0x05FF);

        step(&mut state).unwrap();

        assert_eq!(state.pc, 0x3000);
    }

    #[test]
    fn puts_then_halt_stops_cleanly() {
        let mut state = new_state();
        state.write_memory(0x3000, 0xE002); // LEA R0, #2
        state.write_memory(0x3001, 0xF022); // PUTS
        state.write_memory(0x3002, 0xF025); // HALT
        state.write_memory(0x3003, u16::from(b'H'));
        state.write_memory(0x3004, u16::from(b'i'));
        state.write_memory(0x3005, 0);

        run(state).unwrap();
    }

    #[test]
    fn pc_wraps_from_top_of_memory() {
        let mut state = new_state();
        state.pc = 0xFFFF;
        state.write_memory(0xFFFF, 0x5020); // AND R0, R0, #0 (no PC-relative math)

        step(&mut state).unwrap();

        assert_eq!(state.pc, 0x0000);
    }
}
