use crate::error::VmError;
use crate::trap_vector::TrapVector;

/// A fully decoded instruction word. Variants don't map 1:1 onto the 4-bit
/// opcode space: ADD/AND split their immediate-mode encoding into a separate
/// variant, and JSR/JSRR likewise, so the executor's match arms never have to
/// re-inspect the mode bit.
#[derive(Debug)]
pub enum Instruction {
    Br(Condition, u16),
    Add(Register, Register, Register),
    AddImm(Register, Register, u16),
    Ld(Register, u16),
    St(Register, u16),
    Jsr(u16),
    Jsrr(Register),
    And(Register, Register, Register),
    AndImm(Register, Register, u16),
    Ldr(Register, Register, u16),
    Str(Register, Register, u16),
    Rti,
    Not(Register, Register),
    Ldi(Register, u16),
    Sti(Register, u16),
    Jmp(Register),
    Reserved,
    Lea(Register, u16),
    Trap(TrapVector),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl Register {
    fn try_from(n: u16) -> Result<Register, VmError> {
        match n {
            0 => Ok(Register::R0),
            1 => Ok(Register::R1),
            2 => Ok(Register::R2),
            3 => Ok(Register::R3),
            4 => Ok(Register::R4),
            5 => Ok(Register::R5),
            6 => Ok(Register::R6),
            7 => Ok(Register::R7),
            _ => Err(VmError::InvalidRegister(n)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Condition {
    pub n: bool,
    pub z: bool,
    pub p: bool,
}

impl Instruction {
    pub fn decode(instruction: u16) -> Result<Self, VmError> {
        let opcode = instruction >> 12;

        let instruction = match opcode {
            0x0 => {
                let n = ((instruction >> 11) & 0x1) == 1;
                let z = ((instruction >> 10) & 0x1) == 1;
                let p = ((instruction >> 9) & 0x1) == 1;
                let pc_offset = instruction & 0x1ff;

                Instruction::Br(Condition { n, z, p }, pc_offset)
            }

            0x1 => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let sr1 = Register::try_from((instruction >> 6) & 0x7)?;
                let immediate_flag = ((instruction >> 5) & 0x1) == 0x1;

                if immediate_flag {
                    let imm5 = instruction & 0x1f;
                    Instruction::AddImm(dr, sr1, imm5)
                } else {
                    let sr2 = Register::try_from(instruction & 0x7)?;
                    Instruction::Add(dr, sr1, sr2)
                }
            }

            0x2 => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let pc_offset = instruction & 0x1ff;

                Instruction::Ld(dr, pc_offset)
            }

            0x3 => {
                let sr = Register::try_from((instruction >> 9) & 0x7)?;
                let pc_offset = instruction & 0x1ff;

                Instruction::St(sr, pc_offset)
            }

            0x4 => {
                let use_pc_offset = ((instruction >> 11) & 1) == 1;

                if use_pc_offset {
                    let pc_offset = instruction & 0x7ff;
                    Instruction::Jsr(pc_offset)
                } else {
                    let base_r = Register::try_from((instruction >> 6) & 0x7)?;
                    Instruction::Jsrr(base_r)
                }
            }

            0x5 => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let sr1 = Register::try_from((instruction >> 6) & 0x7)?;
                let immediate_flag = ((instruction >> 5) & 1) == 1;

                if immediate_flag {
                    let imm5 = instruction & 0x1f;
                    Instruction::AndImm(dr, sr1, imm5)
                } else {
                    let sr2 = Register::try_from(instruction & 0x7)?;
                    Instruction::And(dr, sr1, sr2)
                }
            }

            0x6 => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let base_r = Register::try_from((instruction >> 6) & 0x7)?;
                let offset = instruction & 0x3f;

                Instruction::Ldr(dr, base_r, offset)
            }

            0x7 => {
                let sr = Register::try_from((instruction >> 9) & 0x7)?;
                let base_r = Register::try_from((instruction >> 6) & 0x7)?;
                let offset = instruction & 0x3f;

                Instruction::Str(sr, base_r, offset)
            }

            0x8 => Instruction::Rti,

            0x9 => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let sr = Register::try_from((instruction >> 6) & 0x7)?;

                Instruction::Not(dr, sr)
            }

            0xa => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let pc_offset = instruction & 0x1ff;

                Instruction::Ldi(dr, pc_offset)
            }

            0xb => {
                let sr = Register::try_from((instruction >> 9) & 0x7)?;
                let pc_offset = instruction & 0x1ff;

                Instruction::Sti(sr, pc_offset)
            }

            0xc => {
                let base_r = Register::try_from((instruction >> 6) & 0x7)?;

                Instruction::Jmp(base_r)
            }

            0xd => Instruction::Reserved,

            0xe => {
                let dr = Register::try_from((instruction >> 9) & 0x7)?;
                let pc_offset = instruction & 0x1ff;

                Instruction::Lea(dr, pc_offset)
            }

            0xf => {
                let trap_vector = TrapVector::try_from(instruction & 0xff)?;

                Instruction::Trap(trap_vector)
            }

            _ => unreachable!("opcode is only ever 4 bits: {:#06b}", opcode),
        };

        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_add_register_mode() {
        let instruction = Instruction::decode(0b0001_001_010_0_00_011).unwrap();

        match instruction {
            Instruction::Add(dr, sr1, sr2) => {
                assert_eq!(dr, Register::R1);
                assert_eq!(sr1, Register::R2);
                assert_eq!(sr2, Register::R3);
            }
            other => panic!("expected Add, got {:?}", other),
        }
    }

    #[test]
    fn decode_add_immediate_mode() {
        // ADD R1, R1, #1
        let instruction = Instruction::decode(0x1261).unwrap();

        match instruction {
            Instruction::AddImm(dr, sr1, imm5) => {
                assert_eq!(dr, Register::R1);
                assert_eq!(sr1, Register::R1);
                assert_eq!(imm5, 0x01);
            }
            other => panic!("expected AddImm, got {:?}", other),
        }
    }

    #[test]
    fn decode_jsr_long_form() {
        let instruction = Instruction::decode(0x4802).unwrap();

        match instruction {
            Instruction::Jsr(offset) => assert_eq!(offset, 0x002),
            other => panic!("expected Jsr, got {:?}", other),
        }
    }

    #[test]
    fn decode_jsrr_register_form() {
        let instruction = Instruction::decode(0b0100_0_00_011_000000).unwrap();

        match instruction {
            Instruction::Jsrr(base_r) => assert_eq!(base_r, Register::R3),
            other => panic!("expected Jsrr, got {:?}", other),
        }
    }

    #[test]
    fn decode_reserved_and_rti() {
        assert!(matches!(Instruction::decode(0xD000).unwrap(), Instruction::Reserved));
        assert!(matches!(Instruction::decode(0x8000).unwrap(), Instruction::Rti));
    }

    #[test]
    fn decode_unknown_trap_is_an_error() {
        let err = Instruction::decode(0xF0AA).unwrap_err();

        assert!(matches!(err, VmError::UnknownTrap(0xAA)));
    }

    #[test]
    fn decode_ret_is_jmp_with_r7() {
        let instruction = Instruction::decode(0xC1C0).unwrap();

        match instruction {
            Instruction::Jmp(base_r) => assert_eq!(base_r, Register::R7),
            other => panic!("expected Jmp, got {:?}", other),
        }
    }
}
