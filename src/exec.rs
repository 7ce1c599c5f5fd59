//! Per-mnemonic execution semantics (C8).
//!
//! Grounded on the teacher's `platform/rv32i.rs` (one function per mnemonic,
//! each taking the architectural state and the decoded fields it needs) and
//! `hart/platform/rv32zicsr.rs` for the six CSR instructions' exact
//! read-before-write and skip-on-no-effect rules. Every function here is
//! called from exactly one `dispatch` match arm; none of them re-decode or
//! re-validate their opcode/funct3/funct7 — `dispatch` has already done that.

use thiserror::Error;

use crate::bits::{as_signed, as_unsigned, get_bits, sign_extend};
use crate::hart::Hart;
use crate::memory::MemoryFault;
use crate::register_file::RegisterOperator;

#[derive(Debug, Error)]
pub enum ExecutionFault {
    #[error(transparent)]
    Memory(#[from] MemoryFault),
}

fn op(hart: &mut Hart) -> RegisterOperator<'_> {
    RegisterOperator::new(&mut hart.registers)
}

fn imm_i(imm12: u32) -> i32 {
    as_signed(sign_extend(imm12, 11))
}

// --- U-type ---

pub fn lui(hart: &mut Hart, rd: u8, imm20: u32) {
    op(hart).write(rd, imm20 << 12);
}

pub fn auipc(hart: &mut Hart, rd: u8, imm20: u32) {
    let value = hart.pc.current().wrapping_add(imm20 << 12);
    op(hart).write(rd, value);
}

// --- Jumps ---

pub fn jal(hart: &mut Hart, rd: u8, imm20: u32) {
    let link = hart.pc.next();
    op(hart).write(rd, link);
    hart.pc.add_offset(as_signed(sign_extend(imm20, 20)));
}

pub fn jalr(hart: &mut Hart, rd: u8, rs1: u8, imm12: u32) {
    let target = op(hart).get(rs1).wrapping_add(as_unsigned(imm_i(imm12)));
    let link = hart.pc.next();
    op(hart).write(rd, link);
    hart.pc.load_absolute(target);
}

// --- Branches ---

pub fn branch(hart: &mut Hart, funct3: u32, rs1: u8, rs2: u8, imm12: u32) {
    use crate::opcodes::*;
    let a = op(hart).get(rs1);
    let b = op(hart).get(rs2);
    let taken = match funct3 {
        FUNCT3_BEQ => a == b,
        FUNCT3_BNE => a != b,
        FUNCT3_BLT => as_signed(a) < as_signed(b),
        FUNCT3_BGE => as_signed(a) >= as_signed(b),
        FUNCT3_BLTU => a < b,
        FUNCT3_BGEU => a >= b,
        _ => unreachable!("dispatch validated funct3"),
    };
    if taken {
        hart.pc.add_offset(as_signed(sign_extend(imm12, 12)));
    }
}

// --- Loads / stores ---

pub fn load(
    hart: &mut Hart,
    funct3: u32,
    rd: u8,
    rs1: u8,
    imm12: u32,
) -> Result<(), ExecutionFault> {
    use crate::opcodes::*;
    let addr = hart.registers.get(rs1).wrapping_add(as_unsigned(imm_i(imm12)));
    let mut registers = RegisterOperator::new(&mut hart.registers);
    match funct3 {
        FUNCT3_W => registers.load_word(rd, addr, &hart.memory)?,
        FUNCT3_H => registers.load_halfword(rd, addr, &hart.memory)?,
        FUNCT3_HU => registers.load_halfword_unsigned(rd, addr, &hart.memory)?,
        FUNCT3_B => registers.load_byte(rd, addr, &hart.memory)?,
        FUNCT3_BU => registers.load_byte_unsigned(rd, addr, &hart.memory)?,
        _ => unreachable!("dispatch validated funct3"),
    }
    Ok(())
}

pub fn store(
    hart: &mut Hart,
    funct3: u32,
    rs1: u8,
    rs2: u8,
    imm12: u32,
) -> Result<(), ExecutionFault> {
    use crate::opcodes::*;
    let addr = hart.registers.get(rs1).wrapping_add(as_unsigned(imm_i(imm12)));
    let registers = RegisterOperator::new(&mut hart.registers);
    match funct3 {
        FUNCT3_W => registers.store_word(rs2, addr, &mut hart.memory)?,
        FUNCT3_H => registers.store_halfword(rs2, addr, &mut hart.memory)?,
        FUNCT3_B => registers.store_byte(rs2, addr, &mut hart.memory)?,
        _ => unreachable!("dispatch validated funct3"),
    }
    Ok(())
}

// --- Register-immediate arithmetic ---

pub fn imm_arith(hart: &mut Hart, funct3: u32, imm12: u32, rd: u8, rs1: u8) {
    use crate::opcodes::*;
    let mut registers = op(hart);
    match funct3 {
        FUNCT3_ADDI => registers.add_imm(rd, rs1, as_unsigned(imm_i(imm12))),
        FUNCT3_SLTI => registers.set_less_than_imm(rd, rs1, imm_i(imm12)),
        FUNCT3_SLTIU => registers.set_less_than_imm_unsigned(rd, rs1, as_unsigned(imm_i(imm12))),
        FUNCT3_XORI => registers.xor_imm(rd, rs1, as_unsigned(imm_i(imm12))),
        FUNCT3_ORI => registers.or_imm(rd, rs1, as_unsigned(imm_i(imm12))),
        FUNCT3_ANDI => registers.and_imm(rd, rs1, as_unsigned(imm_i(imm12))),
        FUNCT3_SLLI => registers.left_shift_imm(rd, rs1, get_bits(imm12, 0, 4)),
        FUNCT3_SRLI_SRAI => {
            let arithmetic = get_bits(imm12, 10, 10) != 0;
            registers.right_shift_imm(rd, rs1, get_bits(imm12, 0, 4), arithmetic)
        }
        _ => unreachable!("dispatch validated funct3"),
    }
}

// --- Register-register arithmetic ---

pub fn reg_arith(hart: &mut Hart, funct3: u32, funct7: u32, rd: u8, rs1: u8, rs2: u8) {
    use crate::opcodes::*;
    let mut registers = op(hart);
    match (funct3, funct7) {
        (FUNCT3_ADD_SUB, FUNCT7_ADD) => registers.add(rd, rs1, rs2),
        (FUNCT3_ADD_SUB, FUNCT7_SUB) => registers.sub(rd, rs1, rs2),
        (FUNCT3_SLL, _) => registers.left_shift_imm(rd, rs1, registers_shamt(&registers, rs2)),
        (FUNCT3_SLT, _) => registers.set_less_than(rd, rs1, rs2),
        (FUNCT3_SLTU, _) => registers.set_less_than_unsigned(rd, rs1, rs2),
        (FUNCT3_XOR, _) => registers.xor(rd, rs1, rs2),
        (FUNCT3_SRL_SRA, FUNCT7_SRL) => {
            let amt = registers_shamt(&registers, rs2);
            registers.right_shift_imm(rd, rs1, amt, false)
        }
        (FUNCT3_SRL_SRA, FUNCT7_SRA) => {
            let amt = registers_shamt(&registers, rs2);
            registers.right_shift_imm(rd, rs1, amt, true)
        }
        (FUNCT3_OR, _) => registers.or(rd, rs1, rs2),
        (FUNCT3_AND, _) => registers.and(rd, rs1, rs2),
        _ => unreachable!("dispatch validated funct3/funct7"),
    }
}

fn registers_shamt(registers: &RegisterOperator<'_>, rs2: u8) -> u32 {
    get_bits(registers.get(rs2), 0, 4)
}

// --- System: ecall/ebreak ---

pub fn ecall(hart: &mut Hart) {
    hart.env.execute_call();
}

pub fn ebreak(hart: &mut Hart) {
    hart.env.debug_break();
}

// --- Zicsr ---
//
// Every CSR op follows the same read-then-conditionally-write shape. The
// "conditionally" differs per op: CSRRW/CSRRWI always write; CSRRS/CSRRC and
// their immediate forms only write when the operand is nonzero (writing zero
// would be a no-op, and RISC-V forbids the side effect in that case). The
// read itself is skipped entirely when rd is x0, matching the privileged
// spec's "shall not read the CSR" rule for that case.

pub fn csrrw(hart: &mut Hart, rd: u8, csr: u16, rs1: u8) {
    let rs1_value = hart.registers.get(rs1);
    if rd != 0 {
        let old = hart.csrs.get(csr);
        hart.csrs.set(csr, rs1_value);
        op(hart).write(rd, old);
    } else {
        hart.csrs.set(csr, rs1_value);
    }
}

pub fn csrrs(hart: &mut Hart, rd: u8, csr: u16, rs1: u8) {
    let old = hart.csrs.get(csr);
    let mask = hart.registers.get(rs1);
    if rs1 != 0 {
        hart.csrs.set(csr, old | mask);
    }
    op(hart).write(rd, old);
}

pub fn csrrc(hart: &mut Hart, rd: u8, csr: u16, rs1: u8) {
    let old = hart.csrs.get(csr);
    let mask = hart.registers.get(rs1);
    if rs1 != 0 {
        hart.csrs.set(csr, old & !mask);
    }
    op(hart).write(rd, old);
}

pub fn csrrwi(hart: &mut Hart, rd: u8, csr: u16, uimm: u32) {
    if rd != 0 {
        let old = hart.csrs.get(csr);
        hart.csrs.set(csr, uimm);
        op(hart).write(rd, old);
    } else {
        hart.csrs.set(csr, uimm);
    }
}

pub fn csrrsi(hart: &mut Hart, rd: u8, csr: u16, uimm: u32) {
    let old = hart.csrs.get(csr);
    if uimm != 0 {
        hart.csrs.set(csr, old | uimm);
    }
    op(hart).write(rd, old);
}

pub fn csrrci(hart: &mut Hart, rd: u8, csr: u16, uimm: u32) {
    let old = hart.csrs.get(csr);
    if uimm != 0 {
        hart.csrs.set(csr, old & !uimm);
    }
    op(hart).write(rd, old);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hart::Hart;

    fn hart() -> Hart {
        Hart::with_noop_environment(256, 0)
    }

    #[test]
    fn lui_loads_upper_immediate() {
        let mut h = hart();
        lui(&mut h, 5, 0xABCDE);
        assert_eq!(h.registers.get(5), 0xABCD_E000);
    }

    #[test]
    fn jal_links_and_redirects_pc() {
        let mut h = hart();
        h.pc = crate::pc::InstructionManager::new(0x100);
        jal(&mut h, 1, 8);
        assert_eq!(h.registers.get(1), 0x104);
        assert_eq!(h.pc.next(), 0x108);
    }

    #[test]
    fn beq_taken_scenario_from_spec() {
        let mut h = hart();
        h.pc = crate::pc::InstructionManager::new(0x200);
        branch(&mut h, crate::opcodes::FUNCT3_BEQ, 1, 1, 16);
        assert_eq!(h.pc.next(), 0x210);
    }

    #[test]
    fn store_then_load_word_round_trips() {
        let mut h = hart();
        op(&mut h).add_imm(1, 0, 0xdead_beef);
        store(&mut h, crate::opcodes::FUNCT3_W, 0, 1, 4).unwrap();
        load(&mut h, crate::opcodes::FUNCT3_W, 2, 0, 4).unwrap();
        assert_eq!(h.registers.get(2), 0xdead_beef);
    }

    #[test]
    fn load_out_of_range_faults() {
        let mut h = hart();
        let err = load(&mut h, crate::opcodes::FUNCT3_W, 1, 0, 1000);
        assert!(err.is_err());
    }

    #[test]
    fn addi_adds_sign_extended_immediate() {
        let mut h = hart();
        imm_arith(&mut h, crate::opcodes::FUNCT3_ADDI, 0xffe, 1, 0); // -2
        assert_eq!(as_signed(h.registers.get(1)), -2);
    }

    #[test]
    fn srai_preserves_sign_srli_does_not() {
        let mut h = hart();
        op(&mut h).add_imm(1, 0, 0xffff_fff0); // -16
        imm_arith(&mut h, crate::opcodes::FUNCT3_SRLI_SRAI, (1 << 10) | 2, 2, 1);
        assert_eq!(as_signed(h.registers.get(2)), -4);
        imm_arith(&mut h, crate::opcodes::FUNCT3_SRLI_SRAI, 2, 3, 1);
        assert_eq!(h.registers.get(3), 0x3fff_fffc);
    }

    #[test]
    fn reg_arith_add_vs_sub() {
        let mut h = hart();
        op(&mut h).add_imm(1, 0, 3);
        op(&mut h).add_imm(2, 0, 5);
        reg_arith(&mut h, crate::opcodes::FUNCT3_ADD_SUB, crate::opcodes::FUNCT7_SUB, 3, 1, 2);
        assert_eq!(h.registers.get(3), 0xffff_fffe);
    }

    #[test]
    fn csrrw_writes_new_value_and_returns_old() {
        let mut h = hart();
        h.csrs.set(0x100, 7);
        op(&mut h).add_imm(1, 0, 42);
        csrrw(&mut h, 2, 0x100, 1);
        assert_eq!(h.registers.get(2), 7);
        assert_eq!(h.csrs.get(0x100), 42);
    }

    #[test]
    fn csrrs_with_x0_only_reads() {
        let mut h = hart();
        h.csrs.set(0x100, 7);
        csrrs(&mut h, 1, 0x100, 0);
        assert_eq!(h.registers.get(1), 7);
        assert_eq!(h.csrs.get(0x100), 7);
    }

    #[test]
    fn csrrci_clears_bits_from_immediate() {
        let mut h = hart();
        h.csrs.set(0x100, 0b1111);
        csrrci(&mut h, 1, 0x100, 0b0101);
        assert_eq!(h.registers.get(1), 0b1111);
        assert_eq!(h.csrs.get(0x100), 0b1010);
    }
}
