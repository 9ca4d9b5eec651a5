//! RV32I instruction encoders.
//!
//! All functions are `const fn`: pure bit packing. Registers are plain
//! numbers (`0`–`31`); immediates and branch offsets are signed and masked
//! to their field width, so out-of-range values wrap silently. Branch and
//! jump offsets are in bytes, relative to the instruction itself.

// ── Opcodes ─────────────────────────────────────────────────────────────

pub const OP_LOAD: u32 = 0x03;
pub const OP_IMM: u32 = 0x13;
pub const OP_AUIPC: u32 = 0x17;
pub const OP_STORE: u32 = 0x23;
pub const OP_REG: u32 = 0x33;
pub const OP_LUI: u32 = 0x37;
pub const OP_BRANCH: u32 = 0x63;
pub const OP_JALR: u32 = 0x67;
pub const OP_JAL: u32 = 0x6F;
pub const OP_SYSTEM: u32 = 0x73;

/// `funct7` selecting SUB/SRA over ADD/SRL.
const FUNCT7_ALT: u32 = 0x20;

// ── Base formats ────────────────────────────────────────────────────────

pub const fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    funct7 << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

pub const fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    ((imm as u32) & 0xFFF) << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

pub const fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    ((imm >> 5) & 0x7F) << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | (imm & 0x1F) << 7 | OP_STORE
}

/// Branch format. `offset` must be even; bit 0 is dropped.
pub const fn b_type(offset: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = offset as u32;
    ((imm >> 12) & 0x1) << 31
        | ((imm >> 5) & 0x3F) << 25
        | rs2 << 20
        | rs1 << 15
        | funct3 << 12
        | ((imm >> 1) & 0xF) << 8
        | ((imm >> 11) & 0x1) << 7
        | OP_BRANCH
}

/// Upper-immediate format. `imm20` lands in bits 31:12.
pub const fn u_type(imm20: u32, rd: u32, opcode: u32) -> u32 {
    (imm20 & 0xFFFFF) << 12 | rd << 7 | opcode
}

/// Jump format. `offset` must be even; bit 0 is dropped.
pub const fn j_type(offset: i32, rd: u32) -> u32 {
    let imm = offset as u32;
    ((imm >> 20) & 0x1) << 31
        | ((imm >> 1) & 0x3FF) << 21
        | ((imm >> 11) & 0x1) << 20
        | ((imm >> 12) & 0xFF) << 12
        | rd << 7
        | OP_JAL
}

// ── Immediate arithmetic ────────────────────────────────────────────────

/// `ADDI rd, rs1, imm`.
pub const fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0x0, rd, OP_IMM)
}

/// `SLTI rd, rs1, imm`.
pub const fn slti(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0x2, rd, OP_IMM)
}

/// `XORI rd, rs1, imm`.
pub const fn xori(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0x4, rd, OP_IMM)
}

/// `ORI rd, rs1, imm`.
pub const fn ori(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0x6, rd, OP_IMM)
}

/// `ANDI rd, rs1, imm`.
pub const fn andi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0x7, rd, OP_IMM)
}

/// `MV rd, rs` — encoded as `ADDI rd, rs, 0`.
pub const fn mv(rd: u32, rs: u32) -> u32 {
    addi(rd, rs, 0)
}

/// `NOP` — `ADDI x0, x0, 0`.
pub const fn nop() -> u32 {
    addi(0, 0, 0)
}

// ── Register arithmetic ─────────────────────────────────────────────────

/// `ADD rd, rs1, rs2`.
pub const fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0x0, rd, OP_REG)
}

/// `SUB rd, rs1, rs2`.
pub const fn sub(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(FUNCT7_ALT, rs2, rs1, 0x0, rd, OP_REG)
}

/// `SLT rd, rs1, rs2`.
pub const fn slt(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0x2, rd, OP_REG)
}

/// `XOR rd, rs1, rs2`.
pub const fn xor(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0x4, rd, OP_REG)
}

/// `OR rd, rs1, rs2`.
pub const fn or(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0x6, rd, OP_REG)
}

/// `AND rd, rs1, rs2`.
pub const fn and(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0, rs2, rs1, 0x7, rd, OP_REG)
}

// ── Upper immediates ────────────────────────────────────────────────────

/// `LUI rd, imm20`.
pub const fn lui(rd: u32, imm20: u32) -> u32 {
    u_type(imm20, rd, OP_LUI)
}

/// `AUIPC rd, imm20`.
pub const fn auipc(rd: u32, imm20: u32) -> u32 {
    u_type(imm20, rd, OP_AUIPC)
}

// ── Loads / stores ──────────────────────────────────────────────────────

/// `LW rd, off(rs1)`.
pub const fn lw(rd: u32, rs1: u32, off: i32) -> u32 {
    i_type(off, rs1, 0x2, rd, OP_LOAD)
}

/// `LBU rd, off(rs1)`.
pub const fn lbu(rd: u32, rs1: u32, off: i32) -> u32 {
    i_type(off, rs1, 0x4, rd, OP_LOAD)
}

/// `SW rs2, off(rs1)`.
pub const fn sw(rs2: u32, rs1: u32, off: i32) -> u32 {
    s_type(off, rs2, rs1, 0x2)
}

/// `SB rs2, off(rs1)`.
pub const fn sb(rs2: u32, rs1: u32, off: i32) -> u32 {
    s_type(off, rs2, rs1, 0x0)
}

// ── Control flow ────────────────────────────────────────────────────────

/// `BEQ rs1, rs2, offset`.
pub const fn beq(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0x0)
}

/// `BNE rs1, rs2, offset`.
pub const fn bne(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0x1)
}

/// `BLT rs1, rs2, offset`.
pub const fn blt(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0x4)
}

/// `BGE rs1, rs2, offset`.
pub const fn bge(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0x5)
}

/// `JAL rd, offset`.
pub const fn jal(rd: u32, offset: i32) -> u32 {
    j_type(offset, rd)
}

/// `JALR rd, off(rs1)`.
pub const fn jalr(rd: u32, rs1: u32, off: i32) -> u32 {
    i_type(off, rs1, 0x0, rd, OP_JALR)
}

// ── System ──────────────────────────────────────────────────────────────

/// `ECALL`. The target simulator exits when `a7` holds 10.
pub const fn ecall() -> u32 {
    OP_SYSTEM
}

/// Syscall number the target simulator treats as exit.
pub const SYS_EXIT: i32 = 10;

/// The all-zero word. Not a valid RV32I instruction; the target simulator
/// stops on it.
pub const fn halt() -> u32 {
    0
}
