//! RV32I assembler macro DSL.
//!
//! Instruction-level macros eliminate `e.emit(fn(...))` boilerplate so the
//! fixture programs read like assembly. Each macro takes the
//! [`ElfBuilder`](super::ElfBuilder) first and returns it, like `emit`.
//!
//! Register arguments accept both `x0`–`x31` and ABI names (`zero`, `ra`,
//! `sp`, `a0`, `t1`, ...), resolved at expansion time by `reg!`.
//! Memory operands are written `off(base)`, as in assembly.

#![allow(unused_macros)]

// ── Register name → number mapping ──────────────────────────────────────

/// Map an RV32 register name to its number.
macro_rules! reg {
    (x0) => {
        0
    };
    (zero) => {
        0
    };
    (x1) => {
        1
    };
    (ra) => {
        1
    };
    (x2) => {
        2
    };
    (sp) => {
        2
    };
    (x3) => {
        3
    };
    (gp) => {
        3
    };
    (x4) => {
        4
    };
    (tp) => {
        4
    };
    (x5) => {
        5
    };
    (t0) => {
        5
    };
    (x6) => {
        6
    };
    (t1) => {
        6
    };
    (x7) => {
        7
    };
    (t2) => {
        7
    };
    (x8) => {
        8
    };
    (s0) => {
        8
    };
    (fp) => {
        8
    };
    (x9) => {
        9
    };
    (s1) => {
        9
    };
    (x10) => {
        10
    };
    (a0) => {
        10
    };
    (x11) => {
        11
    };
    (a1) => {
        11
    };
    (x12) => {
        12
    };
    (a2) => {
        12
    };
    (x13) => {
        13
    };
    (a3) => {
        13
    };
    (x14) => {
        14
    };
    (a4) => {
        14
    };
    (x15) => {
        15
    };
    (a5) => {
        15
    };
    (x16) => {
        16
    };
    (a6) => {
        16
    };
    (x17) => {
        17
    };
    (a7) => {
        17
    };
    (x18) => {
        18
    };
    (s2) => {
        18
    };
    (x19) => {
        19
    };
    (s3) => {
        19
    };
    (x20) => {
        20
    };
    (s4) => {
        20
    };
    (x21) => {
        21
    };
    (s5) => {
        21
    };
    (x22) => {
        22
    };
    (s6) => {
        22
    };
    (x23) => {
        23
    };
    (s7) => {
        23
    };
    (x24) => {
        24
    };
    (s8) => {
        24
    };
    (x25) => {
        25
    };
    (s9) => {
        25
    };
    (x26) => {
        26
    };
    (s10) => {
        26
    };
    (x27) => {
        27
    };
    (s11) => {
        27
    };
    (x28) => {
        28
    };
    (t3) => {
        28
    };
    (x29) => {
        29
    };
    (t4) => {
        29
    };
    (x30) => {
        30
    };
    (t5) => {
        30
    };
    (x31) => {
        31
    };
    (t6) => {
        31
    };
}

// ── Immediate arithmetic ────────────────────────────────────────────────

/// `ADDI rd, rs1, imm`.
macro_rules! addi {
    ($e:expr, $rd:tt, $rs1:tt, $imm:expr) => {
        $e.emit($crate::elf::rv32::addi(reg!($rd), reg!($rs1), $imm))
    };
}

/// `LI rd, imm` — small immediates only, encoded as `ADDI rd, zero, imm`.
macro_rules! li {
    ($e:expr, $rd:tt, $imm:expr) => {
        $e.emit($crate::elf::rv32::addi(reg!($rd), 0, $imm))
    };
}

/// `MV rd, rs`.
macro_rules! mv {
    ($e:expr, $rd:tt, $rs:tt) => {
        $e.emit($crate::elf::rv32::mv(reg!($rd), reg!($rs)))
    };
}

// ── Register arithmetic ─────────────────────────────────────────────────

/// `ADD rd, rs1, rs2`.
macro_rules! add {
    ($e:expr, $rd:tt, $rs1:tt, $rs2:tt) => {
        $e.emit($crate::elf::rv32::add(reg!($rd), reg!($rs1), reg!($rs2)))
    };
}

/// `SUB rd, rs1, rs2`.
macro_rules! sub {
    ($e:expr, $rd:tt, $rs1:tt, $rs2:tt) => {
        $e.emit($crate::elf::rv32::sub(reg!($rd), reg!($rs1), reg!($rs2)))
    };
}

/// `AND rd, rs1, rs2`.
macro_rules! and {
    ($e:expr, $rd:tt, $rs1:tt, $rs2:tt) => {
        $e.emit($crate::elf::rv32::and(reg!($rd), reg!($rs1), reg!($rs2)))
    };
}

/// `OR rd, rs1, rs2`.
macro_rules! or {
    ($e:expr, $rd:tt, $rs1:tt, $rs2:tt) => {
        $e.emit($crate::elf::rv32::or(reg!($rd), reg!($rs1), reg!($rs2)))
    };
}

// ── Upper immediates / memory ───────────────────────────────────────────

/// `LUI rd, imm20`.
macro_rules! lui {
    ($e:expr, $rd:tt, $imm:expr) => {
        $e.emit($crate::elf::rv32::lui(reg!($rd), $imm))
    };
}

/// `LW rd, off(base)`.
macro_rules! lw {
    ($e:expr, $rd:tt, $off:literal($base:tt)) => {
        $e.emit($crate::elf::rv32::lw(reg!($rd), reg!($base), $off))
    };
}

/// `LBU rd, off(base)`.
macro_rules! lbu {
    ($e:expr, $rd:tt, $off:literal($base:tt)) => {
        $e.emit($crate::elf::rv32::lbu(reg!($rd), reg!($base), $off))
    };
}

/// `SW rs, off(base)`.
macro_rules! sw {
    ($e:expr, $rs:tt, $off:literal($base:tt)) => {
        $e.emit($crate::elf::rv32::sw(reg!($rs), reg!($base), $off))
    };
}

// ── Control flow ────────────────────────────────────────────────────────
// Offsets are byte offsets from the branch itself; see
// `ElfBuilder::branch_offset`.

/// `BEQ rs1, rs2, offset`.
macro_rules! beq {
    ($e:expr, $rs1:tt, $rs2:tt, $off:expr) => {
        $e.emit($crate::elf::rv32::beq(reg!($rs1), reg!($rs2), $off))
    };
}

/// `BNE rs1, rs2, offset`.
macro_rules! bne {
    ($e:expr, $rs1:tt, $rs2:tt, $off:expr) => {
        $e.emit($crate::elf::rv32::bne(reg!($rs1), reg!($rs2), $off))
    };
}

/// `BGE rs1, rs2, offset`.
macro_rules! bge {
    ($e:expr, $rs1:tt, $rs2:tt, $off:expr) => {
        $e.emit($crate::elf::rv32::bge(reg!($rs1), reg!($rs2), $off))
    };
}

/// `JAL rd, offset`.
macro_rules! jal {
    ($e:expr, $rd:tt, $off:expr) => {
        $e.emit($crate::elf::rv32::jal(reg!($rd), $off))
    };
}

/// `JALR rd, off(base)`.
macro_rules! jalr {
    ($e:expr, $rd:tt, $off:literal($base:tt)) => {
        $e.emit($crate::elf::rv32::jalr(reg!($rd), reg!($base), $off))
    };
}

/// `RET` — `JALR zero, 0(ra)`.
macro_rules! ret {
    ($e:expr) => {
        $e.emit($crate::elf::rv32::jalr(0, 1, 0))
    };
}

// ── High-level ──────────────────────────────────────────────────────────

/// All-zero stop word.
macro_rules! halt {
    ($e:expr) => {
        $e.emit($crate::elf::rv32::halt())
    };
}

/// `li a7, SYS_EXIT; ecall`.
macro_rules! exit {
    ($e:expr) => {
        li!($e, a7, $crate::elf::rv32::SYS_EXIT);
        $e.emit($crate::elf::rv32::ecall())
    };
}

#[cfg(test)]
mod tests {
    use crate::elf::rv32::*;
    use crate::elf::ElfBuilder;

    #[test]
    fn test_register_names() {
        assert_eq!(reg!(zero), 0);
        assert_eq!(reg!(x0), 0);
        assert_eq!(reg!(ra), 1);
        assert_eq!(reg!(fp), reg!(s0));
        assert_eq!(reg!(a0), 10);
        assert_eq!(reg!(a7), 17);
        assert_eq!(reg!(s11), 27);
        assert_eq!(reg!(t6), 31);
        assert_eq!(reg!(x31), 31);
    }

    #[test]
    fn test_macros_match_encoders() {
        let mut e = ElfBuilder::new();
        addi!(e, a0, zero, 10);
        sw!(e, t1, 100(zero));
        lbu!(e, s0, 101(x0));
        bne!(e, x1, x0, -4);
        ret!(e);
        exit!(e);

        let mut expect = ElfBuilder::new();
        expect
            .emit(addi(10, 0, 10))
            .emit(sw(6, 0, 100))
            .emit(lbu(8, 0, 101))
            .emit(bne(1, 0, -4))
            .emit(jalr(0, 1, 0))
            .emit(addi(17, 0, SYS_EXIT))
            .emit(ecall());
        assert_eq!(e.code(), expect.code());
    }
}
