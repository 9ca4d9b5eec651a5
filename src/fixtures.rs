//! Hand-assembled RV32I fixture programs.
//!
//! Each fixture is a small program whose final register state a simulator
//! test can check. They stop either on the all-zero halt word or on an
//! exit `ecall` (`a7 = 10`). All are meant to be loaded at address 0 with
//! entry 0, since branch targets are relative but the `memory` fixture
//! uses absolute addresses.

use crate::elf::rv32::{bge, jal};
use crate::elf::{self, ElfBuilder, ElfImage};
use crate::error::{Error, Result};

/// A named fixture program.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub name: &'static str,
    /// Default output file name.
    pub file_name: &'static str,
    /// What the program computes and the expected register state.
    pub description: &'static str,
    assemble: fn() -> ElfBuilder,
}

impl Fixture {
    /// The raw code payload.
    pub fn code(&self) -> Vec<u8> {
        (self.assemble)().into_code()
    }

    /// The payload wrapped as an ELF image at `entry`/`load_address`.
    pub fn image(&self, entry: u32, load_address: u32) -> ElfImage {
        elf::build(&self.code(), entry, load_address)
    }
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        name: "countdown",
        file_name: "test.elf",
        description: "x1 counts down from 3 by x2 = 1; halts with x1 = 0",
        assemble: countdown,
    },
    Fixture {
        name: "sum",
        file_name: "final_test.elf",
        description: "sum of 1..=5; halts with a1 = 15, a0 = 0",
        assemble: sum,
    },
    Fixture {
        name: "call",
        file_name: "test_func.elf",
        description: "a0 = 10, call a function adding 5, then add 1; halts with a0 = 16",
        assemble: call,
    },
    Fixture {
        name: "arithmetic",
        file_name: "arithmetic.elf",
        description: "add/sub/or/and of 5 and 3; exits with x12..x15 = 8, 2, 7, 1",
        assemble: arithmetic,
    },
    Fixture {
        name: "memory",
        file_name: "memory.elf",
        description: "store 0x12345678 at 100, reload; exits with x7 = 0x12345678, x8 = 0x56",
        assemble: memory,
    },
    Fixture {
        name: "fibonacci",
        file_name: "fibonacci.elf",
        description: "iterative fib(10); exits with a0 = 55",
        assemble: fibonacci,
    },
];

/// Every fixture, in a stable order.
pub fn all() -> &'static [Fixture] {
    FIXTURES
}

/// Look up a fixture by name.
pub fn find(name: &str) -> Result<&'static Fixture> {
    FIXTURES
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| Error::UnknownFixture(name.to_string()))
}

// ══════════════════════════════════════════════════════════════════════════
// Programs
// ══════════════════════════════════════════════════════════════════════════

fn countdown() -> ElfBuilder {
    let mut e = ElfBuilder::new();
    addi!(e, x1, x0, 3);
    addi!(e, x2, x0, 1);
    let top = e.offset();
    sub!(e, x1, x1, x2);
    bne!(e, x1, x0, ElfBuilder::branch_offset(e.offset(), top));
    halt!(e);
    e
}

fn sum() -> ElfBuilder {
    let mut e = ElfBuilder::new();
    li!(e, a0, 5); // n
    li!(e, a1, 0); // sum
    let top = e.offset();
    add!(e, a1, a1, a0);
    addi!(e, a0, a0, -1);
    bne!(e, a0, zero, ElfBuilder::branch_offset(e.offset(), top));
    halt!(e);
    e
}

fn call() -> ElfBuilder {
    let mut e = ElfBuilder::new();
    li!(e, a0, 10);
    let call_site = e.emit_placeholder();
    addi!(e, a0, a0, 1);
    halt!(e);

    let add_five = e.offset();
    addi!(e, a0, a0, 5);
    ret!(e);

    e.patch(
        call_site,
        jal(reg!(ra), ElfBuilder::branch_offset(call_site, add_five)),
    );
    e
}

fn arithmetic() -> ElfBuilder {
    let mut e = ElfBuilder::new();
    li!(e, a0, 5);
    li!(e, a1, 3);
    add!(e, a2, a0, a1);
    sub!(e, a3, a0, a1);
    or!(e, a4, a0, a1);
    and!(e, a5, a0, a1);
    exit!(e);
    e
}

fn memory() -> ElfBuilder {
    let mut e = ElfBuilder::new();
    lui!(e, t1, 0x12345);
    addi!(e, t1, t1, 0x678);
    sw!(e, t1, 100(zero));
    lw!(e, t2, 100(zero));
    // Little-endian: byte 101 is 0x56.
    lbu!(e, s0, 101(zero));
    exit!(e);
    e
}

fn fibonacci() -> ElfBuilder {
    let mut e = ElfBuilder::new();
    li!(e, a0, 10); // n
    li!(e, t0, 0); // a
    li!(e, t1, 1); // b
    li!(e, t2, 0); // i

    let top = e.offset();
    let exit_branch = e.emit_placeholder();
    add!(e, s0, t1, t0);
    mv!(e, t0, t1);
    mv!(e, t1, s0);
    addi!(e, t2, t2, 1);
    beq!(e, zero, zero, ElfBuilder::branch_offset(e.offset(), top));

    let done = e.offset();
    e.patch(
        exit_branch,
        bge(reg!(t2), reg!(a0), ElfBuilder::branch_offset(exit_branch, done)),
    );
    mv!(e, a0, t0);
    exit!(e);
    e
}
