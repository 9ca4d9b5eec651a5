//! Minimal 32-bit RISC-V ELF images for simulator test fixtures.
//!
//! [`elf::build`] turns a raw code payload into a loadable executable with
//! one `PT_LOAD` segment; [`elf::reader`] reads such an image back. The
//! [`fixtures`] module holds the hand-assembled programs the simulator
//! tests run.

pub mod error;
#[macro_use]
pub mod elf;
pub mod fixtures;

pub use error::{Error, ParseError, Result};
