use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rvfix",
    about = "Build minimal RV32 ELF images for simulator tests",
    long_about = "Wrap hand-assembled RV32I fixture programs (or any raw code file) in a \
                  single-segment 32-bit RISC-V ELF executable"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write one fixture program as an ELF image
    Build {
        /// Fixture name (see `rvfix list`)
        fixture: String,

        /// Output path [default: the fixture's file name]
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        #[command(flatten)]
        layout: Layout,
    },

    /// Write every fixture under its default file name
    All {
        /// Output directory
        #[arg(short = 'd', long = "dir", default_value = ".")]
        dir: PathBuf,
    },

    /// Wrap a raw code file in an ELF image
    Raw {
        /// File holding the raw machine code
        code: PathBuf,

        /// Output path
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        #[command(flatten)]
        layout: Layout,

        /// Reject code larger than this many bytes
        #[arg(long = "max-size")]
        max_size: Option<usize>,
    },

    /// Print the headers and code of an image
    Inspect {
        /// Image to read
        file: PathBuf,
    },

    /// List the available fixtures
    List,
}

#[derive(clap::Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Entry point address (decimal or 0x hex)
    #[arg(long = "entry", value_parser = parse_address, default_value = "0")]
    pub entry: u32,

    /// Segment load address (decimal or 0x hex)
    #[arg(long = "load-address", value_parser = parse_address, default_value = "0")]
    pub load_address: u32,
}

/// Parse a 32-bit address written in decimal or with a `0x` prefix.
pub fn parse_address(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}
