//! Error types shared by the image builder, the reader and the fixtures.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The caller supplied something the builder refuses to encode, such as
    /// a payload larger than the configured limit.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading or persisting an image failed. `path` is the destination (or
    /// source) the caller asked for, not any temporary file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed ELF image: {0}")]
    Malformed(#[from] ParseError),

    #[error("unknown fixture `{0}`")]
    UnknownFixture(String),
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reasons an image is rejected by [`crate::elf::reader::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("image is {0} bytes, too short for the ELF header")]
    TooShort(usize),
    #[error("invalid magic number")]
    InvalidMagic,
    #[error("unsupported ELF class {0}, only 32-bit images are read")]
    UnsupportedClass(u8),
    #[error("unsupported data encoding {0}, only little-endian images are read")]
    UnsupportedEndian(u8),
    #[error("unsupported ELF version {0}")]
    UnsupportedVersion(u32),
    #[error("unsupported file type {0}, expected ET_EXEC")]
    UnsupportedFileType(u16),
    #[error("unsupported machine 0x{0:x}, expected RISC-V")]
    UnsupportedMachine(u16),
    #[error("invalid e_ehsize {0}")]
    InvalidEhSize(u16),
    #[error("invalid e_phentsize {0}")]
    InvalidPhEntSize(u16),
    #[error("expected exactly one program header, found {0}")]
    InvalidPhNum(u16),
    #[error("program header table at 0x{0:x} extends past end of image")]
    ProgramHeaderOutOfBounds(u32),
    #[error("segment type {0} is not PT_LOAD")]
    NotLoadable(u32),
    #[error("segment file size {filesz} differs from memory size {memsz}")]
    SizeMismatch { filesz: u32, memsz: u32 },
    #[error("segment at 0x{offset:x}+0x{size:x} extends past end of image")]
    SegmentOutOfBounds { offset: u32, size: u32 },
}
