//! Minimal ELF builder for 32-bit RISC-V test fixtures.
//!
//! [`build`] wraps an opaque code payload in a static little-endian
//! RV32 executable with a single `PT_LOAD` segment (R+X). [`ElfBuilder`]
//! is a small instruction accumulator on top of it for hand-assembled
//! programs.
//!
//! ```text
//! 0x00  ELF header       52 bytes
//! 0x34  program header   32 bytes
//! 0x54  code             len(code) bytes
//! ```
//!
//! # Example
//!
//! ```
//! use rvfix::elf::rv32::*;
//! use rvfix::elf::ElfBuilder;
//!
//! let mut e = ElfBuilder::new();
//! e.emit(addi(17, 0, 10)) // a7 = 10
//!     .emit(ecall());
//! let image = e.build(0, 0);
//! assert_eq!(image.len(), 84 + 8);
//! ```

#[macro_use]
mod macros;
pub mod reader;
pub mod rv32;

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, ParseError, Result};

pub use reader::{FileHeader, ParsedImage, ProgramHeader};

// ── Identification ──────────────────────────────────────────────────────

pub const ELFMAG: [u8; 4] = [0x7f, b'E', b'L', b'F'];
pub const EI_NIDENT: usize = 16;
pub const EI_CLASS: usize = 4;
pub const EI_DATA: usize = 5;
pub const EI_VERSION: usize = 6;
pub const ELFCLASS32: u8 = 1;
pub const ELFDATA2LSB: u8 = 1;
pub const EV_CURRENT: u32 = 1;

// ── File header ─────────────────────────────────────────────────────────

pub const ET_EXEC: u16 = 2;
pub const EM_RISCV: u16 = 0xF3;
/// `e_flags`. No float ABI or RVC bits are claimed for the fixtures.
pub const ELF_FLAGS: u32 = 0;

pub const ELF32_EHDR_SIZE: u16 = 52;
pub const ELF32_PHDR_SIZE: u16 = 32;
/// Written to `e_shentsize` even though no section headers follow.
pub const ELF32_SHDR_SIZE: u16 = 40;

// ── Program header ──────────────────────────────────────────────────────

pub const PT_LOAD: u32 = 1;
pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;
pub const SEGMENT_FLAGS: u32 = PF_R | PF_X;
pub const SEGMENT_ALIGN: u32 = 4;

/// File offset of the program header table (`e_phoff`).
pub const PHDR_OFFSET: u32 = ELF32_EHDR_SIZE as u32;
/// File offset of the code payload (`p_offset`).
pub const CODE_OFFSET: u32 = PHDR_OFFSET + ELF32_PHDR_SIZE as u32;

/// Largest payload whose end offset still fits a 32-bit file offset.
pub const MAX_CODE_LEN: usize = (u32::MAX - CODE_OFFSET) as usize;

/// Optional limits checked by [`build_checked`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_code_len: Option<usize>,
}

/// A complete, immutable ELF image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfImage {
    bytes: Vec<u8>,
    entry: u32,
    load_address: u32,
}

/// Serialize `code` into a single-segment RV32 executable.
///
/// The segment is mapped at `load_address` (both `p_vaddr` and `p_paddr`)
/// and execution starts at `entry`. Neither is checked against the code.
/// An empty payload yields an 84-byte image with a zero-length segment.
///
/// Payloads longer than [`MAX_CODE_LEN`] cannot be described by a 32-bit
/// program header; use [`build_checked`] when the length is not known to
/// be small.
pub fn build(code: &[u8], entry: u32, load_address: u32) -> ElfImage {
    debug_assert!(code.len() <= MAX_CODE_LEN, "code does not fit a 32-bit image");
    let code_len = code.len() as u32;
    let mut elf = Vec::with_capacity(CODE_OFFSET as usize + code.len());

    // ── ELF header (52 bytes) ───────────────────────────────────────
    elf.extend_from_slice(&ELFMAG); // e_ident magic
    elf.push(ELFCLASS32); // EI_CLASS
    elf.push(ELFDATA2LSB); // EI_DATA
    elf.push(EV_CURRENT as u8); // EI_VERSION
    elf.resize(EI_NIDENT, 0); // padding
    elf.extend_from_slice(&ET_EXEC.to_le_bytes()); // e_type
    elf.extend_from_slice(&EM_RISCV.to_le_bytes()); // e_machine
    elf.extend_from_slice(&EV_CURRENT.to_le_bytes()); // e_version
    elf.extend_from_slice(&entry.to_le_bytes()); // e_entry
    elf.extend_from_slice(&PHDR_OFFSET.to_le_bytes()); // e_phoff
    elf.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
    elf.extend_from_slice(&ELF_FLAGS.to_le_bytes()); // e_flags
    elf.extend_from_slice(&ELF32_EHDR_SIZE.to_le_bytes()); // e_ehsize
    elf.extend_from_slice(&ELF32_PHDR_SIZE.to_le_bytes()); // e_phentsize
    elf.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
    elf.extend_from_slice(&ELF32_SHDR_SIZE.to_le_bytes()); // e_shentsize
    elf.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    elf.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
    debug_assert_eq!(elf.len(), PHDR_OFFSET as usize);

    // ── Program header (32 bytes) ───────────────────────────────────
    elf.extend_from_slice(&PT_LOAD.to_le_bytes()); // p_type
    elf.extend_from_slice(&CODE_OFFSET.to_le_bytes()); // p_offset
    elf.extend_from_slice(&load_address.to_le_bytes()); // p_vaddr
    elf.extend_from_slice(&load_address.to_le_bytes()); // p_paddr
    elf.extend_from_slice(&code_len.to_le_bytes()); // p_filesz
    elf.extend_from_slice(&code_len.to_le_bytes()); // p_memsz
    elf.extend_from_slice(&SEGMENT_FLAGS.to_le_bytes()); // p_flags
    elf.extend_from_slice(&SEGMENT_ALIGN.to_le_bytes()); // p_align
    debug_assert_eq!(elf.len(), CODE_OFFSET as usize);

    // ── Code payload ────────────────────────────────────────────────
    elf.extend_from_slice(code);

    ElfImage {
        bytes: elf,
        entry,
        load_address,
    }
}

/// Like [`build`], but rejects payloads that exceed `limits` or that a
/// 32-bit image cannot describe.
pub fn build_checked(
    code: &[u8],
    entry: u32,
    load_address: u32,
    limits: &ImageLimits,
) -> Result<ElfImage> {
    if code.len() > MAX_CODE_LEN {
        return Err(Error::InvalidInput(format!(
            "code is {} bytes, a 32-bit image holds at most {MAX_CODE_LEN}",
            code.len()
        )));
    }
    if let Some(max) = limits.max_code_len {
        if code.len() > max {
            return Err(Error::InvalidInput(format!(
                "code is {} bytes, limit is {max}",
                code.len()
            )));
        }
    }
    Ok(build(code, entry, load_address))
}

impl ElfImage {
    /// Parse a serialized image. Only the layout produced by [`build`] is
    /// accepted.
    pub fn parse(bytes: &[u8]) -> std::result::Result<ParsedImage, ParseError> {
        reader::parse(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: even an empty payload carries both headers.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The embedded payload.
    pub fn code(&self) -> &[u8] {
        &self.bytes[CODE_OFFSET as usize..]
    }

    pub fn entry(&self) -> u32 {
        self.entry
    }

    pub fn load_address(&self) -> u32 {
        self.load_address
    }

    /// Persist the image at `path`.
    ///
    /// The bytes go to a sibling `<path>.tmp` first, which is synced and
    /// then renamed over `path`. If any step fails the temporary file is
    /// removed, so `path` holds either its previous contents or the full
    /// image.
    ///
    /// The temporary file is created exclusively: if something already
    /// exists at `<path>.tmp` the write fails with `AlreadyExists` and
    /// neither that entry nor `path` is touched.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = tmp_path_for(path);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .map_err(|err| Error::io(path, err))?;

        let written = write_synced(file, &self.bytes).and_then(|()| fs::rename(&tmp_path, path));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {cleanup}", tmp_path.display());
                }
            }
            return Err(Error::io(path, err));
        }

        debug!(
            "Wrote {} ({} bytes, entry=0x{:08x}, load=0x{:08x})",
            path.display(),
            self.len(),
            self.entry,
            self.load_address
        );
        Ok(())
    }
}

impl AsRef<[u8]> for ElfImage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_synced(mut file: File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()
}

/// Accumulates 32-bit instruction words, then wraps them in an
/// [`ElfImage`] via [`build`].
#[derive(Debug, Clone, Default)]
pub struct ElfBuilder {
    code: Vec<u8>,
}

impl ElfBuilder {
    /// Create a new, empty builder.
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    /// Emit a single instruction word (little-endian).
    pub fn emit(&mut self, insn: u32) -> &mut Self {
        self.code.extend_from_slice(&insn.to_le_bytes());
        self
    }

    /// Current byte offset into the code.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Reserve one instruction slot for a forward branch. Returns its
    /// offset, to be filled in with [`ElfBuilder::patch`].
    pub fn emit_placeholder(&mut self) -> usize {
        let at = self.offset();
        self.emit(0);
        at
    }

    /// Overwrite the instruction at `at`.
    ///
    /// # Panics
    /// If `at` does not name a previously emitted word.
    pub fn patch(&mut self, at: usize, insn: u32) {
        self.code[at..at + 4].copy_from_slice(&insn.to_le_bytes());
    }

    /// PC-relative byte offset from the instruction at `from` to `to`.
    pub fn branch_offset(from: usize, to: usize) -> i32 {
        to as i32 - from as i32
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }

    /// Wrap the accumulated code in an ELF image.
    pub fn build(&self, entry: u32, load_address: u32) -> ElfImage {
        build(&self.code, entry, load_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: [u8; 4] = [0x93, 0x05, 0x50, 0x00];

    fn u16_at(bytes: &[u8], off: usize) -> u16 {
        u16::from_le_bytes([bytes[off], bytes[off + 1]])
    }

    fn u32_at(bytes: &[u8], off: usize) -> u32 {
        u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rvfix-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_scenario_a_layout() {
        let image = build(&SCENARIO_A, 0, 0);
        let bytes = image.as_bytes();

        assert_eq!(bytes.len(), 88);
        assert_eq!(&bytes[0x54..0x58], &SCENARIO_A);
        assert_eq!(&bytes[0x1C..0x20], &[0x34, 0, 0, 0]);
        assert_eq!(image.code(), &SCENARIO_A);
    }

    #[test]
    fn test_identity_and_header_fields() {
        let bytes = build(&SCENARIO_A, 0x80, 0x80).into_bytes();

        assert_eq!(&bytes[..16], b"\x7fELF\x01\x01\x01\0\0\0\0\0\0\0\0\0");
        assert_eq!(u16_at(&bytes, 0x10), ET_EXEC);
        assert_eq!(u16_at(&bytes, 0x12), 0x00F3);
        assert_eq!(u32_at(&bytes, 0x14), 1);
        assert_eq!(u32_at(&bytes, 0x18), 0x80);
        assert_eq!(u32_at(&bytes, 0x1C), 52);
        assert_eq!(u32_at(&bytes, 0x20), 0);
        assert_eq!(u32_at(&bytes, 0x24), 0);
        assert_eq!(u16_at(&bytes, 0x28), 52);
        assert_eq!(u16_at(&bytes, 0x2A), 32);
        assert_eq!(u16_at(&bytes, 0x2C), 1);
        assert_eq!(u16_at(&bytes, 0x2E), 40);
        assert_eq!(u16_at(&bytes, 0x30), 0);
        assert_eq!(u16_at(&bytes, 0x32), 0);

        assert_eq!(u32_at(&bytes, 0x34), PT_LOAD);
        assert_eq!(u32_at(&bytes, 0x38), 84);
        assert_eq!(u32_at(&bytes, 0x3C), 0x80);
        assert_eq!(u32_at(&bytes, 0x40), 0x80);
        assert_eq!(u32_at(&bytes, 0x44), 4);
        assert_eq!(u32_at(&bytes, 0x48), 4);
        assert_eq!(u32_at(&bytes, 0x4C), 5);
        assert_eq!(u32_at(&bytes, 0x50), 4);
    }

    #[test]
    fn test_length_and_sizes_track_code() {
        for len in [1usize, 3, 4, 17, 256, 4099] {
            let code: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let bytes = build(&code, 0, 0).into_bytes();
            assert_eq!(bytes.len(), 84 + len);
            assert_eq!(u32_at(&bytes, 0x38), 84, "p_offset for len {len}");
            assert_eq!(u32_at(&bytes, 0x44), len as u32, "p_filesz for len {len}");
            assert_eq!(u32_at(&bytes, 0x48), len as u32, "p_memsz for len {len}");
            assert_eq!(&bytes[84..], &code[..]);
        }
    }

    #[test]
    fn test_empty_code_is_allowed() {
        let image = build(&[], 0, 0);
        assert_eq!(image.len(), 84);
        assert!(!image.is_empty());
        assert!(image.code().is_empty());
        assert_eq!(u32_at(image.as_bytes(), 0x44), 0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build(&SCENARIO_A, 0x1000, 0x1000);
        let b = build(&SCENARIO_A, 0x1000, 0x1000);
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_address_only_touches_vaddr_paddr() {
        let base = build(&SCENARIO_A, 0, 0).into_bytes();
        let moved = build(&SCENARIO_A, 0, 0x1000).into_bytes();

        assert_eq!(base.len(), moved.len());
        let changed: Vec<usize> = (0..base.len()).filter(|&i| base[i] != moved[i]).collect();
        assert!(changed
            .iter()
            .all(|&i| (0x3C..0x40).contains(&i) || (0x40..0x44).contains(&i)));
        assert_eq!(u32_at(&moved, 0x3C), 0x1000);
        assert_eq!(u32_at(&moved, 0x40), 0x1000);
    }

    #[test]
    fn test_round_trip_through_reader() {
        let code = [0x13, 0x05, 0xa0, 0x00, 0x73, 0x00, 0x00, 0x00];
        let image = build(&code, 0x2004, 0x2000);
        let parsed = ElfImage::parse(image.as_bytes()).unwrap();

        assert_eq!(parsed.header.e_entry, 0x2004);
        assert_eq!(parsed.segment.p_vaddr, 0x2000);
        assert_eq!(parsed.segment.p_paddr, 0x2000);
        assert_eq!(parsed.code, code);
    }

    #[test]
    fn test_build_checked_limits() {
        let limits = ImageLimits {
            max_code_len: Some(4),
        };
        assert!(build_checked(&SCENARIO_A, 0, 0, &limits).is_ok());

        let err = build_checked(&[0; 8], 0, 0, &limits).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let image = build_checked(&[0; 8], 0, 0, &ImageLimits::default()).unwrap();
        assert_eq!(image, build(&[0; 8], 0, 0));
    }

    #[test]
    fn test_max_code_len_ends_at_last_file_offset() {
        assert_eq!(CODE_OFFSET as usize + MAX_CODE_LEN, u32::MAX as usize);
        let image = build_checked(&[], 0, 0, &ImageLimits { max_code_len: Some(0) });
        assert_eq!(image.unwrap().len(), CODE_OFFSET as usize);
    }

    #[test]
    fn test_builder_emit_and_patch() {
        let mut e = ElfBuilder::new();
        e.emit(0x00a00513);
        let slot = e.emit_placeholder();
        e.emit(0x00000073);
        assert_eq!(e.offset(), 12);
        assert_eq!(&e.code()[4..8], &[0, 0, 0, 0]);

        e.patch(slot, 0xdeadbeef);
        assert_eq!(&e.code()[4..8], &0xdeadbeefu32.to_le_bytes());

        assert_eq!(ElfBuilder::branch_offset(16, 8), -8);
        assert_eq!(ElfBuilder::branch_offset(4, 16), 12);

        let image = e.build(0, 0);
        assert_eq!(image.code(), e.code());
    }

    #[test]
    fn test_write_to_persists_exact_bytes() {
        let dir = scratch_dir("write");
        let path = dir.join("scenario.elf");
        let image = build(&SCENARIO_A, 0, 0);

        image.write_to(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), image.as_bytes());
        assert!(!tmp_path_for(&path).exists());

        // Overwriting replaces the previous image wholesale.
        let bigger = build(&[0xAA; 64], 0, 0);
        bigger.write_to(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), bigger.as_bytes());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_to_missing_directory_fails_cleanly() {
        let dir = scratch_dir("missing");
        let path = dir.join("no/such/dir/out.elf");

        let err = build(&SCENARIO_A, 0, 0).write_to(&path).unwrap_err();
        match err {
            Error::Io { path: ref p, .. } => assert_eq!(p, &path),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!path.exists());
        assert!(!tmp_path_for(&path).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_rewrite_keeps_previous_image() {
        let dir = scratch_dir("rewrite");
        let path = dir.join("fixture.elf");
        let original = build(&SCENARIO_A, 0, 0);
        original.write_to(&path).unwrap();

        // A non-empty directory where the temporary file would go.
        let blocker = tmp_path_for(&path);
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let err = build(&[0x13; 16], 0, 0).write_to(&path).unwrap_err();
        assert!(matches!(err, Error::Io { path: ref p, .. } if p == &path));
        assert_eq!(fs::read(&path).unwrap(), original.as_bytes());
        assert!(blocker.is_dir());
        assert_eq!(fs::read(blocker.join("keep")).unwrap(), b"x");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_to_leaves_existing_tmp_file_alone() {
        let dir = scratch_dir("sibling");
        let path = dir.join("out.elf");
        let sibling = tmp_path_for(&path);
        fs::write(&sibling, b"user data").unwrap();

        let err = build(&SCENARIO_A, 0, 0).write_to(&path).unwrap_err();
        match err {
            Error::Io { ref source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists)
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(fs::read(&sibling).unwrap(), b"user data");
        assert!(!path.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_tmp_path_keeps_extension() {
        assert_eq!(
            tmp_path_for(Path::new("out/test.elf")),
            PathBuf::from("out/test.elf.tmp")
        );
    }
}
