//! Reads images back into their header fields.
//!
//! Only the layout written by [`super::build`] is accepted: 32-bit,
//! little-endian, RISC-V, `ET_EXEC`, exactly one `PT_LOAD` entry whose
//! file and memory sizes agree.

use std::fs;
use std::path::Path;

use super::{
    EI_CLASS, EI_DATA, EI_NIDENT, EI_VERSION, ELF32_EHDR_SIZE, ELF32_PHDR_SIZE, ELFCLASS32,
    ELFDATA2LSB, ELFMAG, EM_RISCV, ET_EXEC, EV_CURRENT, PT_LOAD,
};
use crate::error::{Error, ParseError};

/// ELF file header fields, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub e_ident: [u8; EI_NIDENT],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// The single program header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
    pub p_align: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImage {
    pub header: FileHeader,
    pub segment: ProgramHeader,
    pub code: Vec<u8>,
}

impl ParsedImage {
    pub fn entry(&self) -> u32 {
        self.header.e_entry
    }

    pub fn load_address(&self) -> u32 {
        self.segment.p_vaddr
    }
}

/// Little-endian field cursor over a byte slice. Callers bounds-check the
/// whole record up front.
struct Fields<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> Fields<'a> {
    fn at(data: &'a [u8], off: usize) -> Self {
        Self { data, off }
    }

    fn u16(&mut self) -> u16 {
        let d = &self.data[self.off..self.off + 2];
        self.off += 2;
        u16::from_le_bytes([d[0], d[1]])
    }

    fn u32(&mut self) -> u32 {
        let d = &self.data[self.off..self.off + 4];
        self.off += 4;
        u32::from_le_bytes([d[0], d[1], d[2], d[3]])
    }
}

/// Parse and validate a serialized image.
pub fn parse(data: &[u8]) -> Result<ParsedImage, ParseError> {
    let header = parse_file_header(data)?;
    let segment = parse_program_header(data, header.e_phoff)?;

    if segment.p_type != PT_LOAD {
        return Err(ParseError::NotLoadable(segment.p_type));
    }
    if segment.p_filesz != segment.p_memsz {
        return Err(ParseError::SizeMismatch {
            filesz: segment.p_filesz,
            memsz: segment.p_memsz,
        });
    }
    let start = segment.p_offset as usize;
    let end = start
        .checked_add(segment.p_filesz as usize)
        .filter(|&end| end <= data.len())
        .ok_or(ParseError::SegmentOutOfBounds {
            offset: segment.p_offset,
            size: segment.p_filesz,
        })?;

    Ok(ParsedImage {
        header,
        segment,
        code: data[start..end].to_vec(),
    })
}

/// Read `path` and parse it.
pub fn read_file(path: impl AsRef<Path>) -> crate::Result<ParsedImage> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|err| Error::io(path, err))?;
    Ok(parse(&data)?)
}

fn parse_file_header(data: &[u8]) -> Result<FileHeader, ParseError> {
    if data.len() < ELF32_EHDR_SIZE as usize {
        return Err(ParseError::TooShort(data.len()));
    }
    if data[..ELFMAG.len()] != ELFMAG {
        return Err(ParseError::InvalidMagic);
    }
    if data[EI_CLASS] != ELFCLASS32 {
        return Err(ParseError::UnsupportedClass(data[EI_CLASS]));
    }
    if data[EI_DATA] != ELFDATA2LSB {
        return Err(ParseError::UnsupportedEndian(data[EI_DATA]));
    }
    if data[EI_VERSION] as u32 != EV_CURRENT {
        return Err(ParseError::UnsupportedVersion(data[EI_VERSION] as u32));
    }

    let mut e_ident = [0u8; EI_NIDENT];
    e_ident.copy_from_slice(&data[..EI_NIDENT]);

    let mut f = Fields::at(data, EI_NIDENT);
    let header = FileHeader {
        e_ident,
        e_type: f.u16(),
        e_machine: f.u16(),
        e_version: f.u32(),
        e_entry: f.u32(),
        e_phoff: f.u32(),
        e_shoff: f.u32(),
        e_flags: f.u32(),
        e_ehsize: f.u16(),
        e_phentsize: f.u16(),
        e_phnum: f.u16(),
        e_shentsize: f.u16(),
        e_shnum: f.u16(),
        e_shstrndx: f.u16(),
    };

    if header.e_type != ET_EXEC {
        return Err(ParseError::UnsupportedFileType(header.e_type));
    }
    if header.e_machine != EM_RISCV {
        return Err(ParseError::UnsupportedMachine(header.e_machine));
    }
    if header.e_version != EV_CURRENT {
        return Err(ParseError::UnsupportedVersion(header.e_version));
    }
    if header.e_ehsize != ELF32_EHDR_SIZE {
        return Err(ParseError::InvalidEhSize(header.e_ehsize));
    }
    if header.e_phentsize != ELF32_PHDR_SIZE {
        return Err(ParseError::InvalidPhEntSize(header.e_phentsize));
    }
    if header.e_phnum != 1 {
        return Err(ParseError::InvalidPhNum(header.e_phnum));
    }
    Ok(header)
}

fn parse_program_header(data: &[u8], phoff: u32) -> Result<ProgramHeader, ParseError> {
    let start = phoff as usize;
    if start
        .checked_add(ELF32_PHDR_SIZE as usize)
        .map_or(true, |end| end > data.len())
    {
        return Err(ParseError::ProgramHeaderOutOfBounds(phoff));
    }

    let mut f = Fields::at(data, start);
    Ok(ProgramHeader {
        p_type: f.u32(),
        p_offset: f.u32(),
        p_vaddr: f.u32(),
        p_paddr: f.u32(),
        p_filesz: f.u32(),
        p_memsz: f.u32(),
        p_flags: f.u32(),
        p_align: f.u32(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elf::{build, PF_R, PF_X};

    fn sample() -> Vec<u8> {
        build(&[0x93, 0x00, 0x30, 0x00, 0, 0, 0, 0], 0x100, 0x100).into_bytes()
    }

    #[test]
    fn test_parse_fields() {
        let parsed = parse(&sample()).unwrap();

        assert_eq!(parsed.header.e_type, ET_EXEC);
        assert_eq!(parsed.header.e_machine, EM_RISCV);
        assert_eq!(parsed.header.e_phoff, 52);
        assert_eq!(parsed.header.e_shentsize, 40);
        assert_eq!(parsed.entry(), 0x100);
        assert_eq!(parsed.load_address(), 0x100);
        assert_eq!(parsed.segment.p_offset, 84);
        assert_eq!(parsed.segment.p_flags, PF_R | PF_X);
        assert_eq!(parsed.segment.p_align, 4);
        assert_eq!(parsed.code, vec![0x93, 0x00, 0x30, 0x00, 0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_empty_segment() {
        let parsed = parse(build(&[], 0, 0).as_bytes()).unwrap();
        assert!(parsed.code.is_empty());
        assert_eq!(parsed.segment.p_filesz, 0);
    }

    #[test]
    fn test_reject_short_and_bad_magic() {
        assert_eq!(parse(&[0x7f, b'E']), Err(ParseError::TooShort(2)));

        let mut data = sample();
        data[1] = b'X';
        assert_eq!(parse(&data), Err(ParseError::InvalidMagic));
    }

    #[test]
    fn test_reject_wrong_class_and_machine() {
        let mut data = sample();
        data[EI_CLASS] = 2;
        assert_eq!(parse(&data), Err(ParseError::UnsupportedClass(2)));

        let mut data = sample();
        data[0x12..0x14].copy_from_slice(&0xB7u16.to_le_bytes());
        assert_eq!(parse(&data), Err(ParseError::UnsupportedMachine(0xB7)));
    }

    #[test]
    fn test_reject_truncated_segment() {
        let mut data = sample();
        data.truncate(88);
        assert_eq!(
            parse(&data),
            Err(ParseError::SegmentOutOfBounds { offset: 84, size: 8 })
        );

        let data = sample();
        assert_eq!(
            parse(&data[..60]),
            Err(ParseError::ProgramHeaderOutOfBounds(52))
        );
    }

    #[test]
    fn test_reject_size_mismatch() {
        let mut data = sample();
        data[0x48..0x4C].copy_from_slice(&16u32.to_le_bytes());
        assert_eq!(
            parse(&data),
            Err(ParseError::SizeMismatch { filesz: 8, memsz: 16 })
        );
    }

    #[test]
    fn test_read_file_missing() {
        let err = read_file("/nonexistent/rvfix/input.elf").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
