mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Command, Layout};
use log::{debug, info, warn};
use rvfix::elf::{self, reader, ImageLimits, ParsedImage};
use rvfix::fixtures;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    match args.command {
        Command::Build {
            fixture,
            output,
            layout,
        } => build_fixture(&fixture, output, layout),
        Command::All { dir } => build_all(&dir),
        Command::Raw {
            code,
            output,
            layout,
            max_size,
        } => build_raw(&code, &output, layout, max_size),
        Command::Inspect { file } => inspect(&file),
        Command::List => {
            for fixture in fixtures::all() {
                println!("{:<12} {:<16} {}", fixture.name, fixture.file_name, fixture.description);
            }
            Ok(())
        }
    }
}

fn build_fixture(name: &str, output: Option<PathBuf>, layout: Layout) -> Result<()> {
    let fixture = fixtures::find(name)?;
    let path = output.unwrap_or_else(|| PathBuf::from(fixture.file_name));

    let image = fixture.image(layout.entry, layout.load_address);
    image
        .write_to(&path)
        .with_context(|| format!("Failed to write fixture {name}"))?;

    println!("Created {} ({} bytes)", path.display(), image.len());
    Ok(())
}

fn build_all(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {dir:?}"))?;

    for fixture in fixtures::all() {
        let path = dir.join(fixture.file_name);
        let image = fixture.image(0, 0);
        image
            .write_to(&path)
            .with_context(|| format!("Failed to write fixture {}", fixture.name))?;
        println!("Created {} ({} bytes)", path.display(), image.len());
    }
    info!("Wrote {} fixtures to {dir:?}", fixtures::all().len());
    Ok(())
}

fn build_raw(code_path: &Path, output: &Path, layout: Layout, max_size: Option<usize>) -> Result<()> {
    let code = fs::read(code_path).with_context(|| format!("Failed to read {code_path:?}"))?;
    debug!("Read {} bytes of code from {code_path:?}", code.len());
    if code.len() % 4 != 0 {
        warn!(
            "{code_path:?} is {} bytes, not a whole number of 32-bit instructions",
            code.len()
        );
    }

    let limits = ImageLimits {
        max_code_len: max_size,
    };
    let image = elf::build_checked(&code, layout.entry, layout.load_address, &limits)
        .with_context(|| format!("Cannot wrap {code_path:?}"))?;
    image
        .write_to(output)
        .context("Failed to write image")?;

    println!("Created {} ({} bytes)", output.display(), image.len());
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let parsed = reader::read_file(path).with_context(|| format!("Failed to load {path:?}"))?;
    dump(&parsed);
    Ok(())
}

fn dump(image: &ParsedImage) {
    let h = &image.header;
    let p = &image.segment;

    println!("ELF header");
    println!("  type:        {}", h.e_type);
    println!("  machine:     0x{:x}", h.e_machine);
    println!("  version:     {}", h.e_version);
    println!("  entry:       0x{:08x}", h.e_entry);
    println!("  phoff:       {}", h.e_phoff);
    println!("  flags:       0x{:x}", h.e_flags);
    println!(
        "  sizes:       ehdr={} phent={} phnum={} shent={} shnum={}",
        h.e_ehsize, h.e_phentsize, h.e_phnum, h.e_shentsize, h.e_shnum
    );
    println!("Program header");
    println!("  type:        {}", p.p_type);
    println!("  offset:      {}", p.p_offset);
    println!("  vaddr:       0x{:08x}", p.p_vaddr);
    println!("  paddr:       0x{:08x}", p.p_paddr);
    println!("  filesz:      {}", p.p_filesz);
    println!("  memsz:       {}", p.p_memsz);
    println!("  flags:       0x{:x}", p.p_flags);
    println!("  align:       {}", p.p_align);
    println!("Code ({} bytes)", image.code.len());

    for (i, chunk) in image.code.chunks(4).enumerate() {
        let addr = p.p_vaddr.wrapping_add(i as u32 * 4);
        if let [a, b, c, d] = *chunk {
            println!("  {addr:08x}:  {:08x}", u32::from_le_bytes([a, b, c, d]));
        } else {
            let tail: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            println!("  {addr:08x}:  {}", tail.join(" "));
        }
    }
}
