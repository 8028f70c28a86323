//! Common test utilities and helpers.
//!
//! Host executables are synthesised with `object::write`, so the locator runs
//! against real ELF, Mach-O and COFF section tables without checked-in
//! samples.

#![allow(dead_code)]

use bunfs_extract::graph::builder::{ContainerBuilder, ModuleEntry};
use bunfs_extract::graph::extract::BYTECODE_CJS_PREFIX;
use bunfs_extract::graph::Loader;
use object::write::{Object as ObjectWriter, StandardSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind};
use std::io::Write;
use tempfile::NamedTempFile;

/// Object file of `format` with some code plus `payload` in `segment,name`.
pub fn host_with_section(
    format: BinaryFormat,
    segment: &[u8],
    name: &[u8],
    payload: &[u8],
) -> Vec<u8> {
    let mut obj = ObjectWriter::new(format, Architecture::X86_64, Endianness::Little);
    let text = obj.section_id(StandardSection::Text);
    obj.append_section_data(text, &[0x90; 64], 16);

    let section = obj.add_section(segment.to_vec(), name.to_vec(), SectionKind::ReadOnlyData);
    obj.append_section_data(section, payload, 1);
    obj.write().expect("write host object")
}

pub fn elf_with(payload: &[u8]) -> Vec<u8> {
    host_with_section(BinaryFormat::Elf, b"", b".bun", payload)
}

pub fn macho_with(payload: &[u8]) -> Vec<u8> {
    host_with_section(BinaryFormat::MachO, b"__BUN", b"__bun", payload)
}

pub fn coff_with(payload: &[u8]) -> Vec<u8> {
    host_with_section(BinaryFormat::Coff, b"", b".bun", payload)
}

/// Universal Mach-O wrapping `slices`, each aligned to 4 KiB.
pub fn fat_macho(slices: &[Vec<u8>]) -> Vec<u8> {
    const ALIGN: usize = 4096;
    let mut out = Vec::new();
    out.extend_from_slice(&0xcafe_babe_u32.to_be_bytes());
    out.extend_from_slice(&(slices.len() as u32).to_be_bytes());

    let mut offset = ALIGN;
    let mut placements = Vec::new();
    for slice in slices {
        out.extend_from_slice(&0x0100_0007_u32.to_be_bytes()); // CPU_TYPE_X86_64
        out.extend_from_slice(&3u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(slice.len() as u32).to_be_bytes());
        out.extend_from_slice(&12u32.to_be_bytes());
        placements.push(offset);
        offset += slice.len().div_ceil(ALIGN) * ALIGN;
    }
    for (slice, at) in slices.iter().zip(placements) {
        out.resize(at, 0);
        out.extend_from_slice(slice);
    }
    out
}

/// An entry script behind a CJS bytecode prefix, followed by a native add-on.
pub fn index_and_addon() -> ContainerBuilder {
    ContainerBuilder::new()
        .module(ModuleEntry::new(
            "index.js",
            [BYTECODE_CJS_PREFIX, b"console.log(1)"].concat(),
            Loader::Js,
        ))
        .module(ModuleEntry::new(
            "addon.node",
            vec![0xde, 0xad, 0xbe, 0xef],
            Loader::Napi,
        ))
}

pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

pub fn patch_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
