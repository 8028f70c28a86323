//! Container locator.
//!
//! Finds the section holding the module graph by walking the host
//! executable's own section table. The position of the section varies with
//! every build, so the lookup is always by name, never by offset:
//!
//! - Mach-O: segment `__BUN`, section `__bun` (universal binaries are searched
//!   slice by slice)
//! - ELF, PE and COFF: section `.bun`

use crate::error::{ExtractError, Result};
use crate::io::ExecutableImage;
use object::read::macho::{FatArch, MachOFatFile32, MachOFatFile64};
use object::{BinaryFormat, FileKind, Object, ObjectSection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::{debug, trace};

pub const MACHO_SEGMENT: &str = "__BUN";
pub const MACHO_SECTION: &str = "__bun";
pub const SECTION_NAME: &str = ".bun";

/// Executable format the container was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostFormat {
    Elf,
    MachO,
    Pe,
    Coff,
}

impl HostFormat {
    fn from_object(format: BinaryFormat) -> Option<Self> {
        match format {
            BinaryFormat::Elf => Some(HostFormat::Elf),
            BinaryFormat::MachO => Some(HostFormat::MachO),
            BinaryFormat::Pe => Some(HostFormat::Pe),
            BinaryFormat::Coff => Some(HostFormat::Coff),
            _ => None,
        }
    }

    /// Human-readable name of the section searched for in this format.
    pub fn section_label(&self) -> &'static str {
        match self {
            HostFormat::MachO => "__BUN,__bun",
            _ => SECTION_NAME,
        }
    }
}

impl fmt::Display for HostFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostFormat::Elf => "ELF",
            HostFormat::MachO => "Mach-O",
            HostFormat::Pe => "PE",
            HostFormat::Coff => "COFF",
        };
        f.write_str(s)
    }
}

/// Location of the container inside the executable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    /// Absolute file offset of the section.
    pub offset: u64,
    /// Section size in bytes.
    pub size: u64,
    pub format: HostFormat,
}

impl SectionSpan {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

/// Locate the module graph section in `image`.
///
/// Fails with `MalformedExecutable` when the host headers cannot be parsed and
/// with `ContainerNotFound` when they parse but name no matching section.
pub fn locate(image: &ExecutableImage) -> Result<SectionSpan> {
    let data = image.as_slice();
    let kind = FileKind::parse(data)
        .map_err(|e| ExtractError::MalformedExecutable(format!("unrecognised header: {e}")))?;
    debug!(?kind, size = data.len(), "Locating module graph section");

    let span = match kind {
        FileKind::MachOFat32 => {
            let fat = MachOFatFile32::parse(data).map_err(malformed)?;
            locate_in_fat(data, fat.arches())?
        }
        FileKind::MachOFat64 => {
            let fat = MachOFatFile64::parse(data).map_err(malformed)?;
            locate_in_fat(data, fat.arches())?
        }
        _ => locate_in_object(data, 0)?,
    };

    if span.end() > image.len() {
        return Err(ExtractError::MalformedExecutable(format!(
            "section {:#x}+{:#x} extends past end of file ({:#x})",
            span.offset,
            span.size,
            image.len()
        )));
    }
    debug!(
        offset = span.offset,
        size = span.size,
        format = %span.format,
        "Located module graph section"
    );
    Ok(span)
}

fn malformed(e: object::Error) -> ExtractError {
    ExtractError::MalformedExecutable(e.to_string())
}

/// Search each slice of a universal binary; the first slice carrying the
/// section wins.
fn locate_in_fat<A: FatArch>(data: &[u8], arches: &[A]) -> Result<SectionSpan> {
    for (i, arch) in arches.iter().enumerate() {
        let (base, _) = arch.file_range();
        let slice = arch.data(data).map_err(malformed)?;
        trace!(slice = i, base, size = slice.len(), "Searching fat slice");
        match locate_in_object(slice, base) {
            Ok(span) => return Ok(span),
            Err(e) if e.is_container_missing() => continue,
            Err(e) => return Err(e),
        }
    }
    Err(ExtractError::ContainerNotFound {
        format: HostFormat::MachO,
        section: HostFormat::MachO.section_label(),
    })
}

fn locate_in_object(data: &[u8], base: u64) -> Result<SectionSpan> {
    let file = object::File::parse(data).map_err(malformed)?;
    let format = HostFormat::from_object(file.format()).ok_or_else(|| {
        ExtractError::MalformedExecutable(format!(
            "unsupported host format {:?}",
            file.format()
        ))
    })?;

    let section = match format {
        HostFormat::MachO => file.sections().find(|s| {
            s.name().ok() == Some(MACHO_SECTION)
                && matches!(s.segment_name(), Ok(Some(MACHO_SEGMENT)))
        }),
        _ => file.section_by_name(SECTION_NAME),
    };
    let section = section.ok_or(ExtractError::ContainerNotFound {
        format,
        section: format.section_label(),
    })?;

    let (offset, size) = section.file_range().ok_or_else(|| {
        ExtractError::MalformedExecutable(format!(
            "{} section has no file data",
            format.section_label()
        ))
    })?;
    let in_bounds = offset
        .checked_add(size)
        .is_some_and(|end| end <= data.len() as u64);
    if !in_bounds {
        return Err(ExtractError::MalformedExecutable(format!(
            "{} section {:#x}+{:#x} exceeds image of {:#x} bytes",
            format.section_label(),
            offset,
            size,
            data.len()
        )));
    }

    Ok(SectionSpan {
        offset: base + offset,
        size,
        format,
    })
}
