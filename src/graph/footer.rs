//! Footer parser.
//!
//! The container ends with a 32-byte footer followed by the 16-byte trailer
//! magic. Every field is addressed backwards from the end of the section, so
//! whatever precedes the data region (a length header on Mach-O, alignment
//! padding elsewhere) is tolerated without being understood.

use crate::error::{ExtractError, Result};
use crate::graph::types::{
    DescriptorLayout, GraphFlags, Region, StringPointer, FOOTER_SIZE, TAIL_SIZE, TRAILER,
};
use crate::graph::utils::{escape_bytes, LeRead};
use crate::io::ExecutableImage;
use crate::locate::SectionSpan;
use serde::Serialize;
use tracing::{debug, warn};

// Field offsets inside the footer record.
const BYTE_COUNT: usize = 0;
const MODULES_PTR: usize = 8;
const ENTRY_POINT_ID: usize = 16;
const EXEC_ARGV_PTR: usize = 20;
const FLAGS: usize = 28;

/// Decoded container footer with its derived, validated regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FooterRecord {
    pub trailer: [u8; 16],
    /// Length of the data region that ends where the footer starts.
    pub byte_count: u64,
    /// Metadata array, relative to the data region.
    pub modules_ptr: StringPointer,
    pub entry_point_id: u32,
    /// Compile-time `execArgv`, relative to the data region.
    pub exec_argv_ptr: StringPointer,
    #[serde(serialize_with = "serialize_flags")]
    pub flags: GraphFlags,
    /// Data region, relative to the section start.
    pub data_region: Region,
    /// Metadata region, relative to the section start.
    pub metadata_region: Region,
    pub layout: DescriptorLayout,
    pub module_count: usize,
}

fn serialize_flags<S: serde::Serializer>(
    flags: &GraphFlags,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u32(flags.bits())
}

/// Borrow the located section out of the image.
pub(crate) fn section_bytes<'a>(image: &'a ExecutableImage, span: &SectionSpan) -> Result<&'a [u8]> {
    let start = usize::try_from(span.offset).ok();
    let end = usize::try_from(span.end()).ok();
    start
        .zip(end)
        .and_then(|(s, e)| image.as_slice().get(s..e))
        .ok_or_else(|| {
            ExtractError::MalformedExecutable(format!(
                "section {:#x}+{:#x} lies outside the image",
                span.offset, span.size
            ))
        })
}

/// Parse the footer, inferring the descriptor layout from the metadata length.
pub fn parse_footer(image: &ExecutableImage, span: &SectionSpan) -> Result<FooterRecord> {
    parse_footer_with(image, span, None)
}

/// Parse the footer, optionally pinning the descriptor layout.
pub fn parse_footer_with(
    image: &ExecutableImage,
    span: &SectionSpan,
    layout: Option<DescriptorLayout>,
) -> Result<FooterRecord> {
    let section = section_bytes(image, span)?;
    let size = span.size;
    let trailer_len = TRAILER.len() as u64;

    if size < trailer_len {
        return Err(ExtractError::TruncatedFooter {
            size,
            needed: TAIL_SIZE,
        });
    }

    // Trailer first: cheapest way to reject a foreign section.
    let trailer_start = (size - trailer_len) as usize;
    let trailer = &section[trailer_start..];
    if trailer != TRAILER {
        warn!(offset = span.end() - trailer_len, "Trailer magic mismatch");
        return Err(ExtractError::BadTrailer {
            offset: span.end() - trailer_len,
            found: escape_bytes(trailer),
        });
    }

    if size < TAIL_SIZE {
        return Err(ExtractError::TruncatedFooter {
            size,
            needed: TAIL_SIZE,
        });
    }

    let footer_start = (size - TAIL_SIZE) as usize;
    let footer = &section[footer_start..footer_start + FOOTER_SIZE as usize];
    let short = || ExtractError::CorruptFooter("footer record is short".into());

    let byte_count = footer.read_u64_le(BYTE_COUNT).ok_or_else(short)?;
    let modules_ptr = footer.read_pointer(MODULES_PTR).ok_or_else(short)?;
    let entry_point_id = footer.read_u32_le(ENTRY_POINT_ID).ok_or_else(short)?;
    let exec_argv_ptr = footer.read_pointer(EXEC_ARGV_PTR).ok_or_else(short)?;
    let flags = GraphFlags::from_bits_retain(footer.read_u32_le(FLAGS).ok_or_else(short)?);

    debug!(
        byte_count,
        modules.offset = modules_ptr.offset,
        modules.length = modules_ptr.length,
        entry_point_id,
        flags = flags.bits(),
        "Decoded footer"
    );

    let available = size - TAIL_SIZE;
    if byte_count > available {
        return Err(ExtractError::CorruptFooter(format!(
            "data region of {byte_count} bytes exceeds the {available} bytes before the footer"
        )));
    }
    let data_region = Region {
        offset: available - byte_count,
        length: byte_count,
    };

    if !modules_ptr.fits_within(byte_count) {
        return Err(ExtractError::CorruptFooter(format!(
            "metadata region {}+{} exceeds data region of {byte_count} bytes",
            modules_ptr.offset, modules_ptr.length
        )));
    }
    let metadata_region = Region {
        offset: data_region.offset + modules_ptr.offset as u64,
        length: modules_ptr.length as u64,
    };

    let metadata_len = metadata_region.length;
    let layout = match layout {
        Some(pinned) if metadata_len % pinned.record_size() as u64 == 0 => pinned,
        Some(pinned) => {
            return Err(ExtractError::CorruptFooter(format!(
                "metadata length {metadata_len} is not a multiple of the {}-byte {:?} record",
                pinned.record_size(),
                pinned
            )))
        }
        None => DescriptorLayout::infer(metadata_len).ok_or_else(|| {
            ExtractError::CorruptFooter(format!(
                "metadata length {metadata_len} matches no known descriptor width"
            ))
        })?,
    };
    let module_count = (metadata_len / layout.record_size() as u64) as usize;

    if module_count > 0 && entry_point_id as usize >= module_count {
        return Err(ExtractError::CorruptFooter(format!(
            "entry point #{entry_point_id} out of range for {module_count} modules"
        )));
    }

    if !exec_argv_ptr.fits_within(byte_count) {
        return Err(ExtractError::CorruptFooter(format!(
            "execArgv {}+{} exceeds data region of {byte_count} bytes",
            exec_argv_ptr.offset, exec_argv_ptr.length
        )));
    }

    let mut trailer_bytes = [0u8; 16];
    trailer_bytes.copy_from_slice(trailer);

    Ok(FooterRecord {
        trailer: trailer_bytes,
        byte_count,
        modules_ptr,
        entry_point_id,
        exec_argv_ptr,
        flags,
        data_region,
        metadata_region,
        layout,
        module_count,
    })
}

/// Decode the compile-time `execArgv` string, if one was embedded.
pub fn exec_argv(
    image: &ExecutableImage,
    span: &SectionSpan,
    footer: &FooterRecord,
) -> Result<Option<String>> {
    if footer.exec_argv_ptr.is_empty() {
        return Ok(None);
    }
    let data = data_region_bytes(image, span, footer)?;
    let start = footer.exec_argv_ptr.offset as usize;
    let end = footer.exec_argv_ptr.end() as usize;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| ExtractError::CorruptFooter("execArgv outside data region".into()))?;
    let argv = std::str::from_utf8(bytes)
        .map_err(|e| ExtractError::CorruptFooter(format!("execArgv is not UTF-8: {e}")))?;
    Ok(Some(argv.to_string()))
}

/// Borrow the data region out of the image.
pub(crate) fn data_region_bytes<'a>(
    image: &'a ExecutableImage,
    span: &SectionSpan,
    footer: &FooterRecord,
) -> Result<&'a [u8]> {
    let section = section_bytes(image, span)?;
    let region = footer.data_region;
    section
        .get(region.offset as usize..region.end() as usize)
        .ok_or_else(|| ExtractError::CorruptFooter("data region outside section".into()))
}
