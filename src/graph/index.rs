//! Module index decoder.
//!
//! The metadata region is a packed array of fixed-width descriptor records.
//! Records are decoded in file order, which is the module index order; index 0
//! is the entry module in every build Bun produces.

use crate::error::{ExtractError, Result};
use crate::graph::footer::{data_region_bytes, FooterRecord};
use crate::graph::types::{DescriptorLayout, Encoding, Loader, ModuleFormat, Side, StringPointer};
use crate::graph::utils::LeRead;
use crate::io::ExecutableImage;
use crate::locate::SectionSpan;
use serde::Serialize;
use tracing::{debug, trace};

/// One decoded index record. All pointers are relative to the data region and
/// have been checked to lie inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub index: usize,
    pub path: StringPointer,
    pub contents: StringPointer,
    pub sourcemap: StringPointer,
    /// Empty for `V1` records.
    pub bytecode: StringPointer,
    /// Empty for `V1` and `V2` records.
    pub module_info: StringPointer,
    /// Empty for `V1` and `V2` records.
    pub bytecode_origin_path: StringPointer,
    pub encoding: Encoding,
    /// The module's kind tag.
    pub loader: Loader,
    pub module_format: ModuleFormat,
    pub side: Side,
}

impl ModuleDescriptor {
    fn pointers(&self) -> [(&'static str, StringPointer); 6] {
        [
            ("path", self.path),
            ("contents", self.contents),
            ("sourcemap", self.sourcemap),
            ("bytecode", self.bytecode),
            ("module_info", self.module_info),
            ("bytecode_origin_path", self.bytecode_origin_path),
        ]
    }
}

/// Decode all `footer.module_count` descriptors in file order.
///
/// Every record is fully validated here, before the extractor slices
/// anything: an unknown loader or encoding tag, or any pointer reaching past
/// the data region, is `CorruptDescriptor`.
pub fn decode_index(
    image: &ExecutableImage,
    span: &SectionSpan,
    footer: &FooterRecord,
) -> Result<Vec<ModuleDescriptor>> {
    let data = data_region_bytes(image, span, footer)?;
    let data_len = data.len() as u64;
    let metadata = data
        .get(footer.modules_ptr.offset as usize..footer.modules_ptr.end() as usize)
        .ok_or_else(|| ExtractError::CorruptFooter("metadata region outside data region".into()))?;

    let layout = footer.layout;
    let record_size = layout.record_size();
    let mut descriptors = Vec::with_capacity(footer.module_count);

    for (index, record) in metadata
        .chunks_exact(record_size)
        .take(footer.module_count)
        .enumerate()
    {
        let descriptor = decode_record(index, record, layout)?;
        for (field, ptr) in descriptor.pointers() {
            if !ptr.fits_within(data_len) {
                return Err(ExtractError::descriptor(
                    index,
                    format!(
                        "{field} {}+{} exceeds data region of {data_len} bytes",
                        ptr.offset, ptr.length
                    ),
                ));
            }
        }
        trace!(
            index,
            loader = %descriptor.loader,
            path.offset = descriptor.path.offset,
            path.length = descriptor.path.length,
            contents.offset = descriptor.contents.offset,
            contents.length = descriptor.contents.length,
            "Decoded descriptor"
        );
        descriptors.push(descriptor);
    }

    if descriptors.len() != footer.module_count {
        return Err(ExtractError::CorruptFooter(format!(
            "metadata holds {} records, footer promises {}",
            descriptors.len(),
            footer.module_count
        )));
    }

    debug!(count = descriptors.len(), ?layout, "Decoded module index");
    Ok(descriptors)
}

fn decode_record(index: usize, record: &[u8], layout: DescriptorLayout) -> Result<ModuleDescriptor> {
    let short = || ExtractError::descriptor(index, "record is short");
    let pointer_at = |slot: usize| -> Result<StringPointer> {
        if slot < layout.pointer_count() {
            record.read_pointer(slot * 8).ok_or_else(short)
        } else {
            Ok(StringPointer::default())
        }
    };

    let tags = layout.pointer_count() * 8;
    let encoding_tag = record.read_u8_at(tags).ok_or_else(short)?;
    let loader_tag = record.read_u8_at(tags + 1).ok_or_else(short)?;
    let format_tag = record.read_u8_at(tags + 2).ok_or_else(short)?;
    let side_tag = record.read_u8_at(tags + 3).ok_or_else(short)?;

    let loader = Loader::from_u8(loader_tag)
        .ok_or_else(|| ExtractError::descriptor(index, format!("unknown loader tag {loader_tag}")))?;
    let encoding = Encoding::from_u8(encoding_tag).ok_or_else(|| {
        ExtractError::descriptor(index, format!("unknown encoding tag {encoding_tag}"))
    })?;

    Ok(ModuleDescriptor {
        index,
        path: pointer_at(0)?,
        contents: pointer_at(1)?,
        sourcemap: pointer_at(2)?,
        bytecode: pointer_at(3)?,
        module_info: pointer_at(4)?,
        bytecode_origin_path: pointer_at(5)?,
        encoding,
        loader,
        module_format: ModuleFormat::from_u8(format_tag),
        side: Side::from_u8(side_tag),
    })
}
