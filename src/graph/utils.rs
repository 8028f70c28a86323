//! Little-endian field readers for container parsing

use crate::graph::types::StringPointer;

/// Bounds-checked little-endian reads. `None` means the field runs past the
/// end of the slice; callers turn that into the error of their stage.
pub trait LeRead {
    fn read_u8_at(&self, offset: usize) -> Option<u8>;
    fn read_u32_le(&self, offset: usize) -> Option<u32>;
    fn read_u64_le(&self, offset: usize) -> Option<u64>;
    fn read_pointer(&self, offset: usize) -> Option<StringPointer>;
}

impl LeRead for [u8] {
    fn read_u8_at(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }

    fn read_u32_le(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    fn read_u64_le(&self, offset: usize) -> Option<u64> {
        let bytes: [u8; 8] = self.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    fn read_pointer(&self, offset: usize) -> Option<StringPointer> {
        Some(StringPointer {
            offset: self.read_u32_le(offset)?,
            length: self.read_u32_le(offset.checked_add(4)?)?,
        })
    }
}

/// Render a short byte window for error messages.
pub fn escape_bytes(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
