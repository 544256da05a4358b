//! Base-relocation directory parsing.

use tracing::warn;

use crate::error::Result;
use crate::sections::SectionTable;
use crate::types::{DataDirectory, RelocationBlock, RelocationEntry};
use crate::utils::{read_u16, read_u32};

/// Walk relocation blocks across exactly `dir.size` bytes.
///
/// Each block is an 8-byte header followed by `(size_of_block - 8) / 2`
/// packed 16-bit entries: type in the high 4 bits, page offset in the low
/// 12. A block whose declared size cannot hold its own header would stall
/// the walk; it ends the walk instead.
pub fn parse_relocations(
    data: &[u8],
    sections: &SectionTable,
    dir: DataDirectory,
) -> Result<Vec<RelocationBlock>> {
    if dir.virtual_address == 0 {
        return Ok(Vec::new());
    }

    let offset = sections.rva_to_offset(dir.virtual_address)?;
    let end = offset + dir.size as usize;
    let mut result = Vec::new();
    let mut current_offset = offset;

    while current_offset < end {
        let virtual_address = read_u32(data, current_offset)?;
        let size_of_block = read_u32(data, current_offset + 4)?;

        if size_of_block < 8 {
            warn!(
                virtual_address,
                size_of_block, "relocation block smaller than its header, stopping walk"
            );
            break;
        }

        let entry_count = (size_of_block - 8) / 2;
        let mut entries = Vec::with_capacity(entry_count as usize);

        for i in 0..entry_count as usize {
            let raw = read_u16(data, current_offset + 8 + i * 2)?;
            entries.push(RelocationEntry {
                kind: (raw >> 12) & 0xF,
                offset: raw & 0xFFF,
            });
        }

        result.push(RelocationBlock {
            virtual_address,
            entries,
        });
        current_offset += size_of_block as usize;
    }

    Ok(result)
}
