//! Section table: RVA mapping and section lookup.

use crate::error::{PeError, Result};
use crate::types::SectionHeader;

/// Ordered section table, kept in on-disk order.
///
/// RVA resolution is a linear scan; file order also decides which section
/// wins a prefix-name lookup when several share a prefix.
#[derive(Debug, Clone)]
pub struct SectionTable {
    sections: Vec<SectionHeader>,
}

impl SectionTable {
    pub fn new(sections: Vec<SectionHeader>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Map an RVA to its file offset through the unique containing section.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        let section = self
            .sections
            .iter()
            .find(|s| s.contains_rva(rva))
            .ok_or(PeError::RvaUnmapped { rva })?;

        Ok((rva - section.virtual_address + section.pointer_to_raw_data) as usize)
    }

    /// First section whose NUL-trimmed name starts with `name`.
    pub fn section_by_prefix(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name().starts_with(name))
    }

    /// Name of the section whose raw-size range contains `address`.
    ///
    /// The range is `[image_base + virtual_address, + size_of_raw_data]`,
    /// end-inclusive so an address one past the last byte still matches.
    pub fn name_for_address(&self, address: u64, image_base: u64) -> Option<String> {
        self.sections.iter().find_map(|s| {
            let start = image_base + u64::from(s.virtual_address);
            let end = start + u64::from(s.size_of_raw_data);
            (address >= start && address <= end).then(|| s.name())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SCN_MEM_EXECUTE;

    fn section(name: &str, va: u32, vsize: u32, raw_ptr: u32, raw_size: u32) -> SectionHeader {
        let mut slot = [0u8; 8];
        slot[..name.len()].copy_from_slice(name.as_bytes());
        SectionHeader {
            name: slot,
            virtual_size: vsize,
            virtual_address: va,
            size_of_raw_data: raw_size,
            pointer_to_raw_data: raw_ptr,
            pointer_to_relocations: 0,
            pointer_to_line_numbers: 0,
            number_of_relocations: 0,
            number_of_line_numbers: 0,
            characteristics: SCN_MEM_EXECUTE,
        }
    }

    fn table() -> SectionTable {
        SectionTable::new(vec![
            section(".text", 0x1000, 0x1000, 0x400, 0x1000),
            section(".data", 0x2000, 0x1000, 0x1400, 0x800),
            section(".textbss", 0x3000, 0x1000, 0x1C00, 0x1000),
        ])
    }

    #[test]
    fn test_rva_to_offset() {
        let table = table();
        assert_eq!(table.rva_to_offset(0x1000).unwrap(), 0x400);
        assert_eq!(table.rva_to_offset(0x1050).unwrap(), 0x450);
        assert_eq!(table.rva_to_offset(0x1FFF).unwrap(), 0x13FF);
        assert_eq!(table.rva_to_offset(0x2500).unwrap(), 0x1900);

        assert!(matches!(
            table.rva_to_offset(0x500),
            Err(PeError::RvaUnmapped { rva: 0x500 })
        ));
        assert!(matches!(
            table.rva_to_offset(0x5000),
            Err(PeError::RvaUnmapped { rva: 0x5000 })
        ));
    }

    #[test]
    fn test_section_by_prefix() {
        let table = table();
        // .text wins over .textbss because it comes first in file order
        assert_eq!(table.section_by_prefix(".text").unwrap().name(), ".text");
        assert_eq!(table.section_by_prefix(".data").unwrap().name(), ".data");
        assert!(table.section_by_prefix(".rsrc").is_none());
    }

    #[test]
    fn test_name_for_address() {
        let table = table();
        let base = 0x1_4000_0000u64;

        assert_eq!(
            table.name_for_address(base + 0x1000, base).as_deref(),
            Some(".text")
        );
        // End-inclusive: one past the last raw byte still matches
        assert_eq!(
            table.name_for_address(base + 0x2000, base).as_deref(),
            Some(".text")
        );
        assert_eq!(
            table.name_for_address(base + 0x2400, base).as_deref(),
            Some(".data")
        );
        assert_eq!(table.name_for_address(base + 0x9000, base), None);
        assert_eq!(table.name_for_address(0x10, base), None);
    }
}
