//! Import directory parsing: descriptors and the ILT/IAT walk.

use crate::error::Result;
use crate::sections::SectionTable;
use crate::types::{DataDirectory, ImportEntry, ImportedDll, IMPORT_DESCRIPTOR_SIZE};
use crate::utils::{read_cstring, read_u32, read_u64};

/// Walk the import descriptor table and every DLL's lookup table.
///
/// The descriptor walk ends at the first zero import-lookup-table RVA or
/// when the next descriptor would cross the buffer end. An unmappable RVA
/// inside any descriptor aborts the whole call; no partial table is
/// reported.
pub fn parse_imports(
    data: &[u8],
    sections: &SectionTable,
    dir: DataDirectory,
) -> Result<Vec<ImportedDll>> {
    if dir.virtual_address == 0 {
        return Ok(Vec::new());
    }

    let mut result = Vec::new();
    let mut offset = sections.rva_to_offset(dir.virtual_address)?;

    while offset + IMPORT_DESCRIPTOR_SIZE <= data.len() {
        let import_lookup_table_rva = read_u32(data, offset)?;
        if import_lookup_table_rva == 0 {
            break;
        }
        let name_rva = read_u32(data, offset + 12)?;
        let import_address_table_rva = read_u32(data, offset + 16)?;

        let dll_name = read_cstring(data, sections.rva_to_offset(name_rva)?)?;
        let entries = parse_lookup_table(
            data,
            sections,
            import_lookup_table_rva,
            import_address_table_rva,
        )?;

        result.push(ImportedDll {
            name: dll_name,
            entries,
        });

        offset += IMPORT_DESCRIPTOR_SIZE;
    }

    Ok(result)
}

/// Walk 8-byte import lookup entries up to the zero terminator.
fn parse_lookup_table(
    data: &[u8],
    sections: &SectionTable,
    lookup_table_rva: u32,
    iat_base_rva: u32,
) -> Result<Vec<ImportEntry>> {
    let mut entries = Vec::new();
    let mut lookup_offset = sections.rva_to_offset(lookup_table_rva)?;
    let mut index = 0u64;

    loop {
        let entry = read_u64(data, lookup_offset)?;
        if entry == 0 {
            break;
        }
        let thunk_rva = u64::from(iat_base_rva) + index * 8;

        if entry & (1 << 63) != 0 {
            entries.push(ImportEntry {
                ordinal: Some((entry & 0xFFFF) as u16),
                name: None,
                thunk_rva,
            });
        } else {
            // Hint/name record: 2-byte hint, then the NUL-terminated name.
            let hint_name_rva = (entry & 0x7FFF_FFFF) as u32;
            let name_offset = sections.rva_to_offset(hint_name_rva)? + 2;
            entries.push(ImportEntry {
                ordinal: None,
                name: Some(read_cstring(data, name_offset)?),
                thunk_rva,
            });
        }

        lookup_offset += 8;
        index += 1;
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionHeader;

    // One .idata section at RVA 0x2000 mapped to file offset 0.
    fn idata_table() -> SectionTable {
        let mut name = [0u8; 8];
        name[..6].copy_from_slice(b".idata");
        SectionTable::new(vec![SectionHeader {
            name,
            virtual_size: 0x1000,
            virtual_address: 0x2000,
            size_of_raw_data: 0x1000,
            pointer_to_raw_data: 0,
            pointer_to_relocations: 0,
            pointer_to_line_numbers: 0,
            number_of_relocations: 0,
            number_of_line_numbers: 0,
            characteristics: 0,
        }])
    }

    fn put(data: &mut [u8], offset: usize, bytes: &[u8]) {
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[test]
    fn test_parse_imports() {
        let mut data = vec![0u8; 0x1000];

        // Descriptor 0 at file offset 0 (RVA 0x2000): ILT 0x2050, name
        // 0x2100, IAT 0x2080. Descriptor 1 is all zeros and terminates.
        put(&mut data, 0, &0x2050u32.to_le_bytes());
        put(&mut data, 12, &0x2100u32.to_le_bytes());
        put(&mut data, 16, &0x2080u32.to_le_bytes());

        // ILT at 0x50: one name import (hint/name at RVA 0x2110), one
        // ordinal import, then the terminator.
        put(&mut data, 0x50, &0x2110u64.to_le_bytes());
        put(&mut data, 0x58, &0x8000_0000_0000_0042u64.to_le_bytes());

        put(&mut data, 0x100, b"KERNEL32.dll\0");
        put(&mut data, 0x110, &0x0012u16.to_le_bytes());
        put(&mut data, 0x112, b"CreateFileW\0");

        let dir = DataDirectory {
            virtual_address: 0x2000,
            size: 40,
        };
        let imports = parse_imports(&data, &idata_table(), dir).unwrap();

        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].name, "KERNEL32.dll");
        assert_eq!(imports[0].entries.len(), 2);

        let by_name = &imports[0].entries[0];
        assert_eq!(by_name.name.as_deref(), Some("CreateFileW"));
        assert_eq!(by_name.ordinal, None);
        assert_eq!(by_name.thunk_rva, 0x2080);

        let by_ordinal = &imports[0].entries[1];
        assert_eq!(by_ordinal.ordinal, Some(0x42));
        assert_eq!(by_ordinal.name, None);
        assert_eq!(by_ordinal.thunk_rva, 0x2088);
    }

    #[test]
    fn test_absent_directory_is_empty() {
        let data = vec![0u8; 0x100];
        let imports = parse_imports(&data, &idata_table(), DataDirectory::default()).unwrap();
        assert!(imports.is_empty());
    }

    #[test]
    fn test_unmappable_name_rva_aborts() {
        let mut data = vec![0u8; 0x1000];
        put(&mut data, 0, &0x2050u32.to_le_bytes());
        // Name RVA outside every section
        put(&mut data, 12, &0x9000u32.to_le_bytes());
        put(&mut data, 16, &0x2080u32.to_le_bytes());

        let dir = DataDirectory {
            virtual_address: 0x2000,
            size: 40,
        };
        assert!(parse_imports(&data, &idata_table(), dir).is_err());
    }
}
