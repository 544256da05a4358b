//! TLS directory parsing and callback enumeration.

use crate::error::Result;
use crate::sections::SectionTable;
use crate::types::{DataDirectory, TlsDirectory64, TlsInfo};
use crate::utils::{read_u32, read_u64};

/// Read the TLS directory and its zero-terminated callback array.
///
/// `address_of_callbacks` is a virtual address; its low 32 bits are mapped
/// as an RVA to locate the on-disk callback pointers.
pub fn parse_tls(data: &[u8], sections: &SectionTable, dir: DataDirectory) -> Result<Option<TlsInfo>> {
    if dir.virtual_address == 0 {
        return Ok(None);
    }

    let offset = sections.rva_to_offset(dir.virtual_address)?;
    let directory = TlsDirectory64 {
        start_address_of_raw_data: read_u64(data, offset)?,
        end_address_of_raw_data: read_u64(data, offset + 8)?,
        address_of_index: read_u64(data, offset + 16)?,
        address_of_callbacks: read_u64(data, offset + 24)?,
        size_of_zero_fill: read_u32(data, offset + 32)?,
        characteristics: read_u32(data, offset + 36)?,
    };

    let mut callbacks = Vec::new();
    if directory.address_of_callbacks != 0 {
        let mut callback_offset =
            sections.rva_to_offset(directory.address_of_callbacks as u32)?;
        loop {
            let callback = read_u64(data, callback_offset)?;
            if callback == 0 {
                break;
            }
            callbacks.push(callback);
            callback_offset += 8;
        }
    }

    Ok(Some(TlsInfo {
        directory,
        callbacks,
    }))
}
