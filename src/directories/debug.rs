//! Debug directory parsing, CodeView records, and symbol-server URLs.

use tracing::warn;

use crate::error::Result;
use crate::sections::SectionTable;
use crate::types::{
    DataDirectory, DebugDirectoryEntry, DebugRecord, CV_SIGNATURE_NB10, CV_SIGNATURE_RSDS,
    DEBUG_DIRECTORY_SIZE, DEBUG_TYPE_CODEVIEW,
};
use crate::utils::{read_u16, read_u32, ReadExt};

/// Microsoft symbol-download service endpoint.
const MSDL_BASE: &str = "https://msdl.microsoft.com/download/symbols";

// CodeView payload layouts: RSDS is signature(4) + GUID(16) + age(4) + path,
// NB10 is signature(4) + offset(4) + signature(4) + age(4) + path.
const RSDS_PATH_OFFSET: usize = 24;
const NB10_PATH_OFFSET: usize = 16;

/// Read `dir.size / 28` debug records, copying each payload when both its
/// file pointer and size are non-zero. A payload range that crosses the
/// buffer end is reported as absent rather than failing the walk.
pub fn parse_debug(
    data: &[u8],
    sections: &SectionTable,
    dir: DataDirectory,
) -> Result<Vec<DebugRecord>> {
    if dir.virtual_address == 0 {
        return Ok(Vec::new());
    }

    let offset = sections.rva_to_offset(dir.virtual_address)?;
    let entry_count = dir.size as usize / DEBUG_DIRECTORY_SIZE;
    let mut result = Vec::with_capacity(entry_count);

    for i in 0..entry_count {
        let entry_offset = offset + i * DEBUG_DIRECTORY_SIZE;
        let entry = DebugDirectoryEntry {
            characteristics: read_u32(data, entry_offset)?,
            time_date_stamp: read_u32(data, entry_offset + 4)?,
            major_version: read_u16(data, entry_offset + 8)?,
            minor_version: read_u16(data, entry_offset + 10)?,
            debug_type: read_u32(data, entry_offset + 12)?,
            size_of_data: read_u32(data, entry_offset + 16)?,
            address_of_raw_data: read_u32(data, entry_offset + 20)?,
            pointer_to_raw_data: read_u32(data, entry_offset + 24)?,
        };

        let payload = if entry.pointer_to_raw_data != 0 && entry.size_of_data != 0 {
            data.read_slice_at(entry.pointer_to_raw_data as usize, entry.size_of_data as usize)
                .map(<[u8]>::to_vec)
        } else {
            None
        };

        result.push(DebugRecord {
            entry,
            data: payload,
        });
    }

    Ok(result)
}

/// NUL-terminated string inside a CodeView payload; `None` when the
/// terminator is missing, which marks the record malformed.
fn cstring_in(payload: &[u8], offset: usize) -> Option<String> {
    let tail = payload.get(offset..)?;
    let len = tail.iter().position(|&b| b == 0)?;
    Some(String::from_utf8_lossy(&tail[..len]).into_owned())
}

fn codeview_payloads(records: &[DebugRecord]) -> impl Iterator<Item = &[u8]> {
    records
        .iter()
        .filter(|r| r.entry.debug_type == DEBUG_TYPE_CODEVIEW)
        .filter_map(|r| r.data.as_deref())
        .filter(|d| d.len() >= 4)
}

/// Raw PDB path embedded in the first usable CodeView record.
pub fn pdb_path(records: &[DebugRecord]) -> Option<String> {
    for payload in codeview_payloads(records) {
        let path = match &payload[..4] {
            b"RSDS" if payload.len() >= RSDS_PATH_OFFSET => {
                cstring_in(payload, RSDS_PATH_OFFSET)
            }
            b"NB10" if payload.len() >= NB10_PATH_OFFSET => {
                cstring_in(payload, NB10_PATH_OFFSET)
            }
            _ => None,
        };
        match path {
            Some(path) => return Some(path),
            None => warn!("skipping malformed CodeView record"),
        }
    }
    None
}

/// Basename of an embedded PDB path, split on either separator.
fn pdb_filename(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Symbol-server URL for the first usable CodeView record.
///
/// The layout is `{base}/{file}/{id}{age}/{file}` where `id` is the RSDS
/// GUID as 32 uppercase hex digits in registry order (the NB10 signature as
/// 8 digits), and `age` is decimal. The format is a compatibility contract
/// with MSDL; any deviation produces URLs the service rejects.
pub fn pdb_url(records: &[DebugRecord]) -> Option<String> {
    for payload in codeview_payloads(records) {
        let signature = payload.read_u32_le_at(0).unwrap();
        let url = match signature {
            // Full record is the fixed prefix plus at least the path NUL.
            CV_SIGNATURE_RSDS if payload.len() > RSDS_PATH_OFFSET => rsds_url(payload),
            CV_SIGNATURE_NB10 if payload.len() > NB10_PATH_OFFSET => nb10_url(payload),
            _ => None,
        };
        match url {
            Some(url) => return Some(url),
            None => warn!("skipping malformed CodeView record"),
        }
    }
    None
}

fn rsds_url(payload: &[u8]) -> Option<String> {
    let guid_data1 = payload.read_u32_le_at(4).unwrap();
    let guid_data2 = payload.read_u16_le_at(8).unwrap();
    let guid_data3 = payload.read_u16_le_at(10).unwrap();
    let guid_data4: [u8; 8] = payload[12..20].try_into().unwrap();
    let age = payload.read_u32_le_at(20).unwrap();

    let path = cstring_in(payload, RSDS_PATH_OFFSET)?;
    let filename = pdb_filename(&path);

    let guid = format!(
        "{:08X}{:04X}{:04X}{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        guid_data1,
        guid_data2,
        guid_data3,
        guid_data4[0],
        guid_data4[1],
        guid_data4[2],
        guid_data4[3],
        guid_data4[4],
        guid_data4[5],
        guid_data4[6],
        guid_data4[7],
    );

    Some(format!("{MSDL_BASE}/{filename}/{guid}{age}/{filename}"))
}

fn nb10_url(payload: &[u8]) -> Option<String> {
    let signature = payload.read_u32_le_at(8).unwrap();
    let age = payload.read_u32_le_at(12).unwrap();

    let path = cstring_in(payload, NB10_PATH_OFFSET)?;
    let filename = pdb_filename(&path);

    Some(format!(
        "{MSDL_BASE}/{filename}/{signature:08X}{age}/{filename}"
    ))
}
