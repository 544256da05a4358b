//! x64 exception directory parsing and chained-unwind resolution.

use tracing::warn;

use crate::error::Result;
use crate::sections::SectionTable;
use crate::types::{
    DataDirectory, ExceptionEntry, RuntimeFunction, UnwindInfo, RUNTIME_FUNCTION_SIZE,
    UNWIND_CODE_SIZE, UNWIND_INFO_HEADER_SIZE,
};
use crate::utils::{read_bytes, read_u32};

/// Ceiling on chain hops per entry; hostile images can form cycles.
const MAX_CHAIN_DEPTH: usize = 32;

fn read_runtime_function(data: &[u8], offset: usize) -> Result<RuntimeFunction> {
    Ok(RuntimeFunction {
        begin_address: read_u32(data, offset)?,
        end_address: read_u32(data, offset + 4)?,
        unwind_info_address: read_u32(data, offset + 8)?,
    })
}

fn read_unwind_info(data: &[u8], offset: usize) -> Result<UnwindInfo> {
    let raw = read_bytes(data, offset, UNWIND_INFO_HEADER_SIZE)?;
    Ok(UnwindInfo::from_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Follow `UNW_FLAG_CHAININFO` links until a terminal function.
///
/// The chained `RuntimeFunction` sits immediately after the unwind-code
/// array, whose slot count is `count_of_codes` rounded up to even. Any read
/// failure along the chain collapses to the last successfully read
/// function; so does exceeding the depth ceiling.
fn resolve_chained_function(
    data: &[u8],
    sections: &SectionTable,
    mut func: RuntimeFunction,
) -> RuntimeFunction {
    for _ in 0..MAX_CHAIN_DEPTH {
        if func.unwind_info_address == 0 {
            return func;
        }

        let Ok(info_offset) = sections.rva_to_offset(func.unwind_info_address) else {
            return func;
        };
        let Ok(info) = read_unwind_info(data, info_offset) else {
            return func;
        };
        if !info.is_chained() {
            return func;
        }

        let mut index = usize::from(info.count_of_codes);
        if index % 2 != 0 {
            index += 1;
        }
        let chain_offset = info_offset + UNWIND_INFO_HEADER_SIZE + index * UNWIND_CODE_SIZE;
        match read_runtime_function(data, chain_offset) {
            Ok(chained) => func = chained,
            Err(_) => return func,
        }
    }

    warn!(
        begin_address = func.begin_address,
        "unwind chain exceeded depth ceiling, keeping last resolved function"
    );
    func
}

/// Parse `dir.size / 12` runtime functions, resolving each entry's chain.
///
/// Chain faults are localized to the entry; a bad terminal unwind info
/// yields an absent record but never aborts the directory walk.
pub fn parse_exceptions(
    data: &[u8],
    sections: &SectionTable,
    dir: DataDirectory,
) -> Result<Vec<ExceptionEntry>> {
    if dir.virtual_address == 0 {
        return Ok(Vec::new());
    }

    let offset = sections.rva_to_offset(dir.virtual_address)?;
    let entry_count = dir.size as usize / RUNTIME_FUNCTION_SIZE;
    let mut result = Vec::with_capacity(entry_count);

    for i in 0..entry_count {
        let func = read_runtime_function(data, offset + i * RUNTIME_FUNCTION_SIZE)?;
        let function = resolve_chained_function(data, sections, func);

        let unwind_info = if function.unwind_info_address != 0 {
            sections
                .rva_to_offset(function.unwind_info_address)
                .and_then(|off| read_unwind_info(data, off))
                .ok()
        } else {
            None
        };

        result.push(ExceptionEntry {
            function,
            unwind_info,
        });
    }

    Ok(result)
}
