//! The `PeParser` facade: construction, directory accessors, overrides.

use std::path::Path;

use tracing::debug;

use crate::directories::{debug as debug_dir, exception, export, import, reloc, tls};
use crate::error::{PeError, Result};
use crate::headers::{parse_dos_header, parse_nt_headers, parse_section_headers};
use crate::sections::SectionTable;
use crate::types::*;
use crate::utils::read_bytes;

/// Read-only parser over a PE32+ (x64) image.
///
/// Headers are parsed eagerly at construction; every directory accessor is
/// a pure query recomputed per call from the owned buffer, so the two
/// overrides always feed into derived addresses. All returned byte
/// sequences are owned copies.
pub struct PeParser {
    data: Vec<u8>,
    dos_header: DosHeader,
    file_header: FileHeader,
    optional_header: OptionalHeader64,
    data_directories: Vec<DataDirectory>,
    section_table: SectionTable,
    base_override: u64,
    entry_override: u64,
}

impl PeParser {
    /// Parse an image from an in-memory buffer.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let dos_header = parse_dos_header(&data)?;
        let pe_offset = dos_header.e_lfanew as usize;
        let (file_header, optional_header, data_directories) =
            parse_nt_headers(&data, pe_offset)?;

        let section_offset =
            pe_offset + 4 + FILE_HEADER_SIZE + file_header.size_of_optional_header as usize;
        let section_headers =
            parse_section_headers(&data, section_offset, file_header.number_of_sections)?;

        debug!(
            sections = section_headers.len(),
            entry_point = optional_header.address_of_entry_point,
            image_base = optional_header.image_base,
            "parsed PE32+ headers"
        );

        Ok(Self {
            data,
            dos_header,
            file_header,
            optional_header,
            data_directories,
            section_table: SectionTable::new(section_headers),
            base_override: 0,
            entry_override: 0,
        })
    }

    /// Read a file to its end and parse it as an image.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    // Header access

    pub fn dos_header(&self) -> &DosHeader {
        &self.dos_header
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    pub fn optional_header(&self) -> &OptionalHeader64 {
        &self.optional_header
    }

    pub fn data_directories(&self) -> &[DataDirectory] {
        &self.data_directories
    }

    pub fn sections(&self) -> &[SectionHeader] {
        self.section_table.sections()
    }

    // Derived addresses and overrides

    /// Effective image base: the override when set, else the on-disk base.
    pub fn image_base(&self) -> u64 {
        if self.base_override != 0 {
            self.base_override
        } else {
            self.optional_header.image_base
        }
    }

    /// Effective entry point. With an entry override set it is rebased onto
    /// the effective image base; otherwise both parts come from disk.
    pub fn entry_point(&self) -> u64 {
        if self.entry_override != 0 {
            self.image_base() + self.entry_override
        } else {
            self.optional_header.image_base + u64::from(self.optional_header.address_of_entry_point)
        }
    }

    /// Override the image base for derived-address queries. Zero unsets.
    pub fn override_base_address(&mut self, address: u64) {
        self.base_override = address;
    }

    /// Override the entry-point RVA for derived-address queries. Zero unsets.
    pub fn override_entry_point(&mut self, address: u64) {
        self.entry_override = address;
    }

    // Address mapping and section views

    /// Map an RVA to its file offset through the section table.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        self.section_table.rva_to_offset(rva)
    }

    /// Name of the section whose mapped raw range contains `address`
    /// (end-inclusive), or `None`.
    pub fn section_name_for_address(&self, address: u64) -> Option<String> {
        self.section_table.name_for_address(address, self.image_base())
    }

    /// Copy of the raw data of the first section whose name starts with
    /// `name`.
    pub fn section_data(&self, name: &str) -> Result<Vec<u8>> {
        let section = self
            .section_table
            .section_by_prefix(name)
            .ok_or_else(|| PeError::SectionNotFound {
                name: name.to_string(),
            })?;
        self.raw_section_data(section)
    }

    /// Copy of the `.text` section's raw data.
    pub fn text_section_data(&self) -> Result<Vec<u8>> {
        self.section_data(".text")
    }

    /// Every section carrying `IMAGE_SCN_MEM_EXECUTE`, with raw bytes and
    /// the absolute virtual address under the effective image base.
    pub fn executable_sections(&self) -> Result<Vec<SectionData>> {
        self.collect_sections(true)
    }

    /// Every section, with the `executable` flag reflecting its
    /// characteristics bit.
    pub fn all_sections(&self) -> Result<Vec<SectionData>> {
        self.collect_sections(false)
    }

    fn collect_sections(&self, executable_only: bool) -> Result<Vec<SectionData>> {
        let image_base = self.image_base();
        self.section_table
            .sections()
            .iter()
            .filter(|s| !executable_only || s.is_executable())
            .map(|s| {
                Ok(SectionData {
                    name: s.name(),
                    data: self.raw_section_data(s)?,
                    virtual_address: image_base + u64::from(s.virtual_address),
                    executable: s.is_executable(),
                })
            })
            .collect()
    }

    fn raw_section_data(&self, section: &SectionHeader) -> Result<Vec<u8>> {
        read_bytes(
            &self.data,
            section.pointer_to_raw_data as usize,
            section.size_of_raw_data as usize,
        )
        .map(<[u8]>::to_vec)
    }

    // Data directories

    /// Per-DLL import descriptors with their resolved lookup tables.
    pub fn imports(&self) -> Result<Vec<ImportedDll>> {
        import::parse_imports(
            &self.data,
            &self.section_table,
            self.data_directories[DIRECTORY_ENTRY_IMPORT],
        )
    }

    /// The export directory, or `None` when the image exports nothing.
    pub fn exports(&self) -> Result<Option<Exports>> {
        export::parse_exports(
            &self.data,
            &self.section_table,
            self.data_directories[DIRECTORY_ENTRY_EXPORT],
            self.image_base(),
        )
    }

    /// Base-relocation blocks with decoded entries.
    pub fn relocations(&self) -> Result<Vec<RelocationBlock>> {
        reloc::parse_relocations(
            &self.data,
            &self.section_table,
            self.data_directories[DIRECTORY_ENTRY_BASERELOC],
        )
    }

    /// Exception directory entries with chains resolved to their terminal
    /// functions.
    pub fn exceptions(&self) -> Result<Vec<ExceptionEntry>> {
        exception::parse_exceptions(
            &self.data,
            &self.section_table,
            self.data_directories[DIRECTORY_ENTRY_EXCEPTION],
        )
    }

    /// The TLS directory and its callbacks, or `None` when absent.
    pub fn tls(&self) -> Result<Option<TlsInfo>> {
        tls::parse_tls(
            &self.data,
            &self.section_table,
            self.data_directories[DIRECTORY_ENTRY_TLS],
        )
    }

    /// Debug directory records with copied payloads.
    pub fn debug_directory(&self) -> Result<Vec<DebugRecord>> {
        debug_dir::parse_debug(
            &self.data,
            &self.section_table,
            self.data_directories[DIRECTORY_ENTRY_DEBUG],
        )
    }

    /// Raw PDB path embedded in the first usable CodeView record.
    pub fn pdb_path(&self) -> Result<Option<String>> {
        Ok(debug_dir::pdb_path(&self.debug_directory()?))
    }

    /// Microsoft symbol-server URL for the image's PDB.
    pub fn pdb_url(&self) -> Result<Option<String>> {
        Ok(debug_dir::pdb_url(&self.debug_directory()?))
    }
}
