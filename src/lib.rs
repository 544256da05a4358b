//! Read-only parser for Windows 64-bit portable executable (PE32+) images.
//!
//! Given the raw bytes of an x64 image, [`PeParser`] exposes a validated
//! view of the headers and the principal data directories: sections,
//! imports, exports, base relocations, x64 exception/unwind data, TLS
//! callbacks, and debug (CodeView) metadata, including the Microsoft
//! symbol-server URL for the image's PDB.
//!
//! ```no_run
//! use peview::PeParser;
//!
//! # fn main() -> peview::Result<()> {
//! let parser = PeParser::from_file("ntdll.dll")?;
//! for dll in parser.imports()? {
//!     println!("{} ({} entries)", dll.name, dll.entries.len());
//! }
//! if let Some(url) = parser.pdb_url()? {
//!     println!("symbols: {url}");
//! }
//! # Ok(())
//! # }
//! ```

/// Per-directory parsers (imports, exports, relocations, exceptions, TLS,
/// debug)
pub mod directories;

/// Error types and the crate-wide `Result` alias
pub mod error;

/// Header parsing run at construction
pub mod headers;

/// Tracing subscriber setup
pub mod logging;

/// The parser facade
pub mod parser;

/// Section table and RVA mapping
pub mod sections;

/// PE constants and data types
pub mod types;

/// Bounds-checked buffer reads
pub mod utils;

pub use error::{PeError, Result};
pub use parser::PeParser;
pub use types::*;
