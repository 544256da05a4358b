//! Per-directory parsers for the data directories this crate exposes.

pub mod debug;
pub mod exception;
pub mod export;
pub mod import;
pub mod reloc;
pub mod tls;
