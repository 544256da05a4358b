//! Error types for PE image parsing.
//!
//! Construction errors (bad signatures, wrong machine) are fatal; directory
//! accessors surface structural faults for that call only, so sibling
//! accessors on the same parser remain usable.

use thiserror::Error;

/// Main error type for PE parsing operations.
#[derive(Debug, Error)]
pub enum PeError {
    /// The buffer does not start with the `MZ` DOS magic.
    #[error("not a PE image: DOS magic {0:#06x}")]
    NotPe(u16),

    /// The 4-byte value at `e_lfanew` is not `PE\0\0`.
    #[error("invalid NT signature: {0:#010x}")]
    BadNtSignature(u32),

    /// The file header names a machine other than x64.
    #[error("unsupported machine type: {0:#06x}")]
    UnsupportedMachine(u16),

    /// The optional header magic is not PE32+ (`0x20B`).
    #[error("unsupported optional header magic: {0:#06x}")]
    UnsupportedOptionalMagic(u16),

    /// A fixed-size read would cross the end of the image buffer.
    #[error("read of {size} bytes at offset {offset:#x} exceeds image size {len:#x}")]
    BufferOverflow {
        offset: usize,
        size: usize,
        len: usize,
    },

    /// An RVA does not fall inside any section's virtual range.
    #[error("RVA {rva:#010x} not mapped by any section")]
    RvaUnmapped { rva: u32 },

    /// No section matches the requested name.
    #[error("section not found: {name}")]
    SectionNotFound { name: String },

    /// A NUL terminator was not found before the end of the buffer.
    #[error("string at offset {offset:#x} runs past the end of the image")]
    Truncated { offset: usize },

    /// File I/O errors from `PeParser::from_file`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for PE parsing operations.
pub type Result<T> = std::result::Result<T, PeError>;
