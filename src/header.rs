//! FDT header parsing.
//!
//! Every device tree blob begins with this header. All fields are
//! stored big-endian on disk and converted to host order when read.

use crate::define::FDT_MAGIC;
use crate::error::FdtError;

/// Byte size of the on-disk header (ten `u32` fields).
pub const HEADER_SIZE: usize = 10 * 4;

/// The FDT header structure, host-order once parsed.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Magic number, always `FDT_MAGIC` once validated.
    pub magic: u32,
    /// Total size in bytes of the whole FDT blob.
    pub totalsize: u32,
    /// Byte offset from the start of the blob to the structure block.
    pub off_dt_struct: u32,
    /// Byte offset from the start of the blob to the strings block.
    pub off_dt_strings: u32,
    /// Byte offset from the start of the blob to the memory reservation block.
    pub off_mem_rsvmap: u32,
    /// FDT version this blob was written as.
    pub version: u32,
    /// Lowest FDT version a consumer must support to read this blob.
    pub last_comp_version: u32,
    /// Physical ID of the boot CPU.
    pub boot_cpuid_phys: u32,
    /// Length in bytes of the strings block.
    pub size_dt_strings: u32,
    /// Length in bytes of the structure block.
    pub size_dt_struct: u32,
}

impl Header {
    /// Parses a header from the start of `data`, validating the magic number.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FdtError> {
        if data.len() < HEADER_SIZE {
            return Err(FdtError::BufferTooSmall {
                needed: HEADER_SIZE,
                got: data.len(),
            });
        }

        let read = |i: usize| -> u32 {
            u32::from_be_bytes(data[i * 4..i * 4 + 4].try_into().unwrap())
        };

        let magic = read(0);
        if magic != FDT_MAGIC {
            return Err(FdtError::InvalidMagic(magic));
        }

        Ok(Header {
            magic,
            totalsize: read(1),
            off_dt_struct: read(2),
            off_dt_strings: read(3),
            off_mem_rsvmap: read(4),
            version: read(5),
            last_comp_version: read(6),
            boot_cpuid_phys: read(7),
            size_dt_strings: read(8),
            size_dt_struct: read(9),
        })
    }
}

/// Reads the header's `totalsize` field from an unparsed blob, without
/// validating that the blob is otherwise well-formed.
///
/// Useful for callers that need to know how many bytes to copy out of
/// a physical-memory location before handing the blob to [`crate::Dtb::parse`].
pub fn query_total_size(blob: &[u8]) -> Result<u32, FdtError> {
    Ok(Header::from_bytes(blob)?.totalsize)
}
