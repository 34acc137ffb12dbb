#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

mod entry;
mod header;
mod region;

pub use entry::Entry;
pub use header::{RecordHeader, RecordMetadata};
pub use region::Region;

/// Type tag of a written header. Anything else is unwritten or corrupt.
pub const HEADER_MAGIC: u16 = 0xAA55;

/// `next_addr` sentinel: the record has no successor yet.
pub const HEADER_END: u32 = 0xFFFF_FFFF;

/// Default payload bound of a single record.
pub const MAX_PAYLOAD: usize = 256;

/// Value of an erased NOR cell.
pub const ERASED_BYTE: u8 = 0xFF;

// Defaults from the reference board (4KB log in 256-byte pages).
pub const MEMORY_SIZE_DEFAULT: u32 = 4096;
pub const PAGE_SIZE_DEFAULT: u16 = 256;

/// Notifications pushed to the driver for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    WriteOk = 0,
    ReadOk = 1,
    ChecksumError = 2,
    TypeError = 3,
    SizeError = 4,
}

pub type FwlResult<T> = Result<T, FwlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwlError {
    /// Driver read/write/erase failed or moved fewer bytes than asked.
    Io,
    ChecksumMismatch,
    TypeMismatch,
    /// Payload or caller buffer does not fit.
    SizeExceeded,
    /// An erase would leave the region. Absorbed by the writer (wraparound).
    RegionExhausted,
    /// The log holds no record.
    NotFound,
    InvalidConfig,
}

impl core::fmt::Display for FwlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FwlError {}
