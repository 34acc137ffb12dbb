#![no_std]
#![forbid(unsafe_code)]

//! CRC-32 (reflected polynomial `0x04C11DB7`) used to seal log records.
//!
//! A record checksum covers the header fields after the checksum slot and
//! then the payload, in that order. The accumulator is pure: it never
//! reports errors, mismatches are judged by the caller.

use crc32fast::Hasher;

/// Running CRC-32 state.
#[derive(Clone)]
pub struct Crc32 {
    hasher: Hasher,
}

impl Crc32 {
    /// Standard CRC-32 (`start(0)`).
    pub fn new() -> Self {
        Self::start(0)
    }

    /// Resume from a previous checksum value.
    pub fn start(seed: u32) -> Self {
        Self { hasher: Hasher::new_with_initial(seed) }
    }

    /// Feed `buffer` and return the checksum of everything fed so far.
    pub fn accumulate(&mut self, buffer: &[u8]) -> u32 {
        self.hasher.update(buffer);
        self.hasher.clone().finalize()
    }

    pub fn finish(self) -> u32 {
        self.hasher.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self { Self::new() }
}

/// One-shot CRC-32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.accumulate(data);
    crc.finish()
}

/// Checksum of a record: covered header bytes, then payload.
pub fn record_checksum(covered_header: &[u8], payload: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.accumulate(covered_header);
    crc.accumulate(payload);
    crc.finish()
}
