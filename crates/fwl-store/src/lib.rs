#![no_std]
#![forbid(unsafe_code)]

//! Append-only record log over raw NOR flash.
//!
//! Each record is a 16-byte header followed by its payload. Headers chain
//! forward through `next_addr`; at start-up the chain is replayed from the
//! region start and the last record that validates becomes the cursor. When
//! the region runs out the writer wraps to the start and overwrites the
//! oldest records.

mod eraser;
mod medium;
mod scan;

pub use eraser::PageEraser;

use fwl_core::{
    Entry, FwlError, FwlResult, RecordHeader, RecordMetadata, Region, Status, HEADER_MAGIC,
    MAX_PAYLOAD,
};
use fwl_crc::record_checksum;
use fwl_hal::FlashDriver;
use log::{debug, info, warn};
use zeroize::Zeroize;

use medium::{read_exact, write_all};

/// Outcome of the recovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// No valid record at the region start. Normal on a cold start.
    Empty,
    /// The cursor sits on the last valid record of a chain of `records`.
    Positioned { records: u32 },
}

/// Last known-valid record, payload included.
#[derive(Clone, Copy)]
struct Cursor<const N: usize> {
    addr: u32,
    header: RecordHeader,
    payload: [u8; N],
}

impl<const N: usize> Cursor<N> {
    fn empty(start_addr: u32) -> Self {
        Self { addr: start_addr, header: RecordHeader::empty(start_addr), payload: [0u8; N] }
    }

    fn capture(addr: u32, header: &RecordHeader, payload: &[u8]) -> Self {
        let mut cursor = Self { addr, header: *header, payload: [0u8; N] };
        cursor.payload[..payload.len()].copy_from_slice(payload);
        cursor
    }

    fn is_record(&self) -> bool {
        self.header.is_tagged()
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    addr: u32,
    next_addr: u32,
    wrapped: bool,
}

/// The record log. `N` is the largest payload a record may carry and sizes
/// every scratch buffer, so nothing here allocates.
///
/// Not internally synchronised: a multi-threaded host wraps the whole store
/// in its own lock.
pub struct RecordStore<D, const N: usize = MAX_PAYLOAD> {
    driver: D,
    region: Region,
    cursor: Cursor<N>,
    // The slot after the cursor holds programmed bytes (torn write or
    // rejected record); the next write restarts the chain at the region start.
    tail_dirty: bool,
}

impl<D: FlashDriver, const N: usize> RecordStore<D, N> {
    pub fn new(driver: D, region: Region) -> FwlResult<Self> {
        if N > u16::MAX as usize {
            return Err(FwlError::InvalidConfig);
        }
        Ok(Self {
            driver,
            region,
            cursor: Cursor::empty(region.start_addr()),
            tail_dirty: false,
        })
    }

    pub fn region(&self) -> &Region { &self.region }
    pub fn driver(&self) -> &D { &self.driver }
    pub fn driver_mut(&mut self) -> &mut D { &mut self.driver }

    /// Hand the driver back, dropping the in-memory cursor.
    pub fn release(mut self) -> D {
        self.cursor.payload.zeroize();
        self.driver
    }

    /// True until a record is recovered or written.
    pub fn is_empty(&self) -> bool {
        !self.cursor.is_record()
    }

    /// Recovery scan. Rebuilds the cursor from the medium.
    ///
    /// On a driver failure the cursor keeps the last record validated
    /// before the failure, the tail counts as dirty and the error is
    /// returned.
    pub fn begin(&mut self) -> nb::Result<Recovery, FwlError> {
        if !self.driver.on_ready() {
            return Err(nb::Error::WouldBlock);
        }

        let mut last: Option<Cursor<N>> = None;
        let scanned = scan::scan::<D, N, _>(&mut self.driver, &self.region, |addr, header, payload| {
            last = Some(Cursor::capture(addr, header, payload));
        });

        self.cursor.payload.zeroize();
        self.cursor = last.unwrap_or_else(|| Cursor::empty(self.region.start_addr()));

        let end = match scanned {
            Ok(end) => end,
            Err(e) => {
                // What follows the cursor was never seen.
                self.tail_dirty = true;
                return Err(nb::Error::Other(e));
            }
        };
        self.tail_dirty = end.dirty;
        match end.records {
            0 => {
                info!("[STORE] begin: log empty");
                Ok(Recovery::Empty)
            }
            records => {
                info!("[STORE] begin: {} record(s), cursor at {:#010x}", records, self.cursor.addr);
                Ok(Recovery::Positioned { records })
            }
        }
    }

    /// `begin`, and format when nothing was found so the first page is known
    /// erased before the first write.
    pub fn begin_or_format(&mut self) -> nb::Result<Recovery, FwlError> {
        let recovery = self.begin()?;
        if recovery == Recovery::Empty {
            self.format()?;
        }
        Ok(recovery)
    }

    /// Erase the first page of the region and forget the cursor.
    pub fn format(&mut self) -> nb::Result<(), FwlError> {
        if !self.driver.on_ready() {
            return Err(nb::Error::WouldBlock);
        }
        let start = self.region.start_addr();
        PageEraser::new(&mut self.driver, &self.region).erase_page(start)?;

        self.cursor.payload.zeroize();
        self.cursor = Cursor::empty(start);
        self.tail_dirty = false;
        info!("[STORE] formatted at {:#010x}", start);
        Ok(())
    }

    /// Append `payload` as a new record.
    ///
    /// The cursor moves only after header and payload are both on the
    /// medium. A failure in between leaves a slot the next scan rejects, and
    /// the following write starts over at the region start.
    pub fn write(&mut self, payload: &[u8]) -> nb::Result<RecordMetadata, FwlError> {
        if !self.driver.on_ready() {
            return Err(nb::Error::WouldBlock);
        }
        if payload.len() > N {
            self.driver.on_status(Status::SizeError);
            return Err(nb::Error::Other(FwlError::SizeExceeded));
        }

        let span = RecordHeader::SIZE + payload.len();
        let placement = match self.place(span) {
            Ok(p) => p,
            Err(e) => {
                self.driver.on_status(Status::SizeError);
                return Err(nb::Error::Other(e));
            }
        };

        match self.commit(placement, span, payload) {
            Ok(placement) => {
                self.tail_dirty = false;
                self.driver.on_status(Status::WriteOk);
                debug!(
                    "[STORE] wrote {} byte(s) at {:#010x}{}",
                    payload.len(),
                    placement.addr,
                    if placement.wrapped { " (wrapped)" } else { "" }
                );
                Ok(self.info())
            }
            Err(e) => {
                if e == FwlError::Io {
                    warn!("[STORE] write after {:#010x} failed, tail is dirty", self.cursor.addr);
                    self.tail_dirty = true;
                }
                Err(nb::Error::Other(e))
            }
        }
    }

    /// Copy the current record's payload into `buf`, verifying its checksum
    /// against the cursor. Returns the payload length.
    pub fn read(&mut self, buf: &mut [u8]) -> nb::Result<usize, FwlError> {
        if !self.driver.on_ready() {
            return Err(nb::Error::WouldBlock);
        }
        if !self.cursor.is_record() {
            return Err(nb::Error::Other(FwlError::NotFound));
        }

        let len = self.cursor.header.data_length as usize;
        if buf.len() < len {
            self.driver.on_status(Status::SizeError);
            return Err(nb::Error::Other(FwlError::SizeExceeded));
        }

        let out = &mut buf[..len];
        read_exact(&mut self.driver, self.cursor.addr + RecordHeader::SIZE as u32, out)?;
        if record_checksum(&self.cursor.header.covered(), out) != self.cursor.header.checksum {
            warn!("[STORE] read at {:#010x}: checksum mismatch", self.cursor.addr);
            self.driver.on_status(Status::ChecksumError);
            return Err(nb::Error::Other(FwlError::ChecksumMismatch));
        }

        self.driver.on_status(Status::ReadOk);
        Ok(len)
    }

    /// Append a fixed-size value.
    pub fn write_entry<T: Entry>(&mut self, value: &T) -> nb::Result<RecordMetadata, FwlError> {
        if T::SIZE > N {
            self.driver.on_status(Status::SizeError);
            return Err(nb::Error::Other(FwlError::SizeExceeded));
        }
        let mut raw = [0u8; N];
        value.encode(&mut raw[..T::SIZE]);
        self.write(&raw[..T::SIZE])
    }

    /// Read the current record back as a fixed-size value. A record of a
    /// different length is `TypeMismatch`.
    pub fn read_entry<T: Entry>(&mut self) -> nb::Result<T, FwlError> {
        let mut raw = [0u8; N];
        let len = self.read(&mut raw)?;
        let value = T::decode(&raw[..len]).ok_or(nb::Error::Other(FwlError::TypeMismatch));
        raw.zeroize();
        value
    }

    /// Snapshot of the cursor header.
    pub fn info(&self) -> RecordMetadata {
        RecordMetadata::new(self.cursor.addr, &self.cursor.header)
    }

    /// Replay the chain from the region start without touching the cursor.
    /// Returns the number of valid records.
    pub fn walk<F: FnMut(RecordMetadata)>(&mut self, mut f: F) -> nb::Result<u32, FwlError> {
        if !self.driver.on_ready() {
            return Err(nb::Error::WouldBlock);
        }
        let end = scan::scan::<D, N, _>(&mut self.driver, &self.region, |addr, header, _| {
            f(RecordMetadata::new(addr, header))
        })?;
        Ok(end.records)
    }

    /// Where the next record goes: right after the cursor, or back at the
    /// region start when it would run past the end.
    fn place(&self, span: usize) -> FwlResult<Placement> {
        if self.tail_dirty {
            return wrapped(&self.region, span);
        }
        let addr = if self.cursor.is_record() && self.cursor.header.has_successor() {
            self.cursor.header.next_addr
        } else {
            self.region.start_addr()
        };

        let next = addr as u64 + span as u64;
        if next <= self.region.end() as u64 {
            return Ok(Placement { addr, next_addr: next as u32, wrapped: false });
        }
        wrapped(&self.region, span)
    }

    /// Erase, then program header and payload. Replaces the cursor only when
    /// both are on the medium.
    fn commit(&mut self, placement: Placement, span: usize, payload: &[u8]) -> FwlResult<Placement> {
        let placement = self.prepare(placement, span)?;

        let mut header = RecordHeader {
            checksum: 0,
            next_addr: placement.next_addr,
            prev_addr: self.cursor.addr,
            data_length: payload.len() as u16,
            type_tag: HEADER_MAGIC,
        };
        header.checksum = record_checksum(&header.covered(), payload);

        write_all(&mut self.driver, placement.addr, &header.encode())?;
        if !payload.is_empty() {
            write_all(&mut self.driver, placement.addr + RecordHeader::SIZE as u32, payload)?;
        }

        self.cursor = Cursor::capture(placement.addr, &header, payload);
        Ok(placement)
    }

    /// Erase whatever the placement needs, wrapping once if the pages ahead
    /// run out.
    fn prepare(&mut self, placement: Placement, span: usize) -> FwlResult<Placement> {
        let start = self.region.start_addr();
        let mut eraser = PageEraser::new(&mut self.driver, &self.region);

        if !placement.wrapped {
            match eraser.prepare(placement.addr, span) {
                Ok(_) => return Ok(placement),
                Err(FwlError::RegionExhausted) => {
                    debug!("[STORE] no erasable page ahead of {:#010x}, wrapping", placement.addr);
                }
                Err(e) => return Err(e),
            }
        }

        let placement = wrapped(&self.region, span)?;
        eraser.erase_page(start)?;
        match eraser.prepare(placement.addr, span) {
            Ok(_) => Ok(placement),
            // The record cannot fit even in a fresh region.
            Err(FwlError::RegionExhausted) => Err(FwlError::SizeExceeded),
            Err(e) => Err(e),
        }
    }
}

fn wrapped(region: &Region, span: usize) -> FwlResult<Placement> {
    let addr = region.start_addr();
    let next = addr as u64 + span as u64;
    if next > region.end() as u64 {
        return Err(FwlError::SizeExceeded);
    }
    Ok(Placement { addr, next_addr: next as u32, wrapped: true })
}
