use log::warn;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use fwl_core::{FwlError, FwlResult, Region, Status, ERASED_BYTE};
use fwl_hal::FlashDriver;

pub mod image;
pub use image::FileFlash;

/// NOR flash held in RAM.
///
/// Programming ANDs bits into the cells and only an erase sets them back to
/// `0xFF`. In strict mode (the default) programming a byte that is not
/// erased fails, which is how tests catch a missing erase.
pub struct RamFlash {
    cells: Vec<u8>,
    base: u32,
    page_size: u16,
    strict: bool,

    ready: bool,
    writes_left: Option<usize>,
    fail_reads: bool,

    erased: Vec<u32>,
    statuses: Vec<Status>,
}

impl RamFlash {
    /// Fully erased medium covering the region.
    pub fn new(region: &Region) -> Self {
        Self {
            cells: vec![ERASED_BYTE; region.size()],
            base: region.start_addr(),
            page_size: region.page_size(),
            strict: true,
            ready: true,
            writes_left: None,
            fail_reads: false,
            erased: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// Medium full of deterministic garbage, as found on an unformatted part.
    pub fn scrambled(region: &Region, seed: u64) -> Self {
        let mut flash = Self::new(region);
        StdRng::seed_from_u64(seed).fill_bytes(&mut flash.cells);
        flash
    }

    /// Let programming land on non-erased cells (plain AND, like real NOR).
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Accept `n` more writes, then fail every write until `heal`.
    pub fn fail_writes_after(&mut self, n: usize) {
        self.writes_left = Some(n);
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn heal(&mut self) {
        self.writes_left = None;
        self.fail_reads = false;
        self.ready = true;
    }

    /// Flip bits of the cell at `addr`, bypassing NOR rules.
    pub fn corrupt(&mut self, addr: u32, xor: u8) {
        if let Some(i) = self.index(addr, 1) {
            self.cells[i] ^= xor;
        }
    }

    pub fn peek(&self, addr: u32, len: usize) -> &[u8] {
        match self.index(addr, len) {
            Some(i) => &self.cells[i..i + len],
            None => &[],
        }
    }

    /// Page addresses erased so far, in order.
    pub fn erased_pages(&self) -> &[u32] {
        &self.erased
    }

    pub fn erase_count(&self) -> usize {
        self.erased.len()
    }

    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    pub fn clear_log(&mut self) {
        self.erased.clear();
        self.statuses.clear();
    }

    fn index(&self, addr: u32, len: usize) -> Option<usize> {
        let i = addr.checked_sub(self.base)? as usize;
        if i + len <= self.cells.len() { Some(i) } else { None }
    }
}

impl FlashDriver for RamFlash {
    fn on_ready(&mut self) -> bool {
        self.ready
    }

    fn on_read(&mut self, addr: u32, buf: &mut [u8]) -> FwlResult<usize> {
        if self.fail_reads {
            return Err(FwlError::Io);
        }
        let i = self.index(addr, buf.len()).ok_or(FwlError::Io)?;
        buf.copy_from_slice(&self.cells[i..i + buf.len()]);
        Ok(buf.len())
    }

    fn on_write(&mut self, addr: u32, data: &[u8]) -> FwlResult<usize> {
        match self.writes_left {
            Some(0) => return Err(FwlError::Io),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        let i = self.index(addr, data.len()).ok_or(FwlError::Io)?;
        let cells = &mut self.cells[i..i + data.len()];

        if self.strict {
            if let Some(off) = cells.iter().position(|&c| c != ERASED_BYTE) {
                warn!("[RAM] program over live cell at {:#010x}", addr as usize + off);
                return Err(FwlError::Io);
            }
        }
        for (cell, byte) in cells.iter_mut().zip(data) {
            *cell &= *byte;
        }
        Ok(data.len())
    }

    fn on_erase(&mut self, addr: u32, length: u16) -> FwlResult<()> {
        let page = self.page_size as u32;
        if addr % page != 0 {
            return Err(FwlError::Io);
        }
        let pages = (length as u32).div_ceil(page).max(1);
        let i = self.index(addr, (pages * page) as usize).ok_or(FwlError::Io)?;
        self.cells[i..i + (pages * page) as usize].fill(ERASED_BYTE);
        for p in 0..pages {
            self.erased.push(addr + p * page);
        }
        Ok(())
    }

    fn on_status(&mut self, status: Status) {
        self.statuses.push(status);
    }
}
