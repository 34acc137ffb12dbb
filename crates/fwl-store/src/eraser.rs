use fwl_core::{FwlError, FwlResult, Region};
use fwl_hal::FlashDriver;
use log::{trace, warn};

/// Erase-before-write bookkeeping for forward-only writes.
///
/// NOR cells can only go from erased to programmed, and erase works on whole
/// pages. Writes advance through the region sequentially, so a page only
/// needs erasing at the moment the writer first enters it.
pub struct PageEraser<'a, D: FlashDriver> {
    driver: &'a mut D,
    region: &'a Region,
}

impl<'a, D: FlashDriver> PageEraser<'a, D> {
    pub fn new(driver: &'a mut D, region: &'a Region) -> Self {
        Self { driver, region }
    }

    /// Erase the page holding `addr`.
    pub fn erase_page(&mut self, addr: u32) -> FwlResult<()> {
        let page = self.region.page_base(addr);
        if !self.holds(page as u64) {
            return Err(FwlError::RegionExhausted);
        }
        self.erase(page)
    }

    /// Make `[addr, addr + length)` writable. Returns the number of pages erased.
    ///
    /// The page holding `addr` is assumed erased already. Every later page
    /// the span spills into is erased. A span that ends exactly on a page
    /// boundary also erases that next page, so the slot after the record is
    /// never stale data. When that next page sticks out of the region it is
    /// left alone: no record is ever placed in it.
    ///
    /// All pages are checked against the region before the first erase; a
    /// span that starts in or spills into a page not wholly inside the
    /// region fails the call with `RegionExhausted` and nothing is erased.
    pub fn prepare(&mut self, addr: u32, length: usize) -> FwlResult<usize> {
        let page_size = self.region.page_size() as u64;
        let length = length as u64;
        if !self.holds(self.region.page_base(addr) as u64) {
            trace!("[ERASE] {:#010x} sits in a partial page", addr);
            return Err(FwlError::RegionExhausted);
        }
        let mut remaining = page_size - self.region.page_offset(addr) as u64;

        let first = addr as u64 + remaining;
        let mut last = first;
        while remaining < length {
            let page = addr as u64 + remaining;
            if !self.holds(page) {
                trace!("[ERASE] page {:#010x} outside region", page);
                return Err(FwlError::RegionExhausted);
            }
            remaining += page_size;
            last = page + page_size;
        }

        let span_end = addr as u64 + length;
        if remaining == length && self.holds(span_end) {
            last = span_end + page_size;
        }

        let mut erased = 0;
        let mut page = first;
        while page < last {
            self.erase(page as u32)?;
            erased += 1;
            page += page_size;
        }
        Ok(erased)
    }

    fn holds(&self, page: u64) -> bool {
        page <= u32::MAX as u64 && self.region.holds_page(page as u32)
    }

    fn erase(&mut self, page: u32) -> FwlResult<()> {
        trace!("[ERASE] page {:#010x}", page);
        self.driver.on_erase(page, self.region.page_size()).map_err(|e| {
            warn!("[ERASE] page {:#010x} failed: {}", page, e);
            FwlError::Io
        })
    }
}
