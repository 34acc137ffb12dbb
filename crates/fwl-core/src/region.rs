use crate::{FwlError, FwlResult, RecordHeader, HEADER_END};

/// The contiguous address range the log lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    start_addr: u32,
    size: u32,
    page_size: u16,
}

impl Region {
    /// Validates the geometry. The start must sit on a page boundary because
    /// every erase is page aligned; the size does not need to be a whole
    /// number of pages.
    pub fn new(start_addr: u32, size: u32, page_size: u16) -> FwlResult<Self> {
        if size == 0 || page_size == 0 {
            return Err(FwlError::InvalidConfig);
        }
        if start_addr % page_size as u32 != 0 {
            return Err(FwlError::InvalidConfig);
        }
        // The end address must stay distinguishable from the END sentinel.
        match start_addr.checked_add(size) {
            Some(end) if end != HEADER_END => {}
            _ => return Err(FwlError::InvalidConfig),
        }
        if (size as usize) < RecordHeader::SIZE {
            return Err(FwlError::InvalidConfig);
        }
        Ok(Self { start_addr, size, page_size })
    }

    pub fn start_addr(&self) -> u32 { self.start_addr }
    pub fn size(&self) -> usize { self.size as usize }
    pub fn page_size(&self) -> u16 { self.page_size }

    /// First address past the region.
    pub fn end(&self) -> u32 {
        self.start_addr + self.size
    }

    pub fn page_offset(&self, addr: u32) -> u32 {
        addr % self.page_size as u32
    }

    pub fn page_base(&self, addr: u32) -> u32 {
        addr - self.page_offset(addr)
    }

    /// True if the whole page starting at `page` lies inside the region.
    pub fn holds_page(&self, page: u32) -> bool {
        page >= self.start_addr
            && (page as u64 + self.page_size as u64) <= self.end() as u64
    }

    /// True if `[addr, addr + len)` lies inside the region.
    pub fn contains_span(&self, addr: u32, len: usize) -> bool {
        addr >= self.start_addr && (addr as u64 + len as u64) <= self.end() as u64
    }
}
