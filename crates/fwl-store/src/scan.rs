use fwl_core::{FwlResult, RecordHeader, Region, Status};
use fwl_crc::record_checksum;
use fwl_hal::FlashDriver;
use log::{debug, warn};
use zeroize::Zeroize;

use crate::medium::read_exact;

/// Where a scan stopped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanEnd {
    pub records: u32,
    /// The chain ended on a programmed slot that failed validation.
    pub dirty: bool,
}

/// Follow the header chain from the start of the region.
///
/// `visit` sees every record that passes validation, in chain order. The walk
/// ends at the END sentinel, at an erased slot, or at the first slot that
/// fails validation; none of those are errors. Only driver failures are.
pub(crate) fn scan<D, const N: usize, F>(driver: &mut D, region: &Region, mut visit: F) -> FwlResult<ScanEnd>
where
    D: FlashDriver,
    F: FnMut(u32, &RecordHeader, &[u8]),
{
    let mut scratch = [0u8; N];
    let mut raw = [0u8; RecordHeader::SIZE];
    let mut addr = region.start_addr();
    let mut found = 0u32;
    let clean = |records: u32| -> FwlResult<ScanEnd> { Ok(ScanEnd { records, dirty: false }) };
    let dirty = |records: u32| -> FwlResult<ScanEnd> { Ok(ScanEnd { records, dirty: true }) };

    let result = loop {
        if !region.contains_span(addr, RecordHeader::SIZE) {
            debug!("[SCAN] {:#010x}: no room for a header", addr);
            break clean(found);
        }
        if let Err(e) = read_exact(driver, addr, &mut raw) {
            break Err(e);
        }
        if RecordHeader::is_erased(&raw) {
            debug!("[SCAN] {:#010x}: erased slot", addr);
            break clean(found);
        }

        let header = match RecordHeader::from_bytes(&raw) {
            Ok(h) => h,
            Err(e) => break Err(e),
        };
        if let Err(status) = check_header::<N>(region, addr, &header) {
            warn!("[SCAN] {:#010x}: rejected header ({:?})", addr, status);
            driver.on_status(status);
            break dirty(found);
        }

        let payload = &mut scratch[..header.data_length as usize];
        if let Err(e) = read_exact(driver, addr + RecordHeader::SIZE as u32, payload) {
            break Err(e);
        }
        if record_checksum(&header.covered(), payload) != header.checksum {
            warn!("[SCAN] {:#010x}: checksum mismatch", addr);
            driver.on_status(Status::ChecksumError);
            break dirty(found);
        }

        found += 1;
        debug!(
            "[SCAN] #{} at {:#010x} len {} next {:#010x} prev {:#010x}",
            found, addr, header.data_length, header.next_addr, header.prev_addr
        );
        visit(addr, &header, payload);

        if !header.has_successor() {
            break clean(found);
        }
        addr = header.next_addr;
    };

    scratch.zeroize();
    result
}

fn check_header<const N: usize>(region: &Region, addr: u32, header: &RecordHeader) -> Result<(), Status> {
    if !header.is_tagged() {
        return Err(Status::TypeError);
    }
    let len = header.data_length as usize;
    if len > N || !region.contains_span(addr, RecordHeader::SIZE + len) {
        return Err(Status::SizeError);
    }
    // Chains only run forward; anything else is foreign data.
    if header.has_successor() && (header.next_addr > region.end() || header.next_addr <= addr) {
        return Err(Status::SizeError);
    }
    Ok(())
}
