#![no_std]
#![forbid(unsafe_code)]

use fwl_core::{FwlResult, Status};

/// The storage driver behind a record store.
///
/// Every call is synchronous. A driver that must wait on hardware reports it
/// through `on_ready`; the store then returns `nb::Error::WouldBlock` without
/// touching the medium.
pub trait FlashDriver: Send {
    /// Checked before any data-moving call.
    fn on_ready(&mut self) -> bool { true }

    /// Fill `buf` from `addr`. Returns the number of bytes read.
    fn on_read(&mut self, addr: u32, buf: &mut [u8]) -> FwlResult<usize>;

    /// Program `data` at `addr`. The target bytes were erased beforehand.
    /// Returns the number of bytes written.
    fn on_write(&mut self, addr: u32, data: &[u8]) -> FwlResult<usize>;

    /// Erase the page(s) covering `[addr, addr + length)`. `addr` is page aligned.
    fn on_erase(&mut self, addr: u32, length: u16) -> FwlResult<()>;

    /// Fire-and-forget notification. Must not block.
    fn on_status(&mut self, _status: Status) {}
}

impl<D: FlashDriver + ?Sized> FlashDriver for &mut D {
    fn on_ready(&mut self) -> bool { (**self).on_ready() }
    fn on_read(&mut self, addr: u32, buf: &mut [u8]) -> FwlResult<usize> { (**self).on_read(addr, buf) }
    fn on_write(&mut self, addr: u32, data: &[u8]) -> FwlResult<usize> { (**self).on_write(addr, data) }
    fn on_erase(&mut self, addr: u32, length: u16) -> FwlResult<()> { (**self).on_erase(addr, length) }
    fn on_status(&mut self, status: Status) { (**self).on_status(status) }
}
