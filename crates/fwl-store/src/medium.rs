use fwl_core::{FwlError, FwlResult};
use fwl_hal::FlashDriver;
use log::warn;

// Short transfers count as I/O failures: a record is either whole or absent.

pub(crate) fn read_exact<D: FlashDriver>(driver: &mut D, addr: u32, buf: &mut [u8]) -> FwlResult<()> {
    match driver.on_read(addr, buf) {
        Ok(n) if n == buf.len() => Ok(()),
        Ok(n) => {
            warn!("[FLASH] short read at {:#010x}: {}/{}", addr, n, buf.len());
            Err(FwlError::Io)
        }
        Err(e) => {
            warn!("[FLASH] read at {:#010x} failed: {}", addr, e);
            Err(FwlError::Io)
        }
    }
}

pub(crate) fn write_all<D: FlashDriver>(driver: &mut D, addr: u32, data: &[u8]) -> FwlResult<()> {
    match driver.on_write(addr, data) {
        Ok(n) if n == data.len() => Ok(()),
        Ok(n) => {
            warn!("[FLASH] short write at {:#010x}: {}/{}", addr, n, data.len());
            Err(FwlError::Io)
        }
        Err(e) => {
            warn!("[FLASH] write at {:#010x} failed: {}", addr, e);
            Err(FwlError::Io)
        }
    }
}
