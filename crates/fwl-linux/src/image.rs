use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use fwl_core::{FwlError, FwlResult, Region, ERASED_BYTE};
use fwl_hal::FlashDriver;

/// Flash image kept in a host file. Byte 0 of the file is the region start.
pub struct FileFlash {
    file: File,
    path: PathBuf,
    base: u32,
    size: u64,
    page_size: u16,
}

impl FileFlash {
    /// Open the image, creating an erased one when the file does not exist.
    pub fn open(path: impl AsRef<Path>, region: &Region) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let size = region.size() as u64;
        let fresh = !path.exists();

        let mut file = OpenOptions::new()
            .read(true).write(true).create(true)
            .open(&path)?;

        if fresh {
            file.write_all(&vec![ERASED_BYTE; region.size()])?;
            file.sync_all()?;
            info!("[IMAGE] created {} ({} bytes)", path.display(), size);
        } else {
            let len = file.metadata()?.len();
            if len != size {
                anyhow::bail!("{} is {} bytes, region needs {}", path.display(), len, size);
            }
        }

        Ok(Self { file, path, base: region.start_addr(), size, page_size: region.page_size() })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn offset(&self, addr: u32, len: usize) -> FwlResult<u64> {
        let off = addr.checked_sub(self.base).ok_or(FwlError::Io)? as u64;
        if off + len as u64 > self.size {
            return Err(FwlError::Io);
        }
        Ok(off)
    }

    fn read_at(&mut self, off: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(off))?;
        self.file.read_exact(buf)
    }

    fn write_at(&mut self, off: u64, data: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(off))?;
        self.file.write_all(data)?;
        self.file.sync_data()
    }
}

fn io_failed(op: &str, addr: u32, e: std::io::Error) -> FwlError {
    warn!("[IMAGE] {} at {:#010x} failed: {}", op, addr, e);
    FwlError::Io
}

impl FlashDriver for FileFlash {
    fn on_read(&mut self, addr: u32, buf: &mut [u8]) -> FwlResult<usize> {
        let off = self.offset(addr, buf.len())?;
        self.read_at(off, buf).map_err(|e| io_failed("read", addr, e))?;
        Ok(buf.len())
    }

    fn on_write(&mut self, addr: u32, data: &[u8]) -> FwlResult<usize> {
        let off = self.offset(addr, data.len())?;
        // NOR: programming can only clear bits.
        let mut cells = vec![0u8; data.len()];
        self.read_at(off, &mut cells).map_err(|e| io_failed("write", addr, e))?;
        for (cell, byte) in cells.iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.write_at(off, &cells).map_err(|e| io_failed("write", addr, e))?;
        Ok(data.len())
    }

    fn on_erase(&mut self, addr: u32, length: u16) -> FwlResult<()> {
        if addr % self.page_size as u32 != 0 {
            return Err(FwlError::Io);
        }
        let len = (length as usize).max(self.page_size as usize);
        let off = self.offset(addr, len)?;
        self.write_at(off, &vec![ERASED_BYTE; len]).map_err(|e| io_failed("erase", addr, e))
    }
}
