use fwl_core::{FwlError, FwlResult, Status};
use fwl_hal::FlashDriver;

struct Blank {
    cells: [u8; 64],
    last_status: Option<Status>,
}

impl FlashDriver for Blank {
    fn on_read(&mut self, addr: u32, buf: &mut [u8]) -> FwlResult<usize> {
        let start = addr as usize;
        let src = self.cells.get(start..start + buf.len()).ok_or(FwlError::Io)?;
        buf.copy_from_slice(src);
        Ok(buf.len())
    }
    fn on_write(&mut self, addr: u32, data: &[u8]) -> FwlResult<usize> {
        let start = addr as usize;
        let dst = self.cells.get_mut(start..start + data.len()).ok_or(FwlError::Io)?;
        dst.copy_from_slice(data);
        Ok(data.len())
    }
    fn on_erase(&mut self, _addr: u32, _length: u16) -> FwlResult<()> {
        self.cells.fill(0xFF);
        Ok(())
    }
    fn on_status(&mut self, status: Status) {
        self.last_status = Some(status);
    }
}

#[test]
fn test_trait_object_safety() {
    let mut dev = Blank { cells: [0u8; 64], last_status: None };
    let obj: &mut dyn FlashDriver = &mut dev;

    assert!(obj.on_ready()); // default
    assert_eq!(obj.on_write(4, &[1, 2, 3]).unwrap(), 3);

    let mut buf = [0u8; 3];
    assert_eq!(obj.on_read(4, &mut buf).unwrap(), 3);
    assert_eq!(buf, [1, 2, 3]);
    assert_eq!(obj.on_read(62, &mut buf), Err(FwlError::Io));
}

#[test]
fn test_borrowed_driver_forwards() {
    fn wipe<D: FlashDriver>(mut driver: D) {
        driver.on_erase(0, 64).unwrap();
        driver.on_status(Status::WriteOk);
    }

    let mut dev = Blank { cells: [0u8; 64], last_status: None };
    wipe(&mut dev);
    assert!(dev.cells.iter().all(|&b| b == 0xFF));
    assert_eq!(dev.last_status, Some(Status::WriteOk));
}
