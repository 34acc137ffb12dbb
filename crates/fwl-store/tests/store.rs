use fwl_core::{FwlError, RecordMetadata, Region, Status, HEADER_END, HEADER_MAGIC};
use fwl_linux::RamFlash;
use fwl_store::{Recovery, RecordStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn open<const N: usize>(region: Region) -> RecordStore<RamFlash, N> {
    RecordStore::new(RamFlash::new(&region), region).unwrap()
}

#[test]
fn test_three_u32_records() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);
    assert_eq!(store.begin().unwrap(), Recovery::Empty);

    let a = store.write_entry(&1u32).unwrap();
    let b = store.write_entry(&2u32).unwrap();
    let c = store.write_entry(&3u32).unwrap();

    assert_eq!((a.addr, a.next_addr), (0, 20));
    assert_eq!((b.addr, b.next_addr, b.prev_addr), (20, 40, 0));
    assert_eq!((c.addr, c.next_addr, c.prev_addr), (40, 60, 20));

    assert_eq!(store.read_entry::<u32>().unwrap(), 3);
    let info = store.info();
    assert_eq!(info.data_length, 4);
    assert_eq!(info.type_tag, HEADER_MAGIC);
    assert_eq!(info, c);
}

#[test]
fn test_chain_integrity() {
    let region = Region::new(0x1000, 1024, 64).unwrap();
    let mut store = open::<16>(region);
    store.begin().unwrap();

    let mut written: Vec<RecordMetadata> = Vec::new();
    for i in 0..10u8 {
        let payload = vec![i; i as usize];
        let meta = store.write(&payload).unwrap();
        if let Some(prev) = written.last() {
            assert_eq!(meta.prev_addr, prev.addr);
            assert_eq!(prev.next_addr, meta.addr);
        }
        assert_eq!(meta.next_addr, meta.addr + meta.span() as u32);
        written.push(meta);
    }
    assert_eq!(written[0].addr, 0x1000);

    let mut walked = Vec::new();
    assert_eq!(store.walk(|m| walked.push(m)).unwrap(), 10);
    assert_eq!(walked, written);
}

#[test]
fn test_random_round_trip_across_wraps() {
    let region = Region::new(0x8000, 4096, 256).unwrap();
    let mut store = open::<256>(region);
    store.begin_or_format().unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let mut last: Vec<u8> = Vec::new();
    let mut wraps = 0;
    for _ in 0..200 {
        let len: usize = rng.gen_range(0..=256);
        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let before = store.info();

        // Strict flash: a missing erase would fail the write.
        let meta = nb::block!(store.write(&payload)).unwrap();
        if meta.addr < before.addr {
            wraps += 1;
        }

        let mut buf = [0u8; 256];
        let n = nb::block!(store.read(&mut buf)).unwrap();
        assert_eq!(&buf[..n], &payload[..]);
        last = payload;
    }
    assert!(wraps > 0);

    // Next boot sees the same tail.
    let expected = store.info();
    let flash = store.release();
    let mut store: RecordStore<RamFlash> = RecordStore::new(flash, region).unwrap();
    assert!(matches!(store.begin().unwrap(), Recovery::Positioned { .. }));
    assert_eq!(store.info(), expected);

    let mut buf = [0u8; 256];
    let n = store.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], &last[..]);
}

#[test]
fn test_small_buffer() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<8>(region);
    store.write(b"abcd").unwrap();
    let before = store.info();

    let mut buf = [0u8; 3];
    let res = store.read(&mut buf);
    assert!(matches!(res, Err(nb::Error::Other(FwlError::SizeExceeded))));
    assert_eq!(store.info(), before);
    assert_eq!(store.driver().statuses().last(), Some(&Status::SizeError));

    let mut buf = [0u8; 4];
    assert_eq!(store.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf, b"abcd");
}

#[test]
fn test_oversized_payload_touches_nothing() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);

    let res = store.write(&[0u8; 5]);
    assert!(matches!(res, Err(nb::Error::Other(FwlError::SizeExceeded))));
    assert!(store.is_empty());
    assert_eq!(store.driver().erase_count(), 0);
    assert!(store.driver().peek(0, 32).iter().all(|&b| b == 0xFF));

    // A value wider than N is refused the same way.
    let res = store.write_entry(&7u64);
    assert!(matches!(res, Err(nb::Error::Other(FwlError::SizeExceeded))));
}

#[test]
fn test_record_larger_than_region() {
    let region = Region::new(0, 32, 16).unwrap();
    let mut store = open::<64>(region);

    let res = store.write(&[1u8; 20]);
    assert!(matches!(res, Err(nb::Error::Other(FwlError::SizeExceeded))));
    assert!(store.write(&[1u8; 16]).is_ok());
}

#[test]
fn test_empty_log_read() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);
    assert_eq!(store.begin().unwrap(), Recovery::Empty);

    let info = store.info();
    assert_eq!(info.addr, 0);
    assert_eq!(info.prev_addr, 0);
    assert_eq!(info.next_addr, HEADER_END);

    let mut buf = [0u8; 4];
    assert!(matches!(store.read(&mut buf), Err(nb::Error::Other(FwlError::NotFound))));
}

#[test]
fn test_empty_payload() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);

    let meta = store.write(&[]).unwrap();
    assert_eq!((meta.addr, meta.next_addr, meta.data_length), (0, 16, 0));
    assert_eq!(store.read(&mut []).unwrap(), 0);

    let meta = store.write(b"x").unwrap();
    assert_eq!(meta.addr, 16);
}

#[test]
fn test_entry_length_mismatch() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<8>(region);
    store.write(b"abc").unwrap();

    let res = store.read_entry::<u32>();
    assert!(matches!(res, Err(nb::Error::Other(FwlError::TypeMismatch))));

    store.write_entry(&[9u8; 3]).unwrap();
    assert_eq!(store.read_entry::<[u8; 3]>().unwrap(), [9, 9, 9]);
}

#[test]
fn test_not_ready_is_would_block() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);
    store.write_entry(&1u32).unwrap();
    let before = store.info();

    store.driver_mut().set_ready(false);
    assert!(matches!(store.write(b"zz"), Err(nb::Error::WouldBlock)));
    assert!(matches!(store.read(&mut [0u8; 4]), Err(nb::Error::WouldBlock)));
    assert!(matches!(store.begin(), Err(nb::Error::WouldBlock)));
    assert!(matches!(store.format(), Err(nb::Error::WouldBlock)));
    assert_eq!(store.info(), before);
    assert!(store.driver().peek(20, 16).iter().all(|&b| b == 0xFF));

    store.driver_mut().set_ready(true);
    assert_eq!(store.read_entry::<u32>().unwrap(), 1);
}

#[test]
fn test_status_notifications() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);
    store.begin().unwrap();
    assert!(store.driver().statuses().is_empty()); // erased slot ends the scan quietly

    store.write(b"ok").unwrap();
    store.read(&mut [0u8; 4]).unwrap();
    assert_eq!(store.driver().statuses(), &[Status::WriteOk, Status::ReadOk]);
}

#[test]
fn test_format_resets() {
    let region = Region::new(0, 256, 64).unwrap();
    let mut store = open::<4>(region);
    for v in 0..5u32 {
        store.write_entry(&v).unwrap();
    }
    assert!(!store.is_empty());

    store.format().unwrap();
    assert!(store.is_empty());
    assert_eq!(store.info().next_addr, HEADER_END);
    assert!(store.driver().erased_pages().contains(&0));

    assert_eq!(store.begin().unwrap(), Recovery::Empty);

    // Log starts over at the region start.
    assert_eq!(store.write_entry(&99u32).unwrap().addr, 0);
    assert_eq!(store.begin().unwrap(), Recovery::Positioned { records: 1 });
}

#[test]
fn test_invalid_payload_bound() {
    let region = Region::new(0, 256, 64).unwrap();
    let res: Result<RecordStore<RamFlash, 70_000>, _> = RecordStore::new(RamFlash::new(&region), region);
    assert_eq!(res.err(), Some(FwlError::InvalidConfig));
}

#[test]
fn test_region_with_partial_last_page() {
    // 100 bytes in 64-byte pages: only the first page is erasable.
    let region = Region::new(0, 100, 64).unwrap();
    let mut store = open::<48>(region);
    store.format().unwrap();

    let meta = store.write(&[7u8; 48]).unwrap();
    assert_eq!((meta.addr, meta.next_addr), (0, 64));

    // The slot at 64 lies in the partial page, so the next record wraps.
    let meta = store.write(&[8u8; 4]).unwrap();
    assert_eq!((meta.addr, meta.next_addr, meta.prev_addr), (0, 20, 0));
    assert_eq!(store.driver().erased_pages(), &[0, 0]);

    let mut store: RecordStore<RamFlash, 48> = RecordStore::new(store.release(), region).unwrap();
    assert_eq!(store.begin().unwrap(), Recovery::Positioned { records: 1 });
    assert_eq!(store.read_entry::<[u8; 4]>().unwrap(), [8; 4]);

    // 200 bytes: one record fills the three whole pages.
    let region = Region::new(0, 200, 64).unwrap();
    let mut store = open::<176>(region);
    store.format().unwrap();
    let meta = store.write(&[1u8; 176]).unwrap();
    assert_eq!((meta.addr, meta.next_addr), (0, 192));
    assert_eq!(store.driver().erased_pages(), &[0, 64, 128]);
}
