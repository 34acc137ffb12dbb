/// Fixed-size value that can be stored as a record payload.
///
/// Encoding is little-endian so records written by the MCU read back
/// unchanged on a host.
pub trait Entry: Sized {
    const SIZE: usize;

    /// `buf` is at least `SIZE` bytes.
    fn encode(&self, buf: &mut [u8]);

    /// Returns `None` when `buf` is not exactly `SIZE` bytes.
    fn decode(buf: &[u8]) -> Option<Self>;
}

macro_rules! int_entry {
    ($($t:ty),*) => {$(
        impl Entry for $t {
            const SIZE: usize = core::mem::size_of::<$t>();

            fn encode(&self, buf: &mut [u8]) {
                buf[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            fn decode(buf: &[u8]) -> Option<Self> {
                let raw: [u8; core::mem::size_of::<$t>()] = buf.try_into().ok()?;
                Some(<$t>::from_le_bytes(raw))
            }
        }
    )*};
}

int_entry!(u8, u16, u32, u64, i8, i16, i32, i64);

impl<const K: usize> Entry for [u8; K] {
    const SIZE: usize = K;

    fn encode(&self, buf: &mut [u8]) {
        buf[..K].copy_from_slice(self);
    }

    fn decode(buf: &[u8]) -> Option<Self> {
        buf.try_into().ok()
    }
}
