use crate::{FwlError, FwlResult, ERASED_BYTE, HEADER_END, HEADER_MAGIC};

/// On-medium record header. Little-endian, 16 bytes:
///
/// ```text
/// 0..4    checksum
/// 4..8    next_addr
/// 8..12   prev_addr
/// 12..14  data_length
/// 14..16  type_tag
/// ```
///
/// The checksum covers bytes `4..16` followed by the payload. The address of
/// the header itself is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub checksum: u32,
    pub next_addr: u32,
    pub prev_addr: u32,
    pub data_length: u16,
    pub type_tag: u16,
}

impl RecordHeader {
    pub const SIZE: usize = 16;
    /// Bytes of the header covered by the checksum.
    pub const COVERED: core::ops::Range<usize> = 4..16;

    /// Header of the empty log: no record, successor unknown.
    pub fn empty(start_addr: u32) -> Self {
        Self {
            checksum: 0,
            next_addr: HEADER_END,
            prev_addr: start_addr,
            data_length: 0,
            type_tag: 0,
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.type_tag == HEADER_MAGIC
    }

    pub fn has_successor(&self) -> bool {
        self.next_addr != HEADER_END
    }

    pub fn to_bytes(&self, buf: &mut [u8]) -> FwlResult<()> {
        if buf.len() < Self::SIZE { return Err(FwlError::SizeExceeded); }
        buf[..Self::SIZE].copy_from_slice(&self.encode());
        Ok(())
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut raw = [0u8; Self::SIZE];
        raw[0..4].copy_from_slice(&self.checksum.to_le_bytes());
        raw[4..8].copy_from_slice(&self.next_addr.to_le_bytes());
        raw[8..12].copy_from_slice(&self.prev_addr.to_le_bytes());
        raw[12..14].copy_from_slice(&self.data_length.to_le_bytes());
        raw[14..16].copy_from_slice(&self.type_tag.to_le_bytes());
        raw
    }

    /// Decodes the fields without judging them; validation belongs to the
    /// recovery scan.
    pub fn from_bytes(buf: &[u8]) -> FwlResult<Self> {
        if buf.len() < Self::SIZE { return Err(FwlError::SizeExceeded); }
        Ok(Self {
            checksum: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            next_addr: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            prev_addr: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            data_length: u16::from_le_bytes([buf[12], buf[13]]),
            type_tag: u16::from_le_bytes([buf[14], buf[15]]),
        })
    }

    /// The checksum-covered bytes as they sit on the medium.
    pub fn covered(&self) -> [u8; 12] {
        let raw = self.encode();
        let mut out = [0u8; 12];
        out.copy_from_slice(&raw[Self::COVERED]);
        out
    }

    /// A never-programmed slot: the clean end of the log.
    pub fn is_erased(buf: &[u8]) -> bool {
        buf.len() >= Self::SIZE && buf[..Self::SIZE].iter().all(|&b| b == ERASED_BYTE)
    }
}

/// Diagnostic snapshot of the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordMetadata {
    pub addr: u32,
    pub next_addr: u32,
    pub prev_addr: u32,
    pub data_length: u16,
    pub type_tag: u16,
    pub checksum: u32,
}

impl RecordMetadata {
    pub fn new(addr: u32, header: &RecordHeader) -> Self {
        Self {
            addr,
            next_addr: header.next_addr,
            prev_addr: header.prev_addr,
            data_length: header.data_length,
            type_tag: header.type_tag,
            checksum: header.checksum,
        }
    }

    /// Bytes the record occupies on the medium, header included.
    pub fn span(&self) -> usize {
        RecordHeader::SIZE + self.data_length as usize
    }
}
