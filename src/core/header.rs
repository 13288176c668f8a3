//! Book control header (block 1)
//!
//! The control header is one 2048-byte block: a big-endian entry count at
//! offset 0 followed, from offset 16, by one 16-byte [`ControlEntry`] per
//! component type.

use crate::block::BLOCK_SIZE;
use byteorder::{BigEndian, ByteOrder};

/// Size of the control header in bytes
pub const HEADER_SIZE: usize = BLOCK_SIZE as usize;

/// Size of one control entry in bytes
pub const ENTRY_SIZE: usize = 16;

/// Offset of the first control entry
pub const FIRST_ENTRY_OFFSET: usize = 16;

/// One component directory record
///
/// # Layout
///
/// ```text
/// +0        type id
/// +1        0x00
/// +2..+5    start block (u32, big-endian)
/// +6..+8    block count >> 8 (top three bytes of a big-endian u32)
/// +9        param & 0xff
/// +10..+12  param >> 24, param >> 16, param >> 8
/// +13       param & 0xff
/// +14..+15  0x00
/// ```
///
/// The low byte of the block count is never stored and the low byte of the
/// parameter appears twice. Readers of the format expect exactly this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEntry {
    pub type_id: u8,
    pub start_block: u32,
    pub block_count: u32,
    pub param: u32,
}

impl ControlEntry {
    pub fn new(type_id: u8, start_block: u64, block_count: u64, param: u32) -> Self {
        ControlEntry {
            type_id,
            start_block: start_block as u32,
            block_count: block_count as u32,
            param,
        }
    }

    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let mut b = [0u8; ENTRY_SIZE];
        b[0] = self.type_id;
        BigEndian::write_u32(&mut b[2..6], self.start_block);
        b[6] = (self.block_count >> 24) as u8;
        b[7] = (self.block_count >> 16) as u8;
        b[8] = (self.block_count >> 8) as u8;
        b[9] = self.param as u8;
        b[10] = (self.param >> 24) as u8;
        b[11] = (self.param >> 16) as u8;
        b[12] = (self.param >> 8) as u8;
        b[13] = self.param as u8;
        b
    }

    /// Decode an entry.
    ///
    /// The stored block count is truncated, so the value read back is the
    /// written count with its low byte cleared.
    pub fn from_bytes(b: &[u8]) -> Option<Self> {
        if b.len() < ENTRY_SIZE {
            return None;
        }
        Some(ControlEntry {
            type_id: b[0],
            start_block: BigEndian::read_u32(&b[2..6]),
            block_count: BigEndian::read_u32(&[b[6], b[7], b[8], 0]),
            param: BigEndian::read_u32(&b[10..14]),
        })
    }
}

/// The control header block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlHeader {
    pub entries: Vec<ControlEntry>,
}

impl ControlHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ControlEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to one zero-filled block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut block = vec![0u8; HEADER_SIZE];
        BigEndian::write_u16(&mut block[0..2], self.entries.len() as u16);

        for (i, entry) in self.entries.iter().enumerate() {
            let off = FIRST_ENTRY_OFFSET + i * ENTRY_SIZE;
            if off + ENTRY_SIZE > HEADER_SIZE {
                break;
            }
            block[off..off + ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        }
        block
    }

    pub fn from_bytes(block: &[u8]) -> Option<Self> {
        if block.len() < FIRST_ENTRY_OFFSET {
            return None;
        }
        let count = BigEndian::read_u16(&block[0..2]) as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let off = FIRST_ENTRY_OFFSET + i * ENTRY_SIZE;
            entries.push(ControlEntry::from_bytes(block.get(off..off + ENTRY_SIZE)?)?);
        }
        Some(ControlHeader { entries })
    }
}
