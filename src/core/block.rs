//! Block address arithmetic
//!
//! A book is addressed in fixed 2048-byte blocks. Every forward reference is
//! written as a `(block, offset)` pair, either as plain big-endian integers or
//! as packed decimal (BCD), depending on which component holds the reference.

use byteorder::{BigEndian, ByteOrder};

/// Size of one book block in bytes
pub const BLOCK_SIZE: u64 = 2048;

/// First block available to component data.
///
/// Block 0 is the catalog and block 1 the control header; neither is written
/// by the linker's component stream.
pub const FIRST_DATA_BLOCK: u64 = 2;

/// A resolved `(block, in-block offset)` address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAddress {
    pub block: u64,
    pub offset: u16,
}

impl BlockAddress {
    /// Split a linear byte position into a block address.
    ///
    /// The block number is one-based relative to the control header, hence
    /// `pos / 2048 + 1`.
    pub fn from_position(pos: u64) -> Self {
        BlockAddress {
            block: pos / BLOCK_SIZE + 1,
            offset: (pos % BLOCK_SIZE) as u16,
        }
    }
}

/// Convert a byte position into `(block, offset)`.
pub fn to_block_offset(pos: u64) -> (u64, u16) {
    let addr = BlockAddress::from_position(pos);
    (addr.block, addr.offset)
}

/// Number of blocks needed to hold `len` bytes.
pub fn block_count(len: u64) -> u64 {
    len.div_ceil(BLOCK_SIZE)
}

/// Pack the low 8 decimal digits of `value` into nibbles.
///
/// Digits beyond the eighth are dropped.
pub fn bcd4(value: u64) -> u32 {
    pack_decimal(value, 8) as u32
}

/// Pack the low 4 decimal digits of `value` into nibbles.
///
/// Digits beyond the fourth are dropped.
pub fn bcd2(value: u64) -> u16 {
    pack_decimal(value, 4) as u16
}

fn pack_decimal(mut value: u64, digits: u32) -> u64 {
    let mut packed = 0u64;
    for nibble in 0..digits {
        packed |= (value % 10) << (nibble * 4);
        value /= 10;
    }
    packed
}

/// How an address is laid down at a reference site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressEncoding {
    /// Plain big-endian integers (search index pages)
    Binary,
    /// Packed decimal (text, menu, headings, media)
    Bcd,
}

impl AddressEncoding {
    /// Encode a block address as `[block:4][offset:2]`.
    pub fn encode(self, addr: BlockAddress) -> [u8; 6] {
        let (block, offset) = match self {
            AddressEncoding::Binary => (addr.block as u32, addr.offset),
            AddressEncoding::Bcd => (bcd4(addr.block), bcd2(addr.offset as u64)),
        };
        let mut buf = [0u8; 6];
        BigEndian::write_u32(&mut buf[0..4], block);
        BigEndian::write_u16(&mut buf[4..6], offset);
        buf
    }

    /// Encode a playback range as `[start:6][end:6]`.
    pub fn encode_range(self, start: BlockAddress, end: BlockAddress) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[0..6].copy_from_slice(&self.encode(start));
        buf[6..12].copy_from_slice(&self.encode(end));
        buf
    }
}
