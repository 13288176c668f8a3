//! Property-based tests for block addressing and packed decimal encoding

use eblink::{bcd2, bcd4, block_count, to_block_offset, AddressEncoding, BlockAddress, BLOCK_SIZE};
use proptest::prelude::*;

/// Read packed decimal nibbles back into a number
fn unpack(mut packed: u64, digits: u32) -> u64 {
    let mut value = 0;
    let mut scale = 1;
    for _ in 0..digits {
        value += (packed & 0xf) * scale;
        packed >>= 4;
        scale *= 10;
    }
    value
}

proptest! {
    #[test]
    fn prop_bcd4_keeps_eight_digits(value in 0u64..=99_999_999) {
        let packed = bcd4(value);
        prop_assert_eq!(unpack(packed as u64, 8), value);
        // every nibble is a decimal digit
        for shift in (0..32).step_by(4) {
            prop_assert!((packed >> shift) & 0xf <= 9);
        }
    }

    #[test]
    fn prop_bcd2_keeps_four_digits(value in 0u64..=9999) {
        prop_assert_eq!(unpack(bcd2(value) as u64, 4), value);
    }

    #[test]
    fn prop_bcd_truncates_high_digits(value in 0u64..=u32::MAX as u64) {
        prop_assert_eq!(unpack(bcd4(value) as u64, 8), value % 100_000_000);
        prop_assert_eq!(unpack(bcd2(value) as u64, 4), value % 10_000);
    }

    #[test]
    fn prop_block_offset_round_trips_position(pos in 0u64..(1u64 << 40)) {
        let (block, offset) = to_block_offset(pos);
        prop_assert!(block >= 1);
        prop_assert!((offset as u64) < BLOCK_SIZE);
        prop_assert_eq!((block - 1) * BLOCK_SIZE + offset as u64, pos);
    }

    #[test]
    fn prop_block_count_covers_length(len in 0u64..(1u64 << 40)) {
        let count = block_count(len);
        prop_assert!(count * BLOCK_SIZE >= len);
        if len > 0 {
            prop_assert!((count - 1) * BLOCK_SIZE < len);
        } else {
            prop_assert_eq!(count, 0);
        }
    }

    #[test]
    fn prop_binary_and_bcd_agree_on_small_offsets(block in 1u64..=9999, offset in 0u16..=9) {
        // single decimal digits look the same in both encodings
        let addr = BlockAddress { block, offset };
        let bcd = AddressEncoding::Bcd.encode(addr);
        let binary = AddressEncoding::Binary.encode(addr);
        prop_assert_eq!(&bcd[4..6], &binary[4..6]);
        prop_assert_eq!(unpack(u32::from_be_bytes([bcd[0], bcd[1], bcd[2], bcd[3]]) as u64, 8), block);
        prop_assert_eq!(u32::from_be_bytes([binary[0], binary[1], binary[2], binary[3]]) as u64, block);
    }
}
