//! Component slots of a book

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the nine component kinds a book may carry.
///
/// The derived ordering is the canonical layout order: control entries and
/// component data always follow it, whatever order slots were configured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Body,
    Menu,
    Copyright,
    Head,
    Word,
    Endword,
    Keyword,
    Graphic,
    Sound,
}

/// Parameter word for text-like components
const TEXT_PARAM: u32 = 0x0200_0000;
/// Parameter word for search index components
const INDEX_PARAM: u32 = 0x0241_5554;

impl Slot {
    pub const ALL: [Slot; 9] = [
        Slot::Body,
        Slot::Menu,
        Slot::Copyright,
        Slot::Head,
        Slot::Word,
        Slot::Endword,
        Slot::Keyword,
        Slot::Graphic,
        Slot::Sound,
    ];

    /// Control-entry type ids for this slot.
    ///
    /// Headings are listed twice, under two type ids sharing one block range.
    pub fn type_ids(self) -> &'static [u8] {
        match self {
            Slot::Body => &[0x00],
            Slot::Menu => &[0x01],
            Slot::Copyright => &[0x02],
            Slot::Head => &[0x05, 0x07],
            Slot::Word => &[0x91],
            Slot::Endword => &[0x71],
            Slot::Keyword => &[0x80],
            Slot::Graphic => &[0xd2],
            Slot::Sound => &[0xd8],
        }
    }

    pub fn param(self) -> u32 {
        match self {
            Slot::Body | Slot::Menu | Slot::Copyright | Slot::Head => TEXT_PARAM,
            Slot::Word | Slot::Endword | Slot::Keyword => INDEX_PARAM,
            Slot::Graphic | Slot::Sound => 0,
        }
    }

    /// Search index slots are split into one file per trie level.
    pub fn is_sharded(self) -> bool {
        matches!(self, Slot::Word | Slot::Endword | Slot::Keyword)
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Body => "body",
            Slot::Menu => "menu",
            Slot::Copyright => "copyright",
            Slot::Head => "head",
            Slot::Word => "word",
            Slot::Endword => "endword",
            Slot::Keyword => "keyword",
            Slot::Graphic => "graphic",
            Slot::Sound => "sound",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_all() {
        let mut sorted = Slot::ALL;
        sorted.sort();
        assert_eq!(sorted, Slot::ALL);
    }

    #[test]
    fn test_only_indexes_are_sharded() {
        let sharded: Vec<_> = Slot::ALL.iter().filter(|s| s.is_sharded()).collect();
        assert_eq!(sharded, vec![&Slot::Word, &Slot::Endword, &Slot::Keyword]);
    }

    #[test]
    fn test_head_has_two_entries() {
        assert_eq!(Slot::Head.type_ids(), &[0x05, 0x07]);
        let total: usize = Slot::ALL.iter().map(|s| s.type_ids().len()).sum();
        assert_eq!(total, 10);
    }
}
