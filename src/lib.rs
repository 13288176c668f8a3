//! # eblink - EB Book Linker
//!
//! `eblink` assembles a block-structured EB dictionary book from the component
//! files written by an upstream encoder (body text, menu, copyright, headings,
//! three kinds of search index, graphics and sound).
//!
//! - **Block layout**: every component starts on a 2048-byte block; a control
//!   header in block 1 records each component's type, start block and size
//! - **Reference relocation**: placeholder bytes left by the encoder are
//!   rewritten in place with final `(block, offset)` addresses, packed decimal
//!   in text components and plain binary in index pages
//! - **Multi-level indexes**: index components made of one file per trie
//!   level are discovered on disk, sized and written highest level first
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eblink::{LinkerBuilder, Position, ReferenceTable, Result, Slot};
//!
//! # fn main() -> Result<()> {
//! let mut refs = ReferenceTable::new();
//! refs.put_body_tag("entry-1", Position::new("work/body", 0));
//! refs.put_body_ref(Position::new("work/head", 12), "entry-1");
//!
//! let mut book = LinkerBuilder::new()
//!     .output("out/honmon")
//!     .slot(Slot::Body, "work/body")
//!     .slot(Slot::Head, "work/head")
//!     .references(refs)
//!     .build()?;
//!
//! book.link()?;
//! println!("{:?}", book.report());
//! book.delete();
//! # Ok(())
//! # }
//! ```

// Linker implementation
pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    block, error, header, linker, manifest, output, patch, position, reference, shard, slot,
    stream,
};

// Re-export types that users need
pub use crate::core::{
    block::{bcd2, bcd4, block_count, to_block_offset, AddressEncoding, BlockAddress, BLOCK_SIZE},
    error::{LinkError, ResolveError, Result},
    header::{ControlEntry, ControlHeader},
    linker::{BookAssembler, Layout, LinkReport, SlotLayout},
    manifest::BookManifest,
    position::Position,
    reference::{Namespace, Reference, ReferenceTable, Tag},
    shard::ShardedIndexResolver,
    slot::Slot,
    stream::{LogicalStream, Shard},
};

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Builder for [`BookAssembler`]
///
/// # Examples
///
/// ```rust,no_run
/// use eblink::{LinkerBuilder, Slot};
///
/// # fn main() -> eblink::Result<()> {
/// let mut book = LinkerBuilder::new()
///     .output("out/honmon")
///     .slot(Slot::Body, "work/body")
///     .slot(Slot::Word, "work/word")
///     .build()?;
/// book.link()?;
/// # Ok(())
/// # }
/// ```
pub struct LinkerBuilder {
    output: Option<PathBuf>,
    slots: BTreeMap<Slot, PathBuf>,
    references: Option<ReferenceTable>,
}

impl LinkerBuilder {
    pub fn new() -> Self {
        LinkerBuilder {
            output: None,
            slots: BTreeMap::new(),
            references: None,
        }
    }

    /// Set the path of the linked book
    pub fn output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Bind a component file (or index base name) to a slot
    pub fn slot<P: Into<PathBuf>>(mut self, slot: Slot, path: P) -> Self {
        self.slots.insert(slot, path.into());
        self
    }

    pub fn references(mut self, references: ReferenceTable) -> Self {
        self.references = Some(references);
        self
    }

    pub fn build(self) -> Result<BookAssembler> {
        let output = self.output.ok_or(LinkError::MissingOutput)?;
        info!(
            "Building linker for {:?} with {} components",
            output,
            self.slots.len()
        );

        let mut book = BookAssembler::new(output);
        for (slot, path) in self.slots {
            book.set_file(slot, path);
        }
        if let Some(references) = self.references {
            book.set_reference_table(references);
        }
        Ok(book)
    }
}

impl Default for LinkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
