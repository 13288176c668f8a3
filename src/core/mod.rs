//! Linker engine

pub mod block;
pub mod error;
pub mod header;
pub mod linker;
pub mod manifest;
pub mod output;
pub mod patch;
pub mod position;
pub mod reference;
pub mod shard;
pub mod slot;
pub mod stream;

pub use linker::{BookAssembler, Layout, LinkReport, SlotLayout};
