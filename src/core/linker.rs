//! Book assembler
//!
//! Links independently encoded component files into one book:
//!
//! 1. **Layout**: assign every configured slot a block range, in canonical
//!    slot order starting at block 2, and build the control header.
//! 2. **Resolution**: rewrite every recorded reference site in place with the
//!    final address of its target (body, head, index, graphic, sound).
//! 3. **Concatenation**: write the control header followed by each component,
//!    every physical file padded to a block boundary.
//!
//! Per-reference and per-file problems are logged and skipped so that one
//! bad reference does not throw away a whole build. Only failing to write the
//! output book aborts [`BookAssembler::link`].

use crate::block::{block_count, AddressEncoding, BlockAddress, BLOCK_SIZE, FIRST_DATA_BLOCK};
use crate::error::{LinkError, ResolveError, Result};
use crate::header::{ControlEntry, ControlHeader};
use crate::output::BlockWriter;
use crate::patch::PatchWriter;
use crate::position::Position;
use crate::reference::{Namespace, ReferenceTable};
use crate::shard::ShardedIndexResolver;
use crate::slot::Slot;
use crate::stream::{file_name, list_shards, parent_dir, LogicalStream};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Namespaces in the order they are resolved
const RESOLVE_ORDER: [Namespace; 5] = [
    Namespace::Body,
    Namespace::Head,
    Namespace::Index,
    Namespace::Graphic,
    Namespace::Sound,
];

/// Block range assigned to one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLayout {
    pub slot: Slot,
    pub start_block: u64,
    pub block_count: u64,
    /// Physical files in concatenation order, with their lengths at layout time
    pub files: Vec<(PathBuf, u64)>,
}

/// Block layout of a whole book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub header: ControlHeader,
    pub slots: BTreeMap<Slot, SlotLayout>,
}

impl Layout {
    pub fn start_block(&self, slot: Slot) -> Option<u64> {
        self.slots.get(&slot).map(|s| s.start_block)
    }

    /// First block after the last component
    pub fn end_block(&self) -> u64 {
        self.slots
            .values()
            .map(|s| s.start_block + s.block_count)
            .max()
            .unwrap_or(FIRST_DATA_BLOCK)
    }
}

/// Outcome of a link run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Patches written
    pub resolved: usize,
    /// References whose tag is not defined
    pub unresolved: usize,
    /// Index references with an unusable file name or block number
    pub malformed: usize,
    /// Positions in files that belong to no configured slot
    pub unknown_files: usize,
    /// Patch writes that failed or would run past the end of their file
    pub failed_patches: usize,
    /// Component files that could not be copied completely
    pub failed_copies: usize,
}

impl LinkReport {
    /// True when every reference was resolved and every file copied.
    pub fn is_clean(&self) -> bool {
        self.unresolved == 0
            && self.malformed == 0
            && self.unknown_files == 0
            && self.failed_patches == 0
            && self.failed_copies == 0
    }

    fn record(&mut self, err: &ResolveError) {
        match err {
            ResolveError::UndefinedTag { .. } => self.unresolved += 1,
            ResolveError::InvalidIndexFile(_)
            | ResolveError::InvalidIndexTag(_)
            | ResolveError::UnknownIndexBase(_) => self.malformed += 1,
            ResolveError::Patch { .. } | ResolveError::PatchOutOfBounds { .. } => {
                self.failed_patches += 1
            }
        }
    }
}

/// Links component files into a book.
///
/// # Examples
///
/// ```rust,no_run
/// use eblink::{BookAssembler, ReferenceTable};
///
/// # fn main() -> eblink::Result<()> {
/// let mut book = BookAssembler::new("out/honmon");
/// book.set_body_file("work/body");
/// book.set_head_file("work/head");
/// book.set_word_file("work/word"); // work/word.1, work/word.2, ...
/// book.set_reference_table(ReferenceTable::load("work/refs.json")?);
///
/// book.link()?;
/// book.delete();
/// # Ok(())
/// # }
/// ```
pub struct BookAssembler {
    output: PathBuf,
    slots: BTreeMap<Slot, LogicalStream>,
    references: ReferenceTable,
    layout: Option<Layout>,
    report: LinkReport,
    linked: bool,
}

impl BookAssembler {
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        BookAssembler {
            output: output.into(),
            slots: BTreeMap::new(),
            references: ReferenceTable::new(),
            layout: None,
            report: LinkReport::default(),
            linked: false,
        }
    }

    /// Bind a component file to a slot.
    ///
    /// For index slots `path` is the base name of the level files.
    pub fn set_file<P: AsRef<Path>>(&mut self, slot: Slot, path: P) {
        let path = path.as_ref();
        let stream = if slot.is_sharded() {
            LogicalStream::sharded(path)
        } else {
            LogicalStream::single(path)
        };
        debug!("{} file: {:?}", slot, path);
        self.slots.insert(slot, stream);
    }

    pub fn set_body_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Body, path);
    }

    pub fn set_menu_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Menu, path);
    }

    pub fn set_copyright_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Copyright, path);
    }

    pub fn set_head_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Head, path);
    }

    pub fn set_word_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Word, path);
    }

    pub fn set_endword_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Endword, path);
    }

    pub fn set_keyword_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Keyword, path);
    }

    pub fn set_graphic_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Graphic, path);
    }

    pub fn set_sound_file<P: AsRef<Path>>(&mut self, path: P) {
        self.set_file(Slot::Sound, path);
    }

    pub fn set_reference_table(&mut self, references: ReferenceTable) {
        self.references = references;
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn stream(&self, slot: Slot) -> Option<&LogicalStream> {
        self.slots.get(&slot)
    }

    /// Layout of the last [`link`](Self::link)
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Report of the last [`link`](Self::link)
    pub fn report(&self) -> &LinkReport {
        &self.report
    }

    /// Compute the block layout from the component files as they are now.
    pub fn compute_layout(&self) -> Layout {
        let mut layout = Layout::default();
        let mut block = FIRST_DATA_BLOCK;

        for (&slot, stream) in &self.slots {
            let files = stream.files().unwrap_or_else(|e| {
                error!("cannot list {} files {:?}: {}", slot, stream.path(), e);
                Vec::new()
            });
            let files: Vec<(PathBuf, u64)> = files
                .into_iter()
                .map(|path| {
                    let len = fs::metadata(&path).map(|m| m.len()).unwrap_or_else(|e| {
                        error!("cannot stat {:?}: {}", path, e);
                        0
                    });
                    (path, len)
                })
                .collect();
            let count: u64 = files.iter().map(|(_, len)| block_count(*len)).sum();

            debug!("{} start block: {:#x}", slot, block);
            for &type_id in slot.type_ids() {
                layout
                    .header
                    .push(ControlEntry::new(type_id, block, count, slot.param()));
            }
            layout.slots.insert(
                slot,
                SlotLayout {
                    slot,
                    start_block: block,
                    block_count: count,
                    files,
                },
            );
            block += count;
        }

        layout
    }

    /// Lay out, patch and concatenate the book.
    ///
    /// Component files are modified in place, so a book can be linked only
    /// once per assembler.
    pub fn link(&mut self) -> Result<()> {
        if self.linked {
            return Err(LinkError::AlreadyLinked);
        }
        self.linked = true;

        let layout = self.compute_layout();
        info!(
            "layout: {} components, {} control entries, {} blocks",
            layout.slots.len(),
            layout.header.len(),
            layout.end_block()
        );

        let mut patcher = PatchWriter::new();
        let mut report = {
            let mut resolver = Resolver::new(&self.slots, &layout, &self.references);
            for namespace in RESOLVE_ORDER {
                resolver.resolve_namespace(namespace, &mut patcher);
            }
            resolver.report
        };
        info!(
            "patched {} sites in {} files",
            patcher.written(),
            patcher.open_files()
        );
        patcher.close();

        let copy_result = self.concatenate(&layout, &mut report);
        info!(
            "linked {:?}: {} patched, {} unresolved, {} malformed, {} unknown files, {} failed",
            self.output,
            report.resolved,
            report.unresolved,
            report.malformed,
            report.unknown_files,
            report.failed_patches + report.failed_copies
        );

        self.layout = Some(layout);
        self.report = report;
        copy_result
    }

    fn concatenate(&self, layout: &Layout, report: &mut LinkReport) -> Result<()> {
        let output_err = |source: io::Error| LinkError::Output {
            path: self.output.clone(),
            source,
        };

        info!("link file: {:?}", self.output);
        let file = File::create(&self.output).map_err(output_err)?;
        let mut out = BlockWriter::new(BufWriter::new(file));
        out.write_all(&layout.header.to_bytes()).map_err(output_err)?;

        for slot_layout in layout.slots.values() {
            let mut end = (slot_layout.start_block - 1) * BLOCK_SIZE;
            for (path, len) in &slot_layout.files {
                info!("link file: {:?}", path);
                match copy_component(&mut out, path, *len) {
                    Ok(n) if n < *len => {
                        error!("{:?} shrank: copied {} of {} bytes", path, n, len);
                        report.failed_copies += 1;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("failed to copy {:?}: {}", path, e);
                        report.failed_copies += 1;
                    }
                }
                end += block_count(*len) * BLOCK_SIZE;
                out.pad_to(end).map_err(output_err)?;
            }
        }

        out.flush().map_err(output_err)?;
        Ok(())
    }

    /// Delete the component files.
    ///
    /// A configured path that does not exist is expanded to its level files.
    /// Failures are logged only.
    pub fn delete(&self) {
        for stream in self.slots.values() {
            let path = stream.path();
            if path.exists() {
                remove_temp(&path);
                continue;
            }
            let Some(base) = file_name(&path) else {
                continue;
            };
            match list_shards(&parent_dir(&path), &base) {
                Ok(shards) => shards.iter().for_each(|shard| remove_temp(&shard.path)),
                Err(e) => error!("cannot list files for {:?}: {}", path, e),
            }
        }
    }
}

fn copy_component<W: Write>(out: &mut W, path: &Path, len: u64) -> io::Result<u64> {
    let file = File::open(path)?;
    io::copy(&mut file.take(len), out)
}

fn remove_temp(path: &Path) {
    info!("delete file {:?}", path);
    if let Err(e) = fs::remove_file(path) {
        error!("failed to delete file {:?}: {}", path, e);
    }
}

/// Address translation for one link run
struct Resolver<'a> {
    slots: &'a BTreeMap<Slot, LogicalStream>,
    layout: &'a Layout,
    references: &'a ReferenceTable,
    index: ShardedIndexResolver<'a>,
    /// Lengths of the files that will be copied into the book
    file_lengths: HashMap<&'a Path, u64>,
    report: LinkReport,
}

impl<'a> Resolver<'a> {
    fn new(
        slots: &'a BTreeMap<Slot, LogicalStream>,
        layout: &'a Layout,
        references: &'a ReferenceTable,
    ) -> Self {
        let index = ShardedIndexResolver::new(slots.iter().filter_map(|(slot, stream)| {
            if slot.is_sharded() {
                layout.start_block(*slot).map(|start| (stream, start))
            } else {
                None
            }
        }));
        let file_lengths = layout
            .slots
            .values()
            .flat_map(|s| s.files.iter().map(|(path, len)| (path.as_path(), *len)))
            .collect();
        Resolver {
            slots,
            layout,
            references,
            index,
            file_lengths,
            report: LinkReport::default(),
        }
    }

    fn resolve_namespace(&mut self, namespace: Namespace, patcher: &mut PatchWriter) {
        let refs = self.references.refs(namespace);
        info!("resolve {} reference: {}", namespace, refs.len());

        for (site, name) in refs {
            let result = self.patch_for(namespace, &site, &name).and_then(|bytes| {
                self.check_bounds(&site, bytes.len())?;
                patcher.write(&site, &bytes)
            });
            match result {
                Ok(()) => self.report.resolved += 1,
                Err(e) => {
                    error!("{} (at {})", e, site);
                    self.report.record(&e);
                }
            }
        }
    }

    fn patch_for(
        &mut self,
        namespace: Namespace,
        site: &Position,
        name: &str,
    ) -> std::result::Result<Vec<u8>, ResolveError> {
        let references = self.references;
        let undefined = || ResolveError::UndefinedTag {
            namespace,
            name: name.to_string(),
        };

        match namespace {
            Namespace::Index => {
                let block = self.index.resolve(site, name)?;
                debug!("{}: {:#x} tag={}", site, block, name);
                Ok(ShardedIndexResolver::encode(block).to_vec())
            }
            Namespace::Sound => {
                let (start, end) = references.get_sound_tag(name).ok_or_else(undefined)?;
                let start = BlockAddress::from_position(self.target_position(start));
                let end = BlockAddress::from_position(self.target_position(end));
                Ok(AddressEncoding::Bcd.encode_range(start, end).to_vec())
            }
            Namespace::Body | Namespace::Head | Namespace::Graphic => {
                let target = match namespace {
                    Namespace::Body => references.get_body_tag(name),
                    Namespace::Head => references.get_head_tag(name),
                    _ => references.get_graphic_tag(name),
                }
                .ok_or_else(undefined)?;
                let addr = BlockAddress::from_position(self.target_position(target));
                Ok(self.site_encoding(site).encode(addr).to_vec())
            }
        }
    }

    /// Only bytes inside the length recorded at layout time reach the book, so
    /// a patch must not extend its file.
    fn check_bounds(
        &self,
        site: &Position,
        len: usize,
    ) -> std::result::Result<(), ResolveError> {
        match self.file_lengths.get(site.stream.as_path()) {
            Some(&file_len) if site.offset + len as u64 > file_len => {
                Err(ResolveError::PatchOutOfBounds {
                    path: site.stream.clone(),
                    offset: site.offset,
                    len,
                    file_len,
                })
            }
            _ => Ok(()),
        }
    }

    /// Linear book position of a tag target.
    ///
    /// Targets outside every configured component keep their raw offset.
    fn target_position(&mut self, pos: &Position) -> u64 {
        let start = self
            .slots
            .iter()
            .find(|(_, stream)| stream.is_exact(&pos.stream))
            .and_then(|(slot, _)| self.layout.start_block(*slot));

        match start {
            Some(start) => pos.absolute(start),
            None => {
                warn!("unknown file position: {}", pos);
                self.report.unknown_files += 1;
                pos.offset
            }
        }
    }

    /// Encoding for a patch written at `site`: packed decimal in component
    /// files, plain binary in index level files.
    fn site_encoding(&mut self, site: &Position) -> AddressEncoding {
        let encoding = self
            .slots
            .values()
            .find_map(|stream| stream.encoding_for(&site.stream));

        encoding.unwrap_or_else(|| {
            warn!("reference in unknown file: {}", site);
            self.report.unknown_files += 1;
            AddressEncoding::Bcd
        })
    }
}
