//! Book link manifest
//!
//! A TOML file naming the output book, the component file of each slot and
//! the reference table written by the encoder:
//!
//! ```toml
//! output = "out/honmon"
//! references = "work/refs.json"
//!
//! [slots]
//! body = "work/body"
//! head = "work/head"
//! word = "work/word"
//! ```
//!
//! Relative paths are taken relative to the manifest's directory.

use crate::error::{LinkError, Result};
use crate::linker::BookAssembler;
use crate::reference::ReferenceTable;
use crate::slot::Slot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookManifest {
    /// Path of the linked book
    pub output: PathBuf,

    /// Serialized reference table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<PathBuf>,

    /// Keep component files after linking
    #[serde(default)]
    pub keep_temp: bool,

    /// Component file (or index base name) per slot
    #[serde(default)]
    pub slots: BTreeMap<Slot, PathBuf>,
}

impl BookManifest {
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        BookManifest {
            output: output.into(),
            references: None,
            keep_temp: false,
            slots: BTreeMap::new(),
        }
    }

    pub fn with_slot<P: Into<PathBuf>>(mut self, slot: Slot, path: P) -> Self {
        self.slots.insert(slot, path.into());
        self
    }

    pub fn with_references<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.references = Some(path.into());
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let manifest: BookManifest = toml::from_str(s)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read a manifest file and resolve its paths against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let manifest = Self::from_toml_str(&fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.relative_to(base))
    }

    /// Prefix every relative path with `base`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        self.output = resolve(self.output.as_path());
        self.references = self.references.as_deref().map(resolve);
        for path in self.slots.values_mut() {
            *path = resolve(path.as_path());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(LinkError::ManifestValidation(
                "output path cannot be empty".to_string(),
            ));
        }
        for (slot, path) in &self.slots {
            if path.as_os_str().is_empty() {
                return Err(LinkError::ManifestValidation(format!(
                    "{} path cannot be empty",
                    slot
                )));
            }
        }
        if self.slots.is_empty() {
            return Err(LinkError::ManifestValidation(
                "at least one slot must be configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the reference table named by the manifest, or an empty one.
    pub fn load_references(&self) -> Result<ReferenceTable> {
        match &self.references {
            Some(path) => ReferenceTable::load(path),
            None => Ok(ReferenceTable::new()),
        }
    }
}

impl BookAssembler {
    /// Configure an assembler from a manifest.
    pub fn from_manifest(manifest: &BookManifest, references: ReferenceTable) -> Self {
        let mut book = BookAssembler::new(&manifest.output);
        for (&slot, path) in &manifest.slots {
            book.set_file(slot, path);
        }
        book.set_reference_table(references);
        book
    }
}
