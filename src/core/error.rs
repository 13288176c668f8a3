use std::path::PathBuf;
use thiserror::Error;

use crate::reference::Namespace;

/// Fatal link errors.
///
/// Only failures that make the book unusable as a whole end up here. Problems
/// with a single reference or a single component file are reported as
/// [`ResolveError`], logged and skipped.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot write output book {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Book already linked: component files were patched in place")]
    AlreadyLinked,

    #[error("Output path must be set")]
    MissingOutput,

    #[error("Manifest validation failed: {0}")]
    ManifestValidation(String),

    #[error("Manifest parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Recoverable per-reference failures.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("undefined {namespace} tag: {name}")]
    UndefinedTag { namespace: Namespace, name: String },

    #[error("unknown index file: {0}")]
    InvalidIndexFile(String),

    #[error("unknown index tag: {0}")]
    InvalidIndexTag(String),

    #[error("index base not registered: {0}")]
    UnknownIndexBase(String),

    #[error("failed to patch {path:?} at {offset}: {source}")]
    Patch {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("patch of {len} bytes at {offset} runs past the end of {path:?} ({file_len} bytes)")]
    PatchOutOfBounds {
        path: PathBuf,
        offset: u64,
        len: usize,
        file_len: u64,
    },
}

pub type Result<T> = std::result::Result<T, LinkError>;
