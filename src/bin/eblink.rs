//! EB Book Linker
//!
//! Links the component files named in a book manifest into one book file.

use anyhow::Context;
use clap::Parser;
use eblink::{BookAssembler, BookManifest};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eblink")]
#[command(about = "Link EB book components into a single book file")]
struct Args {
    /// Path to the book manifest (TOML)
    #[arg(short = 'm', long)]
    manifest: PathBuf,

    /// Keep component files after linking
    #[arg(long)]
    keep_temp: bool,

    /// Verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,
}

/// `-v` forces debug; otherwise `RUST_LOG` wins, falling back to info.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, rust_log.as_deref()))
        .init();

    info!("Manifest: {:?}", args.manifest);
    let manifest = BookManifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {:?}", args.manifest))?;
    let references = manifest
        .load_references()
        .context("loading reference table")?;
    info!(
        "Reference table: {} tags, {} references",
        references.tag_count(),
        references.ref_count()
    );

    let mut book = BookAssembler::from_manifest(&manifest, references);
    book.link()
        .with_context(|| format!("linking {:?}", manifest.output))?;

    let report = book.report();
    if !report.is_clean() {
        warn!("Book linked with problems: {:?}", report);
    }

    if args.keep_temp || manifest.keep_temp {
        info!("Keeping component files");
    } else {
        book.delete();
    }

    info!("Done: {:?}", manifest.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_rust_log_sets_level() {
        let filter = log_filter(false, Some("debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(false, Some("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_default_level_is_info() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_verbose_forces_debug() {
        let filter = log_filter(true, Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
