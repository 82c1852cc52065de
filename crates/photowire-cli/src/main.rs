//! photowire - Inspect captured media-library sync responses
//!
//! This tool decodes raw sync response bodies saved to disk, either one page
//! at a time or a whole directory of pages replayed into an in-memory library.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, ValueEnum};
use photowire_core::wire::DEFAULT_MAX_DEPTH;
use photowire_core::{
    parse_db_update_with, read_dump, Decoder, DecoderConfig, MediaItem, MemoryLibrary, SyncResult,
};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Inspect captured media-library sync responses
#[derive(Parser, Debug)]
#[command(name = "photowire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Deepest sub-message level to decode
    #[arg(long, env = "PHOTOWIRE_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Only list media keys and file names
    #[arg(long)]
    list_only: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single captured response body
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of captured pages, replayed in file-name order
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for decoded pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per token, item and deletion
    Text,
    /// Parsed records as JSON
    Json,
    /// Raw field tree without domain parsing
    Tree,
}

/// Tracks page bodies already seen so replays skip byte-identical copies
#[derive(Default)]
struct DumpRegistry {
    seen: HashSet<String>,
    stats: RegistryStats,
}

#[derive(Debug, Default, PartialEq)]
struct RegistryStats {
    total_found: usize,
    duplicates_skipped: usize,
    pages_applied: usize,
    failures: usize,
}

impl DumpRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Compute a short hash of the content (first 16 chars of blake3)
    fn content_hash(content: &[u8]) -> String {
        let hash = blake3::hash(content);
        hash.to_hex()[..16].to_string()
    }

    /// Records a body, returning false if identical content was seen before
    fn register(&mut self, path: &Path, content: &[u8]) -> bool {
        self.stats.total_found += 1;

        let hash = Self::content_hash(content);
        if !self.seen.insert(hash.clone()) {
            debug!("Skipping duplicate: {} (hash: {})", path.display(), hash);
            self.stats.duplicates_skipped += 1;
            return false;
        }
        true
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} found, {} duplicates skipped, {} applied, {} failed",
            self.stats.total_found,
            self.stats.duplicates_skipped,
            self.stats.pages_applied,
            self.stats.failures
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let decoder = Decoder::with_config(DecoderConfig::new().max_depth(cli.max_depth));
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &decoder, file, &mut out)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &decoder, directory, &mut out)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Decode and print one captured page
fn process_single_file(
    cli: &Cli,
    decoder: &Decoder,
    file: &Path,
    out: &mut impl Write,
) -> Result<()> {
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let data = read_dump(file)?;
    trace!("Read {} bytes from {}", data.len(), file.display());

    if cli.format == OutputFormat::Tree {
        let fields = decoder
            .decode(data)
            .with_context(|| format!("Failed to decode {}", file.display()))?;
        write!(out, "{}", fields.to_tree_string())?;
        return Ok(());
    }

    let page = parse_db_update_with(decoder, data)
        .with_context(|| format!("Failed to parse sync page: {}", file.display()))?;

    if cli.list_only {
        write_listing(out, page.items.iter())
    } else {
        write_page(out, &page, cli.format)
    }
}

/// Replay every page in a directory into one library and print it
fn process_directory(
    cli: &Cli,
    decoder: &Decoder,
    directory: &Path,
    out: &mut impl Write,
) -> Result<()> {
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut registry = DumpRegistry::new();
    if cli.format == OutputFormat::Tree {
        write_directory_trees(decoder, directory, &mut registry, out)?;
        registry.print_summary();
        return Ok(());
    }

    let library = replay_directory(decoder, directory, &mut registry)?;
    registry.print_summary();

    let items = library.list_all();
    if cli.list_only {
        return write_listing(out, items.into_iter());
    }

    match cli.format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "state_token": library.state_token(),
                "page_token": library.page_token(),
                "items": items,
            });
            serde_json::to_writer_pretty(&mut *out, &doc)?;
            writeln!(out)?;
        }
        OutputFormat::Text | OutputFormat::Tree => {
            writeln!(out, "state_token: {}", library.state_token())?;
            for item in items {
                write_item(out, item)?;
            }
        }
    }

    Ok(())
}

/// Visible regular files under `directory`, in file-name order
fn dump_files(directory: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        // Skip hidden files
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false)
        })
}

/// Reads one page for a directory walk, returning None for unreadable or
/// already-seen bodies
fn read_new_page(path: &Path, registry: &mut DumpRegistry) -> Option<Bytes> {
    let data = match read_dump(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Error reading {}: {}", path.display(), e);
            registry.stats.failures += 1;
            return None;
        }
    };

    registry.register(path, &data).then_some(data)
}

/// Walks `directory` in file-name order and applies each page to a library.
///
/// Pages that fail to read or parse are logged and counted, not fatal.
fn replay_directory(
    decoder: &Decoder,
    directory: &Path,
    registry: &mut DumpRegistry,
) -> Result<MemoryLibrary> {
    let mut library = MemoryLibrary::new();

    for path in dump_files(directory) {
        let Some(data) = read_new_page(&path, registry) else {
            continue;
        };

        debug!("Processing page: {}", path.display());
        let applied = parse_db_update_with(decoder, data).and_then(|page| page.apply(&mut library));
        match applied {
            Ok(()) => registry.stats.pages_applied += 1,
            Err(e) => {
                // Log error but continue with other pages
                warn!("Error processing {}: {}", path.display(), e);
                registry.stats.failures += 1;
            }
        }
    }

    Ok(library)
}

/// Writes the raw field tree of every distinct page, each under a `# path`
/// header. Pages that do not decode are logged and counted.
fn write_directory_trees(
    decoder: &Decoder,
    directory: &Path,
    registry: &mut DumpRegistry,
    out: &mut impl Write,
) -> Result<()> {
    for path in dump_files(directory) {
        let Some(data) = read_new_page(&path, registry) else {
            continue;
        };

        match decoder.decode(data) {
            Ok(fields) => {
                writeln!(out, "# {}", path.display())?;
                write!(out, "{}", fields.to_tree_string())?;
                registry.stats.pages_applied += 1;
            }
            Err(e) => {
                warn!("Error decoding {}: {}", path.display(), e);
                registry.stats.failures += 1;
            }
        }
    }
    Ok(())
}

fn write_page(out: &mut impl Write, page: &SyncResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, page)?;
            writeln!(out)?;
        }
        OutputFormat::Text | OutputFormat::Tree => {
            writeln!(out, "state_token: {}", page.state_token)?;
            writeln!(out, "page_token: {}", page.page_token)?;
            for item in &page.items {
                write_item(out, item)?;
            }
            for key in &page.deleted_keys {
                writeln!(out, "deleted\t{}", key)?;
            }
        }
    }
    Ok(())
}

fn write_item(out: &mut impl Write, item: &MediaItem) -> io::Result<()> {
    writeln!(
        out,
        "item\t{}\t{}\t{}\t{}\t{}",
        item.media_key, item.file_name, item.media_type, item.size_bytes, item.utc_timestamp_millis
    )
}

fn write_listing<'a>(out: &mut impl Write, items: impl Iterator<Item = &'a MediaItem>) -> Result<()> {
    for item in items {
        writeln!(out, "{}\t{}", item.media_key, item.file_name)?;
    }
    Ok(())
}
