//! # photowire-core
//!
//! A library for reading and writing the schema-less protobuf messages spoken
//! by a mobile photo-library sync API.
//!
//! This crate provides the core functionality for:
//! - Decoding arbitrary wire format bytes into a field map without a schema
//! - Building request bodies field by field
//! - Interpreting sync responses as media items, deletions and paging tokens
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Wire format encoder, decoder and field accessors
//! - [`convert`]: Numeric reinterpretation and hash helpers
//! - [`library`]: Media item and sync response parsing, sync sinks
//! - [`requests`]: Request bodies and small response readers
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use photowire_core::{parse_db_update, MemoryLibrary};
//!
//! let body = std::fs::read("./dumps/page-0001.bin")?;
//! let page = parse_db_update(&body)?;
//!
//! let mut library = MemoryLibrary::new();
//! page.apply(&mut library)?;
//!
//! for item in library.list_all() {
//!     println!("{} {}", item.media_key, item.file_name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`SyncSink`]: Receive parsed pages in your own store
//! - [`DecoderConfig`]: Tune the nesting limit for untrusted input
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod convert;
pub mod error;
pub mod library;
pub mod requests;
pub mod wire;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use library::{
    parse_db_update, parse_db_update_with, parse_media_item, MediaItem, MediaType,
    MemoryLibrary, NullSink, Origin, StatsSink, SyncResult, SyncSink,
};
pub use wire::{decode_raw, Decoder, DecoderConfig, FieldMap, WireEncoder, WireValue};

use bytes::Bytes;
use std::path::Path;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reads a captured response body from disk
pub fn read_dump(path: impl AsRef<Path>) -> Result<Bytes> {
    let path = path.as_ref();
    std::fs::read(path)
        .map(Bytes::from)
        .map_err(|e| Error::file_read(path, e))
}
