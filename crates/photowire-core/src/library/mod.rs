//! Photo library sync parsing.
//!
//! - [`parse_db_update`] turns a sync response into a [`SyncResult`]
//! - [`parse_media_item`] turns one item entry into a [`MediaItem`]
//! - [`SyncSink`] receives parsed pages via [`SyncResult::apply`]

mod media;
mod sink;
mod sync;

pub use media::{parse_media_item, MediaItem, MediaType, Origin};
pub use sink::{MemoryLibrary, NullSink, StatsSink, SyncSink};
pub use sync::{parse_db_update, parse_db_update_with, SyncResult};
