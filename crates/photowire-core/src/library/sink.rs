//! Destinations for parsed sync pages.
//!
//! The [`SyncSink`] trait is the seam between the parser and whatever keeps
//! the library state (an on-disk cache, an index, a test double). Every
//! method has a no-op default so sinks only implement what they track.

use super::media::MediaItem;
use crate::error::Result;
use std::collections::HashMap;

/// Receives the effects of a sync page.
///
/// [`SyncResult::apply`](super::SyncResult::apply) calls `upsert_item` for
/// every item, then `delete_item` for every tombstone, then `update_tokens`
/// once.
///
/// # Example
///
/// ```
/// use photowire_core::{MediaItem, Result, SyncSink};
///
/// #[derive(Default)]
/// struct KeyLog(Vec<String>);
///
/// impl SyncSink for KeyLog {
///     fn upsert_item(&mut self, item: &MediaItem) -> Result<()> {
///         self.0.push(item.media_key.clone());
///         Ok(())
///     }
/// }
/// ```
pub trait SyncSink {
    /// Insert or replace an item
    fn upsert_item(&mut self, item: &MediaItem) -> Result<()> {
        let _ = item;
        Ok(())
    }

    /// Remove an item by media key
    fn delete_item(&mut self, media_key: &str) -> Result<()> {
        let _ = media_key;
        Ok(())
    }

    /// Record the tokens a page ended with
    fn update_tokens(&mut self, state_token: &str, page_token: &str) -> Result<()> {
        let _ = (state_token, page_token);
        Ok(())
    }
}

/// A sink that discards everything
pub struct NullSink;

impl SyncSink for NullSink {}

/// A sink that counts what it is given
#[derive(Debug, Default)]
pub struct StatsSink {
    /// Number of upserts
    pub upserted: usize,
    /// Number of deletions
    pub deleted: usize,
    /// Number of pages applied
    pub pages: usize,
}

impl SyncSink for StatsSink {
    fn upsert_item(&mut self, _item: &MediaItem) -> Result<()> {
        self.upserted += 1;
        Ok(())
    }

    fn delete_item(&mut self, _media_key: &str) -> Result<()> {
        self.deleted += 1;
        Ok(())
    }

    fn update_tokens(&mut self, _state_token: &str, _page_token: &str) -> Result<()> {
        self.pages += 1;
        Ok(())
    }
}

/// In-memory library keyed by media key
#[derive(Debug, Default, Clone)]
pub struct MemoryLibrary {
    items: HashMap<String, MediaItem>,
    state_token: String,
    page_token: String,
}

impl MemoryLibrary {
    /// Creates an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no item is held
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by media key
    pub fn get(&self, media_key: &str) -> Option<&MediaItem> {
        self.items.get(media_key)
    }

    /// Looks up the first item (by media key) carrying `file_name`
    pub fn get_by_file_name(&self, file_name: &str) -> Option<&MediaItem> {
        self.items
            .values()
            .filter(|item| item.file_name == file_name)
            .min_by(|a, b| a.media_key.cmp(&b.media_key))
    }

    /// All items, oldest capture first, ties broken by media key
    pub fn list_all(&self) -> Vec<&MediaItem> {
        let mut items: Vec<&MediaItem> = self.items.values().collect();
        items.sort_by(|a, b| {
            a.utc_timestamp_millis
                .cmp(&b.utc_timestamp_millis)
                .then_with(|| a.media_key.cmp(&b.media_key))
        });
        items
    }

    /// Latest non-empty state token seen
    pub fn state_token(&self) -> &str {
        &self.state_token
    }

    /// Page token of the last applied page
    pub fn page_token(&self) -> &str {
        &self.page_token
    }
}

impl SyncSink for MemoryLibrary {
    fn upsert_item(&mut self, item: &MediaItem) -> Result<()> {
        self.items.insert(item.media_key.clone(), item.clone());
        Ok(())
    }

    fn delete_item(&mut self, media_key: &str) -> Result<()> {
        self.items.remove(media_key);
        Ok(())
    }

    fn update_tokens(&mut self, state_token: &str, page_token: &str) -> Result<()> {
        if !state_token.is_empty() {
            self.state_token = state_token.to_string();
        }
        self.page_token = page_token.to_string();
        Ok(())
    }
}
