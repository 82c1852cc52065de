//! Library sync response parsing.
//!
//! A sync response wraps everything in `top.1`:
//!
//! | Path | Content |
//! |---|---|
//! | wrapper.1 | next page token |
//! | wrapper.2 | media item entry (repeated) |
//! | wrapper.6 | state token for the next incremental sync |
//! | wrapper.9 | deletion tombstone (repeated): `{1: {1: kind, 2: {1: media_key}}}` |

use super::media::{parse_media_item, MediaItem};
use super::sink::SyncSink;
use crate::error::{Error, Result};
use crate::wire::{Decoder, FieldMap, WireType, WireValue};
use bytes::Bytes;
use tracing::{debug, warn};

/// Tombstone kind for media item deletions
const MEDIA_ITEM_TOMBSTONE: u64 = 1;

/// One parsed page of a library sync
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "extended-formats", derive(serde::Serialize))]
pub struct SyncResult {
    /// Token to resume incremental sync from; empty if absent
    pub state_token: String,
    /// Token for the next page; empty on the last page
    pub page_token: String,
    /// Items added or changed, in wire order
    pub items: Vec<MediaItem>,
    /// Media keys removed since the last sync, in wire order
    pub deleted_keys: Vec<String>,
}

impl SyncResult {
    /// True when the page carries neither tokens nor records
    pub fn is_empty(&self) -> bool {
        self.state_token.is_empty()
            && self.page_token.is_empty()
            && self.items.is_empty()
            && self.deleted_keys.is_empty()
    }

    /// True if the server has more pages for this sync
    pub fn has_more_pages(&self) -> bool {
        !self.page_token.is_empty()
    }

    /// Applies this page to a sink: items first, then deletions, then tokens
    pub fn apply<S: SyncSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for item in &self.items {
            sink.upsert_item(item)?;
        }
        for key in &self.deleted_keys {
            sink.delete_item(key)?;
        }
        sink.update_tokens(&self.state_token, &self.page_token)
    }
}

/// Parses a raw sync response with the default decoder
pub fn parse_db_update(data: &[u8]) -> Result<SyncResult> {
    parse_db_update_with(&Decoder::new(), Bytes::copy_from_slice(data))
}

/// Parses a raw sync response with a configured decoder.
///
/// Bytes that do not decode at the top level are an error. A missing or
/// undecodable wrapper is the normal "nothing to report" answer and yields an
/// empty result. Once the wrapper decodes, any malformed item or tombstone
/// fails the whole page.
pub fn parse_db_update_with(decoder: &Decoder, data: impl Into<Bytes>) -> Result<SyncResult> {
    let top = decoder.decode(data)?;

    let Some(wrapper) = wrapper(&top) else {
        return Ok(SyncResult::default());
    };

    let mut result = SyncResult {
        page_token: wrapper.get_string(1),
        state_token: wrapper.get_string(6),
        ..SyncResult::default()
    };

    for (index, value) in wrapper.values(2).iter().enumerate() {
        let item = item_entry(&wrapper, 2, value)
            .and_then(|entry| parse_media_item(&entry))
            .map_err(|e| Error::malformed_item(index, e))?;
        result.items.push(item);
    }

    for (index, value) in wrapper.values(9).iter().enumerate() {
        let key = item_entry(&wrapper, 9, value)
            .and_then(|entry| tombstone_key(&entry))
            .map_err(|e| Error::malformed_deletion(index, e))?;
        if key.is_empty() {
            debug!(index, "skipping tombstone without media key");
            continue;
        }
        result.deleted_keys.push(key);
    }

    debug!(
        items = result.items.len(),
        deletions = result.deleted_keys.len(),
        more_pages = result.has_more_pages(),
        "parsed sync page"
    );

    Ok(result)
}

/// Decodes `top.1`, treating absence or a non-message value as "no wrapper"
fn wrapper(top: &FieldMap) -> Option<FieldMap> {
    let value = top.first(1)?;
    match top.get_message(1) {
        Ok(wrapper) => Some(wrapper),
        Err(e) => {
            // The server answers an exhausted sync with an empty or opaque field 1.
            if value.as_bytes().map_or(true, |b| !b.is_empty()) {
                warn!(error = %e, "sync response field 1 is not a message");
            }
            None
        }
    }
}

fn item_entry(wrapper: &FieldMap, field: u32, value: &WireValue) -> Result<FieldMap> {
    let raw = value
        .as_bytes()
        .ok_or_else(|| Error::unexpected_wire_type(field, WireType::Len, value.wire_type()))?;
    wrapper.decode_child(raw)
}

/// Extracts the media key from a tombstone: `entry.1.2.1`
fn tombstone_key(entry: &FieldMap) -> Result<String> {
    let info = entry.get_message(1)?;

    // Only kind 1 has been observed; other kinds are kept but reported.
    let kind = info.get_uint(1);
    if kind != MEDIA_ITEM_TOMBSTONE {
        warn!(kind, "unexpected tombstone kind");
    }

    Ok(info.get_message(2)?.get_string(1))
}
