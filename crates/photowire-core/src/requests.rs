//! Outgoing request bodies and small response readers.
//!
//! The library API takes the same schema-less messages it returns, so request
//! bodies are assembled field by field with [`WireEncoder`]. Nothing here
//! touches the network or the clock; callers supply every varying value.

use crate::error::{Error, Result};
use crate::wire::{Decoder, FieldMap, WireEncoder};
use bytes::Bytes;
use tracing::debug;

/// Upload quality requested on commit (original quality)
const ORIGINAL_QUALITY: u64 = 3;

/// Nanosecond part sent alongside the commit timestamp
const COMMIT_TIMESTAMP_NANOS: u64 = 46_000_000;

/// Platform version string sent with trash requests
const TRASH_PLATFORM_VERSION: &str = "28";

/// Body asking whether an item with this SHA1 already exists remotely
pub fn hash_check_request(sha1: &[u8]) -> Bytes {
    let mut hash = WireEncoder::new();
    hash.add_bytes(1, sha1);

    let mut query = WireEncoder::new();
    query.add_message(1, &hash).add_empty_message(2);

    let mut outer = WireEncoder::new();
    outer.add_message(1, &query);
    outer.into_bytes()
}

/// Reads the media key of a hash match (`1.2.2.1`).
///
/// `Ok(None)` means the server has no item with that hash.
pub fn parse_hash_check_response(data: impl Into<Bytes>) -> Result<Option<String>> {
    let root = Decoder::new().decode(data)?;
    let key = optional_path(&root, &[1, 2, 2])?
        .map(|m| m.get_string(1))
        .filter(|k| !k.is_empty());
    debug!(found = key.is_some(), "hash check response");
    Ok(key)
}

/// Body that opens a resumable upload session for `file_size` bytes
pub fn upload_session_request(file_size: u64) -> Bytes {
    let mut enc = WireEncoder::new();
    enc.add_varint(1, 2)
        .add_varint(2, 2)
        .add_varint(3, 1)
        .add_varint(4, 3)
        .add_varint(7, file_size);
    enc.into_bytes()
}

/// Parameters of an upload commit
#[derive(Debug, Clone, Default)]
pub struct CommitUpload {
    /// Raw body returned by the upload endpoint
    pub upload_token: Vec<u8>,
    /// File name to record
    pub file_name: String,
    /// Raw SHA1 of the content
    pub sha1: Vec<u8>,
    /// Commit time in Unix seconds
    pub timestamp_secs: u64,
    /// Device model
    pub model: String,
    /// Device manufacturer
    pub make: String,
    /// Android API level reported by the client
    pub android_api: u64,
}

/// Body that turns an uploaded blob into a library item
pub fn commit_upload_request(commit: &CommitUpload) -> Bytes {
    let mut timestamp = WireEncoder::new();
    timestamp
        .add_varint(1, commit.timestamp_secs)
        .add_varint(2, COMMIT_TIMESTAMP_NANOS);

    let mut item = WireEncoder::new();
    item.add_bytes(1, &commit.upload_token)
        .add_string(2, &commit.file_name)
        .add_bytes(3, &commit.sha1)
        .add_message(4, &timestamp)
        .add_varint(7, ORIGINAL_QUALITY)
        .add_varint(10, 1)
        .add_varint(17, 0);

    let mut device = WireEncoder::new();
    device
        .add_string(3, &commit.model)
        .add_string(4, &commit.make)
        .add_varint(5, commit.android_api);

    let mut outer = WireEncoder::new();
    outer
        .add_message(1, &item)
        .add_message(2, &device)
        .add_bytes(3, &[1, 3]);
    outer.into_bytes()
}

/// Reads the media key assigned by a commit (`1.3.1`)
pub fn parse_commit_upload_response(data: impl Into<Bytes>) -> Result<String> {
    let root = Decoder::new().decode(data)?;
    let key = root.get_message(1)?.get_message(3)?.get_string(1);
    if key.is_empty() {
        return Err(Error::missing_field(1));
    }
    Ok(key)
}

/// Body that moves items to the trash by dedup key
pub fn move_to_trash_request<S: AsRef<str>>(dedup_keys: &[S], client_version: u64) -> Bytes {
    let mut mask = WireEncoder::new();
    mask.add_message(4, &item_options_mask());

    let mut version = WireEncoder::new();
    version
        .add_varint(1, client_version)
        .add_string(2, TRASH_PLATFORM_VERSION);

    let mut client = WireEncoder::new();
    client.add_varint(1, 5).add_message(2, &version);

    let mut enc = WireEncoder::new();
    enc.add_varint(2, 1);
    for key in dedup_keys {
        enc.add_string(3, key.as_ref());
    }
    enc.add_varint(4, 1)
        .add_message(8, &mask)
        .add_message(9, &client);
    enc.into_bytes()
}

/// Body that asks for download URLs of one item
pub fn download_urls_request(media_key: &str) -> Bytes {
    let mut key = WireEncoder::new();
    key.add_string(1, media_key);
    let mut target = WireEncoder::new();
    target.add_message(1, &key);

    let mut original = WireEncoder::new();
    original.add_empty_message(2);
    let mut photo = WireEncoder::new();
    photo.add_message(7, &original);

    let mut stream = WireEncoder::new();
    stream.add_empty_message(1).add_varint(3, 0);
    let mut video = WireEncoder::new();
    video
        .add_empty_message(2)
        .add_empty_message(3)
        .add_message(5, &stream);

    let mut options = WireEncoder::new();
    options.add_message(1, &photo).add_message(5, &video);

    let mut outer = WireEncoder::new();
    outer.add_message(1, &target).add_message(2, &options);
    outer.into_bytes()
}

/// Reads a download URL from a download-URLs response.
///
/// Photos carry their URLs in `1.5.2`, videos in `1.5.3`; inside either the
/// original (`6`) wins over the edited rendition (`5`).
pub fn parse_download_url_response(data: impl Into<Bytes>) -> Result<String> {
    let root = Decoder::new().decode(data)?;
    let urls = root.get_message(1)?.get_message(5)?;

    let mut searched = false;
    for container in [2, 3] {
        let Some(entry) = urls.get_optional_message(container)? else {
            continue;
        };
        searched = true;
        for field in [6, 5] {
            let url = entry.get_string(field);
            if !url.is_empty() {
                return Ok(url);
            }
        }
    }

    Err(Error::missing_field(if searched { 5 } else { 2 }))
}

/// Which library sync call a body is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LibraryCall {
    /// Incremental sync from a state token
    State,
    /// Paging through the initial full listing
    PageInit,
    /// Paging through an incremental sync
    Page,
}

/// Body for an incremental library sync.
///
/// An empty `state_token` asks for the library from scratch. Responses parse
/// with [`parse_db_update`](crate::parse_db_update).
pub fn library_state_request(state_token: &str) -> Bytes {
    library_request(LibraryCall::State, "", state_token)
}

/// Body for the next page of the initial full listing
pub fn library_page_init_request(page_token: &str) -> Bytes {
    library_request(LibraryCall::PageInit, page_token, "")
}

/// Body for the next page of an incremental sync
pub fn library_page_request(page_token: &str, state_token: &str) -> Bytes {
    library_request(LibraryCall::Page, page_token, state_token)
}

fn library_request(call: LibraryCall, page_token: &str, state_token: &str) -> Bytes {
    let state_call = call == LibraryCall::State;

    let mut content = WireEncoder::new();
    content
        .add_message(1, &item_field_mask())
        .add_message(2, &collection_field_mask(state_call))
        .add_message(3, &envelope_field_mask(state_call));

    // Empty tokens are left off the wire entirely.
    if call != LibraryCall::State && !page_token.is_empty() {
        content.add_string(4, page_token);
    }
    if call != LibraryCall::PageInit && !state_token.is_empty() {
        content.add_string(6, state_token);
    }

    content
        .add_varint(7, 2)
        .add_message(9, &sync_options())
        .add_varint(11, 1)
        .add_varint(11, 2);
    if state_call {
        content.add_varint(11, 6);
    }

    let mut filter_kinds = WireEncoder::new();
    filter_kinds.add_empty_messages(&[1, 2]);
    let mut filter = WireEncoder::new();
    filter
        .add_message(2, &filter_kinds)
        .add_message(3, &nested_empty(1))
        .add_empty_message(4);

    let mut paging = WireEncoder::new();
    paging.add_varint(1, 1);
    let mut paging_outer = WireEncoder::new();
    paging_outer.add_message(3, &paging);

    content
        .add_message(12, &filter)
        .add_empty_message(13)
        .add_message(15, &paging_outer);

    let mut client_inner = WireEncoder::new();
    client_inner
        .add_message(1, &nested_empty(1))
        .add_empty_message(2);
    let mut client = WireEncoder::new();
    client.add_message(1, &client_inner);
    let mut client_outer = WireEncoder::new();
    client_outer.add_message(1, &client).add_empty_message(2);

    let mut outer = WireEncoder::new();
    outer.add_message(1, &content).add_message(2, &client_outer);

    debug!(
        ?call,
        has_page_token = !page_token.is_empty(),
        has_state_token = !state_token.is_empty(),
        len = outer.len(),
        "built library request"
    );
    outer.into_bytes()
}

/// `{field: inner}`
fn wrap(field: u32, inner: &WireEncoder) -> WireEncoder {
    let mut enc = WireEncoder::new();
    enc.add_message(field, inner);
    enc
}

/// `{field: {}}`
fn nested_empty(field: u32) -> WireEncoder {
    let mut enc = WireEncoder::new();
    enc.add_empty_message(field);
    enc
}

/// Item field mask: which parts of each media item the server returns
fn item_field_mask() -> WireEncoder {
    let mut thumbnails = WireEncoder::new();
    thumbnails.add_empty_messages(&[1, 4]);

    let mut mask = WireEncoder::new();
    mask.add_message(1, &media_field_mask())
        .add_message(5, &media_type_field_mask())
        .add_empty_message(8)
        .add_message(9, &location_field_mask())
        .add_message(11, &timestamp_field_mask())
        .add_empty_message(12)
        .add_message(14, &timestamp_field_mask())
        .add_message(15, &thumbnails)
        .add_message(17, &thumbnails)
        .add_message(19, &timestamp_field_mask())
        .add_empty_messages(&[22, 23]);
    mask
}

fn media_field_mask() -> WireEncoder {
    let mut properties = WireEncoder::new();
    properties.add_empty_messages(&[1, 2, 3, 4, 5, 7]);

    let mut edits = WireEncoder::new();
    edits.add_message(5, &nested_empty(3)).add_empty_message(6);

    let mut mask = WireEncoder::new();
    mask.add_empty_messages(&[1, 3, 4])
        .add_message(5, &properties)
        .add_empty_message(6)
        .add_message(7, &nested_empty(2))
        .add_empty_messages(&[15, 16, 17, 19, 20])
        .add_message(21, &edits)
        .add_empty_message(25)
        .add_message(30, &nested_empty(2))
        .add_empty_messages(&[31, 32])
        .add_message(33, &nested_empty(1))
        .add_empty_messages(&[34, 36, 37, 38, 39, 40, 41]);
    mask
}

/// `{2: {2: 1}}`
fn flagged_variant() -> WireEncoder {
    let mut flag = WireEncoder::new();
    flag.add_varint(2, 1);
    let mut enc = WireEncoder::new();
    enc.add_message(2, &flag);
    enc
}

/// `{2: {3: {}, 4: {}}, 3: {2: {}, 3: {2: 1}}}`, shared by videos and motion clips
fn stream_mask(out: &mut WireEncoder) {
    let mut dims = WireEncoder::new();
    dims.add_empty_messages(&[3, 4]);

    let mut flag = WireEncoder::new();
    flag.add_varint(2, 1);
    let mut formats = WireEncoder::new();
    formats.add_empty_message(2).add_message(3, &flag);

    out.add_message(2, &dims).add_message(3, &formats);
}

fn media_type_field_mask() -> WireEncoder {
    let mut renditions = WireEncoder::new();
    renditions
        .add_message(3, &nested_empty(2))
        .add_message(4, &nested_empty(2));
    let mut photo = WireEncoder::new();
    photo
        .add_message(2, &renditions)
        .add_message(4, &flagged_variant())
        .add_message(5, &nested_empty(2))
        .add_varint(6, 1);

    let mut video = WireEncoder::new();
    stream_mask(&mut video);
    video
        .add_empty_message(4)
        .add_message(5, &flagged_variant())
        .add_empty_message(7);

    let mut clip = WireEncoder::new();
    stream_mask(&mut clip);
    let mut micro = WireEncoder::new();
    micro.add_message(1, &clip).add_varint(3, 1);

    let mut mask = WireEncoder::new();
    mask.add_message(2, &photo)
        .add_message(3, &video)
        .add_message(4, &wrap(2, &nested_empty(2)))
        .add_message(5, &micro);
    mask
}

fn location_field_mask() -> WireEncoder {
    // {5: {1: {}}, 6: {}} names a place
    let mut place = WireEncoder::new();
    place.add_message(5, &nested_empty(1)).add_empty_message(6);

    let mut alternate = WireEncoder::new();
    alternate.add_message(1, &place).add_empty_message(2);

    let mut primary = WireEncoder::new();
    primary
        .add_message(1, &place)
        .add_empty_message(2)
        .add_message(3, &alternate);

    let mut places = WireEncoder::new();
    places.add_message(1, &primary);

    let mut details = WireEncoder::new();
    details
        .add_message(3, &places)
        .add_message(4, &wrap(1, &nested_empty(2)));

    let mut coordinates = WireEncoder::new();
    coordinates.add_empty_messages(&[1, 2]);

    let mut mask = WireEncoder::new();
    mask.add_empty_message(2)
        .add_message(3, &coordinates)
        .add_message(4, &wrap(1, &details));
    mask
}

fn timestamp_field_mask() -> WireEncoder {
    let mut range = WireEncoder::new();
    range.add_varint(1, 1).add_varint(2, 2);

    let mut mask = WireEncoder::new();
    mask.add_empty_messages(&[2, 3])
        .add_message(4, &wrap(2, &range));
    mask
}

fn collection_field_mask(with_sharing: bool) -> WireEncoder {
    let mut properties = WireEncoder::new();
    properties.add_empty_messages(&[1, 2, 3, 4, 5, 7]);

    let mut cover = WireEncoder::new();
    cover.add_empty_messages(&[2, 3]);

    let mut album = WireEncoder::new();
    album
        .add_empty_messages(&[2, 3, 4, 5])
        .add_message(6, &properties)
        .add_empty_messages(&[7, 8, 10, 12])
        .add_message(13, &cover)
        .add_message(15, &nested_empty(1))
        .add_empty_message(18);

    let mut mask = WireEncoder::new();
    mask.add_message(1, &album)
        .add_message(4, &nested_empty(1))
        .add_empty_message(9);
    if with_sharing {
        let mut sharing = WireEncoder::new();
        sharing.add_empty_messages(&[1, 4, 5, 6, 9]);
        mask.add_message(11, &wrap(1, &sharing));
    }

    let mut owner = WireEncoder::new();
    owner
        .add_empty_message(1)
        .add_message(2, &nested_empty(1));
    let mut members = WireEncoder::new();
    members.add_empty_messages(&[1, 2]);

    mask.add_empty_message(17)
        .add_message(18, &owner)
        .add_message(20, &wrap(2, &members))
        .add_empty_message(23);
    mask
}

fn envelope_field_mask(with_item_options: bool) -> WireEncoder {
    let mut preview = WireEncoder::new();
    preview
        .add_empty_message(1)
        .add_message(2, &nested_empty(1));

    let mut envelope = WireEncoder::new();
    envelope
        .add_empty_messages(&[2, 3, 7, 8])
        .add_message(14, &nested_empty(1))
        .add_empty_message(16)
        .add_message(17, &nested_empty(2))
        .add_empty_messages(&[18, 19, 20, 21, 22, 23])
        .add_message(27, &preview)
        .add_empty_messages(&[29, 30, 31, 32, 34, 37, 38, 39, 41]);

    let options = if with_item_options {
        item_options_mask()
    } else {
        let mut options = WireEncoder::new();
        options.add_empty_messages(&[2, 3, 4]);
        options
    };

    let mut mask = WireEncoder::new();
    mask.add_empty_message(2)
        .add_message(3, &envelope)
        .add_message(4, &options)
        .add_empty_messages(&[7, 12, 13, 15, 18, 20, 24, 25]);
    mask
}

/// `{2: {}, 3: {1: {}}, 4: {}, 5: {1: {}}}`
fn item_options_mask() -> WireEncoder {
    let mut options = WireEncoder::new();
    options
        .add_empty_message(2)
        .add_message(3, &nested_empty(1))
        .add_empty_message(4)
        .add_message(5, &nested_empty(1));
    options
}

/// Sync behavior flags sent with every library call
fn sync_options() -> WireEncoder {
    let mut kinds = WireEncoder::new();
    kinds.add_empty_messages(&[1, 2]);

    let mut flag = WireEncoder::new();
    flag.add_varint(2, 1);

    let mut version = WireEncoder::new();
    version
        .add_varint(1, 2)
        .add_bytes(2, &[0x01, 0x02, 0x03, 0x05, 0x06]);

    let mut options = WireEncoder::new();
    options
        .add_message(1, &wrap(2, &kinds))
        .add_message(2, &wrap(3, &flag))
        .add_message(3, &nested_empty(2))
        .add_empty_message(4)
        .add_message(7, &nested_empty(1))
        .add_message(8, &version)
        .add_empty_message(9);
    options
}

/// Follows a chain of nested messages, `None` at the first absent level
fn optional_path(root: &FieldMap, path: &[u32]) -> Result<Option<FieldMap>> {
    let mut current = root.clone();
    for &field in path {
        match current.get_optional_message(field)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}
