//! Media item records and the field paths they are read from.
//!
//! Field paths are written `top.N` for the item entry itself and
//! `meta.N` / `type.N` / `loc.N` for its metadata, type-info and location
//! sub-messages. The numbers are the server's wire contract.

use crate::convert::{dedup_key_from_sha1, fixed32_to_scaled_degrees, to_hex};
use crate::error::{Error, Result};
use crate::wire::{FieldMap, WireValue};
use tracing::trace;

/// meta.5 property marking an item as a non-canonical duplicate
const NON_CANONICAL_PROPERTY: u64 = 27;

/// meta.35.3 value for items stored at original quality
const ORIGINAL_QUALITY: u64 = 2;

/// Kind of media an item holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "extended-formats", derive(serde::Serialize))]
#[cfg_attr(feature = "extended-formats", serde(rename_all = "snake_case"))]
pub enum MediaType {
    /// No type info on the wire
    #[default]
    Unknown,
    /// Still image
    Photo,
    /// Video clip
    Video,
    /// A type code this parser does not name
    Other(u64),
}

impl MediaType {
    /// Maps the wire code (type.1)
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => MediaType::Unknown,
            1 => MediaType::Photo,
            2 => MediaType::Video,
            other => MediaType::Other(other),
        }
    }

    /// The wire code
    pub fn code(&self) -> u64 {
        match self {
            MediaType::Unknown => 0,
            MediaType::Photo => 1,
            MediaType::Video => 2,
            MediaType::Other(code) => *code,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Unknown => f.write_str("unknown"),
            MediaType::Photo => f.write_str("photo"),
            MediaType::Video => f.write_str("video"),
            MediaType::Other(code) => write!(f, "type-{}", code),
        }
    }
}

/// Who an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "extended-formats", derive(serde::Serialize))]
pub enum Origin {
    /// Uploaded by the account owner; also the fallback for unknown codes
    #[default]
    #[cfg_attr(feature = "extended-formats", serde(rename = "self"))]
    SelfOwned,
    /// Shared through partner sharing
    #[cfg_attr(feature = "extended-formats", serde(rename = "partner"))]
    Partner,
    /// Saved from a shared album
    #[cfg_attr(feature = "extended-formats", serde(rename = "shared"))]
    Shared,
}

impl Origin {
    /// Maps the wire code (meta.30.1); unknown codes normalize to `SelfOwned`
    pub fn from_code(code: u64) -> Self {
        match code {
            3 => Origin::Partner,
            4 => Origin::Shared,
            _ => Origin::SelfOwned,
        }
    }

    /// Normalized name
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::SelfOwned => "self",
            Origin::Partner => "partner",
            Origin::Shared => "shared",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media item as listed by a library sync page
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "extended-formats", derive(serde::Serialize))]
pub struct MediaItem {
    /// Server identifier (top.1)
    pub media_key: String,
    /// Content-derived key used for dedup and trash requests
    pub dedup_key: String,
    /// Original file name
    pub file_name: String,
    /// Photo, video or other
    pub media_type: MediaType,
    /// Size of the stored original
    pub size_bytes: u64,
    /// Capture time, milliseconds since the Unix epoch
    pub utc_timestamp_millis: i64,
    /// Capture timezone offset, milliseconds
    pub timezone_offset: i64,
    /// Time the server created the item, milliseconds since the epoch
    pub server_creation_timestamp: i64,
    /// Pixel width (0 when unknown)
    pub width: u64,
    /// Pixel height (0 when unknown)
    pub height: u64,
    /// Video duration (0 for photos)
    pub duration_ms: u64,
    /// Lowercase hex SHA1 of the original
    pub sha1_hash: String,
    /// Hidden from the main timeline
    pub is_archived: bool,
    /// Starred by the user
    pub is_favorite: bool,
    /// In the locked folder
    pub is_locked: bool,
    /// False for items flagged as a non-canonical copy
    pub is_canonical: bool,
    /// Has server-side edits
    pub is_edited: bool,
    /// Normalized origin
    pub origin: Origin,
    /// Owning collection, if any
    pub collection_id: String,
    /// Server upload state code
    pub upload_status: u64,
    /// Storage quota this item consumes
    pub quota_charged_bytes: u64,
    /// Stored without recompression
    pub is_original_quality: bool,
    /// Bumped by the server on every content change
    pub content_version: u64,
    /// When the item was trashed; 0 when it is not in the trash
    pub trash_timestamp: i64,
    /// Base URL for thumbnails / downloads
    pub remote_url: Option<String>,
    /// Camera manufacturer
    pub make: Option<String>,
    /// Camera model
    pub model: Option<String>,
    /// Motion photo with an embedded clip
    pub is_micro_video: bool,
    /// Width of the embedded clip
    pub micro_video_width: u64,
    /// Height of the embedded clip
    pub micro_video_height: u64,
    /// Latitude in degrees
    pub latitude: Option<f64>,
    /// Longitude in degrees
    pub longitude: Option<f64>,
    /// Reverse-geocoded place name
    pub location_name: Option<String>,
    /// Place identifier
    pub location_id: Option<String>,
}

impl MediaItem {
    /// True for photos
    pub fn is_photo(&self) -> bool {
        self.media_type == MediaType::Photo
    }

    /// True for videos
    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }
}

/// Builds a [`MediaItem`] from one decoded item entry.
///
/// `top.1` (media key) and `top.2` (metadata) are required; every other path
/// is optional and left at its zero value when absent. Malformed bytes inside
/// a present sub-message are an error.
pub fn parse_media_item(entry: &FieldMap) -> Result<MediaItem> {
    if !entry.has(1) {
        return Err(Error::missing_field(1));
    }
    let meta = entry.get_message(2)?;

    let mut item = MediaItem {
        media_key: entry.get_string(1),
        file_name: meta.get_string(4),
        utc_timestamp_millis: meta.get_varint(7),
        timezone_offset: meta.get_varint(8),
        server_creation_timestamp: meta.get_varint(9),
        size_bytes: meta.get_uint(10),
        upload_status: meta.get_uint(11),
        content_version: meta.get_uint(26),
        is_canonical: is_canonical(&meta),
        ..MediaItem::default()
    };

    read_metadata(&meta, &mut item)?;

    if let Some(type_info) = entry.get_optional_message(5)? {
        read_type_info(&type_info, &mut item)?;
    }

    // Older responses put the location block under the metadata message.
    let location = match entry.get_optional_message(17)? {
        Some(loc) => Some(loc),
        None => meta.get_optional_message(17)?,
    };
    if let Some(loc) = location {
        read_location(&loc, &mut item)?;
    }

    if item.dedup_key.is_empty() && !item.sha1_hash.is_empty() {
        if let Some(raw) = sha1_bytes(&meta)? {
            item.dedup_key = dedup_key_from_sha1(&raw);
        }
    }

    trace!(
        media_key = %item.media_key,
        file_name = %item.file_name,
        media_type = item.media_type.code(),
        "parsed media item"
    );

    Ok(item)
}

fn read_metadata(meta: &FieldMap, item: &mut MediaItem) -> Result<()> {
    if let Some(collection) = meta.get_optional_message(1)? {
        item.collection_id = collection.get_string(1);
    }
    if let Some(trash) = meta.get_optional_message(16)? {
        item.trash_timestamp = trash.get_varint(3);
    }
    if let Some(dedup) = meta.get_optional_message(21)? {
        item.dedup_key = dedup.get_string(1);
    }
    if let Some(raw) = sha1_bytes(meta)? {
        item.sha1_hash = to_hex(&raw);
    }
    if let Some(archived) = meta.get_optional_message(29)? {
        item.is_archived = archived.get_uint(1) != 0;
    }
    if let Some(origin) = meta.get_optional_message(30)? {
        item.origin = Origin::from_code(origin.get_uint(1));
    }
    if let Some(favorite) = meta.get_optional_message(31)? {
        item.is_favorite = favorite.get_uint(1) != 0;
    }
    if let Some(quota) = meta.get_optional_message(35)? {
        item.quota_charged_bytes = quota.get_uint(2);
        item.is_original_quality = quota.get_uint(3) == ORIGINAL_QUALITY;
    }
    if let Some(locked) = meta.get_optional_message(39)? {
        item.is_locked = locked.get_uint(1) != 0;
    }
    Ok(())
}

/// Raw SHA1 at meta.13.1
fn sha1_bytes(meta: &FieldMap) -> Result<Option<Vec<u8>>> {
    Ok(meta
        .get_optional_message(13)?
        .and_then(|hash| hash.get_bytes(1).map(<[u8]>::to_vec))
        .filter(|raw| !raw.is_empty()))
}

/// meta.5 is a list of property messages; property 27 marks a duplicate.
/// Occurrences that do not decode are skipped.
fn is_canonical(meta: &FieldMap) -> bool {
    !meta
        .values(5)
        .iter()
        .filter_map(WireValue::as_bytes)
        .filter_map(|raw| meta.decode_child(raw).ok())
        .any(|property| property.get_uint(1) == NON_CANONICAL_PROPERTY)
}

fn read_type_info(type_info: &FieldMap, item: &mut MediaItem) -> Result<()> {
    item.media_type = MediaType::from_code(type_info.get_uint(1));

    // type.2: photo block
    if let Some(photo) = type_info.get_optional_message(2)? {
        item.is_edited = photo.has(4);
        if let Some(main) = photo.get_optional_message(1)? {
            if main.has(1) {
                item.remote_url = Some(main.get_string(1));
            }
            if let Some(dims) = main.get_optional_message(9)? {
                item.width = dims.get_uint(1);
                item.height = dims.get_uint(2);
                if let Some(exif) = dims.get_optional_message(5)? {
                    item.make = exif.has(1).then(|| exif.get_string(1));
                    item.model = exif.has(2).then(|| exif.get_string(2));
                }
            }
        }
    }

    // type.3: video block
    if let Some(video) = type_info.get_optional_message(3)? {
        if let Some(stream) = video.get_optional_message(2)? {
            if stream.has(1) {
                item.remote_url = Some(stream.get_string(1));
            }
        }
        if let Some(dims) = video.get_optional_message(4)? {
            item.duration_ms = dims.get_uint(1);
            item.width = dims.get_uint(4);
            item.height = dims.get_uint(5);
        }
    }

    // type.5: motion photo clip
    if let Some(micro) = type_info.get_optional_message(5)? {
        if let Some(clip) = micro.get_optional_message(2)? {
            if let Some(dims) = clip.get_optional_message(4)? {
                item.is_micro_video = true;
                item.duration_ms = dims.get_uint(1);
                item.micro_video_width = dims.get_uint(4);
                item.micro_video_height = dims.get_uint(5);
            }
        }
    }

    Ok(())
}

fn read_location(loc: &FieldMap, item: &mut MediaItem) -> Result<()> {
    if let Some(gps) = loc.get_optional_message(1)? {
        item.latitude = gps.get_numeric(1).map(fixed32_to_scaled_degrees);
        item.longitude = gps.get_numeric(2).map(fixed32_to_scaled_degrees);
    }
    if let Some(place) = loc.get_optional_message(5)? {
        if let Some(name) = place.get_optional_message(2)? {
            if name.has(1) {
                item.location_name = Some(name.get_string(1));
            }
        }
        if place.has(3) {
            item.location_id = Some(place.get_string(3));
        }
    }
    Ok(())
}
