//! End-to-end parsing of sync responses built on the wire.

use photowire_core::{
    parse_db_update, parse_db_update_with, Decoder, DecoderConfig, Error, MediaType,
    MemoryLibrary, StatsSink, WireEncoder,
};
use pretty_assertions::assert_eq;

const PHOTO_SHA1: &str = "c7b2bd9a1234567890abcdef12345678deadbeef";

fn message(build: impl FnOnce(&mut WireEncoder)) -> WireEncoder {
    let mut enc = WireEncoder::new();
    build(&mut enc);
    enc
}

fn photo_entry(key: &str, file_name: &str) -> WireEncoder {
    let sha1 = hex::decode(PHOTO_SHA1).unwrap();
    let hash = message(|m| {
        m.add_bytes(1, &sha1);
    });
    let meta = message(|m| {
        m.add_string(4, file_name)
            .add_varint(7, 1_700_000_000_000)
            .add_varint(10, 1024)
            .add_message(13, &hash);
    });

    let dims = message(|m| {
        m.add_varint(1, 4032).add_varint(2, 3024);
    });
    let main = message(|m| {
        m.add_message(9, &dims);
    });
    let photo = message(|m| {
        m.add_message(1, &main);
    });
    let type_info = message(|m| {
        m.add_varint(1, 1).add_message(2, &photo);
    });

    message(|m| {
        m.add_string(1, key)
            .add_message(2, &meta)
            .add_message(5, &type_info);
    })
}

fn video_entry(key: &str) -> WireEncoder {
    let dedup = message(|m| {
        m.add_string(1, "video_dedup");
    });
    let meta = message(|m| {
        m.add_string(4, "clip.mp4")
            .add_varint(7, 1_600_000_000_000)
            .add_varint(10, 5_000_000)
            .add_message(21, &dedup);
    });
    let dims = message(|m| {
        m.add_varint(1, 15000).add_varint(4, 1920).add_varint(5, 1080);
    });
    let video = message(|m| {
        m.add_message(4, &dims);
    });
    let type_info = message(|m| {
        m.add_varint(1, 2).add_message(3, &video);
    });

    message(|m| {
        m.add_string(1, key)
            .add_message(2, &meta)
            .add_message(5, &type_info);
    })
}

fn tombstone(key: &str) -> WireEncoder {
    let key_msg = message(|m| {
        m.add_string(1, key);
    });
    let info = message(|m| {
        m.add_varint(1, 1).add_message(2, &key_msg);
    });
    message(|m| {
        m.add_message(1, &info);
    })
}

fn response(wrapper: &WireEncoder) -> Vec<u8> {
    message(|m| {
        m.add_message(1, wrapper);
    })
    .as_slice()
    .to_vec()
}

#[test]
fn two_items_no_deletions() {
    let wrapper = message(|m| {
        m.add_message(2, &photo_entry("photo_key", "photo1.jpg"))
            .add_message(2, &video_entry("video_key"))
            .add_string(6, "state_after");
    });

    let result = parse_db_update(&response(&wrapper)).unwrap();
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.deleted_keys.len(), 0);
    assert_eq!(result.state_token, "state_after");
    assert!(!result.has_more_pages());

    let photo = &result.items[0];
    assert_eq!(photo.media_key, "photo_key");
    assert_eq!(photo.file_name, "photo1.jpg");
    assert_eq!(photo.size_bytes, 1024);
    assert_eq!(photo.sha1_hash, PHOTO_SHA1);
    assert_eq!(photo.width, 4032);
    assert_eq!(photo.height, 3024);
    assert_eq!(photo.media_type, MediaType::Photo);
    assert_eq!(photo.media_type.code(), 1);

    let video = &result.items[1];
    assert_eq!(video.media_type, MediaType::Video);
    assert_eq!(video.media_type.code(), 2);
    assert_eq!(video.duration_ms, 15000);
    assert_eq!(video.width, 1920);
    assert_eq!(video.height, 1080);
    assert_eq!(video.dedup_key, "video_dedup");
}

#[test]
fn derived_dedup_key_keeps_hex_hash() {
    let wrapper = message(|m| {
        m.add_message(2, &photo_entry("k", "photo1.jpg"));
    });
    let result = parse_db_update(&response(&wrapper)).unwrap();

    let item = &result.items[0];
    assert_eq!(item.dedup_key, "x7K9mhI0VniQq83vEjRWeN6tvu8");
    assert_eq!(item.sha1_hash, PHOTO_SHA1);
}

#[test]
fn deletions_only() {
    let wrapper = message(|m| {
        m.add_message(9, &tombstone("deleted_key1"))
            .add_message(9, &tombstone("deleted_key2"));
    });

    let result = parse_db_update(&response(&wrapper)).unwrap();
    assert_eq!(result.items.len(), 0);
    assert_eq!(result.deleted_keys, vec!["deleted_key1", "deleted_key2"]);
}

#[test]
fn page_token_only() {
    let wrapper = message(|m| {
        m.add_string(1, "next_page_token");
    });

    let result = parse_db_update(&response(&wrapper)).unwrap();
    assert_eq!(result.page_token, "next_page_token");
    assert!(result.has_more_pages());
    assert!(result.items.is_empty());
    assert!(result.deleted_keys.is_empty());
}

#[test]
fn unknown_fields_are_ignored() {
    let wrapper = message(|m| {
        m.add_varint(3, 77)
            .add_fixed32(4, 0xDEAD_BEEF)
            .add_message(2, &photo_entry("k", "photo1.jpg"))
            .add_string(12, "future");
    });
    let result = parse_db_update(&response(&wrapper)).unwrap();
    assert_eq!(result.items.len(), 1);
}

#[test]
fn one_bad_item_fails_the_page() {
    let wrapper = message(|m| {
        m.add_message(2, &photo_entry("good", "a.jpg"))
            .add_bytes(2, &[0x0A, 0x7F, 0x00]);
    });
    let err = parse_db_update(&response(&wrapper)).unwrap_err();
    assert!(matches!(err, Error::MalformedItem { index: 1, .. }));
    assert!(err.is_recoverable());
}

#[test]
fn depth_limit_applies_to_items() {
    let wrapper = message(|m| {
        m.add_message(2, &photo_entry("k", "photo1.jpg"));
    });
    let decoder = Decoder::with_config(DecoderConfig::new().max_depth(2));
    let err = parse_db_update_with(&decoder, response(&wrapper)).unwrap_err();
    match err {
        Error::MalformedItem { source, .. } => {
            assert!(matches!(*source, Error::RecursionLimit { depth: 2 }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pages_apply_to_a_library() {
    let first = message(|m| {
        m.add_message(2, &photo_entry("photo_key", "photo1.jpg"))
            .add_message(2, &video_entry("video_key"))
            .add_string(1, "page_2")
            .add_string(6, "state_1");
    });
    let second = message(|m| {
        m.add_message(9, &tombstone("video_key"));
    });

    let mut library = MemoryLibrary::new();
    let mut stats = StatsSink::default();
    for page in [first, second] {
        let result = parse_db_update(&response(&page)).unwrap();
        result.apply(&mut library).unwrap();
        result.apply(&mut stats).unwrap();
    }

    assert_eq!(library.len(), 1);
    assert_eq!(library.get("photo_key").unwrap().file_name, "photo1.jpg");
    assert!(library.get("video_key").is_none());
    assert_eq!(library.state_token(), "state_1");
    assert_eq!(library.page_token(), "");

    assert_eq!(stats.upserted, 2);
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.pages, 2);
}
