//! Wire compatibility with a schema-driven protobuf implementation.

use photowire_core::{decode_raw, Error, WireEncoder};
use pretty_assertions::assert_eq;
use prost::Message;
use prost_types::{
    value::Kind, DescriptorProto, Duration, FieldDescriptorProto, FileDescriptorProto, Timestamp,
    Value,
};

#[test]
fn reads_prost_timestamp() {
    let ts = Timestamp {
        seconds: 1_700_000_000,
        nanos: 46_000_000,
    };
    let fields = decode_raw(&ts.encode_to_vec()).unwrap();
    assert_eq!(fields.get_varint(1), 1_700_000_000);
    assert_eq!(fields.get_uint(2), 46_000_000);
}

#[test]
fn reads_negative_int64() {
    let d = Duration {
        seconds: -5,
        nanos: 0,
    };
    let fields = decode_raw(&d.encode_to_vec()).unwrap();
    assert_eq!(fields.get_varint(1), -5);
    assert!(!fields.has(2));
}

#[test]
fn prost_reads_encoder_output() {
    let mut enc = WireEncoder::new();
    enc.add_varint(1, 1_700_000_000).add_varint(2, 46_000_000);

    let ts = Timestamp::decode(enc.as_slice()).unwrap();
    assert_eq!(ts.seconds, 1_700_000_000);
    assert_eq!(ts.nanos, 46_000_000);
}

#[test]
fn reads_nested_descriptor() {
    let file = FileDescriptorProto {
        name: Some("photo.proto".to_string()),
        package: Some("media".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("Item".to_string()),
                field: vec![FieldDescriptorProto {
                    name: Some("file_name".to_string()),
                    number: Some(4),
                    ..Default::default()
                }],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("Page".to_string()),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let fields = decode_raw(&file.encode_to_vec()).unwrap();
    assert_eq!(fields.get_string(1), "photo.proto");
    assert_eq!(fields.get_string(2), "media");

    let messages = fields.get_repeated_messages(4).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].get_string(1), "Item");
    assert_eq!(messages[1].get_string(1), "Page");

    let field = messages[0].get_message(2).unwrap();
    assert_eq!(field.get_string(1), "file_name");
    assert_eq!(field.get_uint(3), 4);
}

#[test]
fn rejects_fixed64_fields() {
    let value = Value {
        kind: Some(Kind::NumberValue(1.5)),
    };
    let err = decode_raw(&value.encode_to_vec()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidWireType {
            offset: 0,
            wire_type: 1
        }
    ));
}
