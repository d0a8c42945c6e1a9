//! Wire format vectors
//!
//! Pins the JSON schema other client implementations must speak:
//! `{type, data, sender, sequence, timestamp}` with relay-stamped
//! `origin` and optional `target`.

use serde_json::{json, Value};
use stagelink_core::{codec, ConnectionId, Envelope, Payload, Role};

fn to_value(env: &Envelope) -> Value {
    serde_json::from_str(&codec::encode(env).unwrap()).unwrap()
}

#[test]
fn flag_kinds_have_no_data_field() {
    let v = to_value(&Envelope::new(Payload::Play, Role::Presenter, 4));
    assert_eq!(v["type"], "play");
    assert_eq!(v["sender"], "presenter");
    assert_eq!(v["sequence"], 4);
    assert!(v.get("data").is_none());
    assert!(v.get("origin").is_none());
    assert!(v.get("target").is_none());
}

#[test]
fn seek_carries_position() {
    let v = to_value(&Envelope::new(
        Payload::Seek { position: 42.5 },
        Role::Tablet,
        0,
    ));
    assert_eq!(v["type"], "seek");
    assert_eq!(v["data"], json!({ "position": 42.5 }));
}

#[test]
fn load_carries_media_id_camel_case() {
    let v = to_value(&Envelope::new(
        Payload::Load {
            media_id: "2".to_string(),
        },
        Role::Tablet,
        1,
    ));
    assert_eq!(v["type"], "load");
    assert_eq!(v["data"], json!({ "mediaId": "2" }));
}

#[test]
fn thumbnail_and_text_shapes() {
    let v = to_value(&Envelope::new(
        Payload::AudienceThumbnail {
            thumbnail: "aGVsbG8=".to_string(),
        },
        Role::Audience,
        12,
    ));
    assert_eq!(v["type"], "audience_thumbnail");
    assert_eq!(v["data"]["thumbnail"], "aGVsbG8=");

    let v = to_value(&Envelope::new(
        Payload::Text {
            message: "ready when you are".to_string(),
        },
        Role::Presenter,
        13,
    ));
    assert_eq!(v["type"], "text");
    assert_eq!(v["data"]["message"], "ready when you are");
}

#[test]
fn missing_sequence_decodes_as_zero() {
    // Older clients omit `sequence`; the schema extension treats
    // absence as 0.
    let env = codec::decode(
        r#"{"type":"pause","sender":"audience","timestamp":1700000000000}"#,
    )
    .unwrap();
    assert_eq!(env.sequence, 0);
    assert_eq!(env.payload, Payload::Pause);
    assert_eq!(env.sender, Role::Audience);
}

#[test]
fn origin_and_target_round_trip() {
    let mut env = Envelope::new(Payload::Mute, Role::Presenter, 2).with_target(Role::Audience);
    env.origin = Some(ConnectionId::from("abc-123".to_string()));

    let text = codec::encode(&env).unwrap();
    let v: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["origin"], "abc-123");
    assert_eq!(v["target"], "audience");

    assert_eq!(codec::decode(&text).unwrap(), env);
}

#[test]
fn hello_welcome_handshake_shapes() {
    let v = to_value(&Envelope::new(
        Payload::Hello {
            role: Role::Tablet,
        },
        Role::Tablet,
        0,
    ));
    assert_eq!(v["type"], "hello");
    assert_eq!(v["data"], json!({ "role": "tablet" }));

    let v = to_value(&Envelope::new(
        Payload::Welcome {
            connection_id: ConnectionId::from("conn-1".to_string()),
        },
        Role::Presenter,
        0,
    ));
    assert_eq!(v["type"], "welcome");
    assert_eq!(v["data"], json!({ "connectionId": "conn-1" }));
}

#[test]
fn unknown_kind_fails_to_decode() {
    let result = codec::decode(
        r#"{"type":"hologram","data":{},"sender":"tablet","timestamp":1}"#,
    );
    assert!(result.is_err());
}
