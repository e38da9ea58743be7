//! Decoding a realistic wire stream: framing plus parsing, fed at awkward
//! chunk boundaries.

use taklink_cot::{parse_cot_bytes, serialize_event, EventFramer};

const PLI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<event version="2.0" uid="ANDROID-deadbeef" type="a-f-G-U-C" time="2025-03-01T12:00:00Z" start="2025-03-01T12:00:00Z" stale="2025-03-01T12:05:00Z" how="m-g">
    <point lat="48.1351" lon="11.5820" hae="519.0" ce="5.0" le="3.0"/>
    <detail>
        <contact callsign="VIPER-1" endpoint="*:-1:stcp"/>
        <__group name="Blue" role="Team Lead"/>
        <takv device="SAMSUNG S23" platform="ATAK" os="34" version="5.0"/>
        <track speed="1.2" course="184.0"/>
        <status battery="77"/>
        <precisionlocation geopointsrc="GPS" altsrc="GPS"/>
        <uid Droid="VIPER-1"/>
    </detail>
</event>"#;

const CHAT: &str = r#"<event version="2.0" uid="GeoChat.x.y" type="b-t-f" time="2025-03-01T12:00:01Z" start="2025-03-01T12:00:01Z" stale="2025-03-01T12:10:01Z" how="h-g-i-g-o"><point lat="0" lon="0" hae="0"/><detail><remarks source="VIPER-1" time="2025-03-01T12:00:01Z">moving to rally point</remarks></detail></event>"#;

fn decode_stream(stream: &[u8], chunk_size: usize) -> Vec<String> {
    let mut framer = EventFramer::new();
    let mut uids = Vec::new();
    for chunk in stream.chunks(chunk_size) {
        framer.push(chunk);
        while let Some(frame) = framer.next_event().expect("framing error") {
            let event = parse_cot_bytes(&frame).expect("parse error");
            uids.push(event.uid);
        }
    }
    uids
}

#[test]
fn test_mixed_stream_decodes_identically_for_any_chunking() {
    let stream = format!("{PLI}\n{CHAT}\n{PLI}");

    let whole = decode_stream(stream.as_bytes(), stream.len());
    assert_eq!(
        whole,
        vec!["ANDROID-deadbeef", "GeoChat.x.y", "ANDROID-deadbeef"]
    );

    for chunk_size in [1, 2, 3, 7, 16, 64, 512] {
        assert_eq!(
            decode_stream(stream.as_bytes(), chunk_size),
            whole,
            "chunk size {chunk_size}"
        );
    }
}

#[test]
fn test_stream_with_garbage_between_documents() {
    let stream = format!("{CHAT}xxxx garbage xxxx{PLI}");

    let mut framer = EventFramer::new();
    framer.push(stream.as_bytes());

    let first = framer.next_event().unwrap().expect("first frame");
    assert_eq!(parse_cot_bytes(&first).unwrap().uid, "GeoChat.x.y");

    let second = framer.next_event().unwrap().expect("second frame");
    assert_eq!(parse_cot_bytes(&second).unwrap().uid, "ANDROID-deadbeef");

    assert_eq!(framer.discarded_bytes(), "xxxx garbage xxxx".len() as u64);
}

#[test]
fn test_decoded_stream_events_reserialize() {
    let mut framer = EventFramer::new();
    framer.push(PLI.as_bytes());
    let frame = framer.next_event().unwrap().expect("frame");

    let event = parse_cot_bytes(&frame).expect("parse error");
    assert_eq!(event.callsign(), Some("VIPER-1"));
    assert_eq!(event.group_name(), Some("Blue"));
    assert_eq!(event.speed(), Some(1.2));

    // the unknown <uid Droid=...> child survives the round trip
    let xml = serialize_event(&event);
    let again = parse_cot_bytes(xml.as_bytes()).expect("re-parse error");
    assert_eq!(again, event);
    assert!(xml.contains(r#"<uid Droid="VIPER-1"/>"#));
}
