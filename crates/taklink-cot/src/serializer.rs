//! XML serialization for CoT messages

use crate::event::{
    Contact, CotEvent, Detail, Group, PrecisionLocation, Status, Takv, Track,
};
use std::fmt::Write;

/// Serialize a CotEvent to an XML string
pub fn serialize_event(event: &CotEvent) -> String {
    let mut xml = String::new();

    writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#).unwrap();

    write!(
        xml,
        r#"<event version="{}" uid="{}" type="{}" time="{}" start="{}" stale="{}" how="{}">"#,
        event.version,
        event.uid,
        event.event_type,
        event.time.to_rfc3339(),
        event.start.to_rfc3339(),
        event.stale.to_rfc3339(),
        event.how
    )
    .unwrap();

    write!(
        xml,
        r#"<point lat="{}" lon="{}" hae="{}" ce="{}" le="{}"/>"#,
        event.point.lat, event.point.lon, event.point.hae, event.point.ce, event.point.le
    )
    .unwrap();

    if let Some(ref detail) = event.detail {
        write!(xml, "<detail>").unwrap();
        serialize_detail(&mut xml, detail);
        write!(xml, "</detail>").unwrap();
    }

    write!(xml, "</event>").unwrap();
    xml
}

fn serialize_detail(xml: &mut String, detail: &Detail) {
    if let Some(ref contact) = detail.contact {
        serialize_contact(xml, contact);
    }

    if let Some(ref group) = detail.group {
        serialize_group(xml, group);
    }

    if let Some(ref track) = detail.track {
        serialize_track(xml, track);
    }

    if let Some(ref status) = detail.status {
        serialize_status(xml, status);
    }

    if let Some(ref takv) = detail.takv {
        serialize_takv(xml, takv);
    }

    if let Some(ref precision_location) = detail.precision_location {
        serialize_precision_location(xml, precision_location);
    }

    // Unparsed children, emitted exactly as received
    if let Some(ref raw) = detail.raw {
        write!(xml, "{}", raw).unwrap();
    }
}

fn serialize_contact(xml: &mut String, contact: &Contact) {
    write!(xml, r#"<contact callsign="{}""#, contact.callsign).unwrap();
    if let Some(ref endpoint) = contact.endpoint {
        write!(xml, r#" endpoint="{}""#, endpoint).unwrap();
    }
    write!(xml, "/>").unwrap();
}

fn serialize_group(xml: &mut String, group: &Group) {
    write!(
        xml,
        r#"<__group name="{}" role="{}"/>"#,
        group.name, group.role
    )
    .unwrap();
}

fn serialize_track(xml: &mut String, track: &Track) {
    write!(
        xml,
        r#"<track speed="{}" course="{}"/>"#,
        track.speed, track.course
    )
    .unwrap();
}

fn serialize_status(xml: &mut String, status: &Status) {
    write!(xml, r#"<status battery="{}"/>"#, status.battery).unwrap();
}

fn serialize_takv(xml: &mut String, takv: &Takv) {
    write!(
        xml,
        r#"<takv device="{}" platform="{}" os="{}" version="{}"/>"#,
        takv.device, takv.platform, takv.os, takv.version
    )
    .unwrap();
}

fn serialize_precision_location(xml: &mut String, pl: &PrecisionLocation) {
    write!(
        xml,
        r#"<precisionlocation geopointsrc="{}" altsrc="{}"/>"#,
        pl.geopointsrc, pl.altsrc
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Point;
    use crate::parser::parse_cot;
    use chrono::Utc;

    fn base_event() -> CotEvent {
        CotEvent {
            version: "2.0".to_string(),
            uid: "test-1".to_string(),
            event_type: "a-f-G".to_string(),
            time: Utc::now(),
            start: Utc::now(),
            stale: Utc::now(),
            how: "h-e".to_string(),
            point: Point::new(37.7749, -122.4194, 100.0),
            detail: None,
        }
    }

    #[test]
    fn test_serialize_event_minimal() {
        let xml = serialize_event(&base_event());
        assert!(xml.contains(r#"uid="test-1""#));
        assert!(xml.contains(r#"type="a-f-G""#));
        assert!(xml.ends_with("</event>"));
    }

    #[test]
    fn test_serialize_event_with_contact() {
        let mut event = base_event();
        event.detail = Some(Detail {
            contact: Some(Contact {
                callsign: "Alpha-1".to_string(),
                endpoint: Some("192.168.1.100:4242".to_string()),
            }),
            ..Default::default()
        });

        let xml = serialize_event(&event);
        assert!(xml.contains(r#"callsign="Alpha-1""#));
        assert!(xml.contains(r#"endpoint="192.168.1.100:4242""#));
    }

    #[test]
    fn test_serialize_event_with_track() {
        let mut event = base_event();
        event.detail = Some(Detail {
            track: Some(Track {
                speed: 10.5,
                course: 270.0,
            }),
            ..Default::default()
        });

        let xml = serialize_event(&event);
        assert!(xml.contains(r#"speed="10.5""#));
        assert!(xml.contains(r#"course="270""#));
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let mut event = base_event();
        event.detail = Some(Detail {
            contact: Some(Contact {
                callsign: "Charlie-3".to_string(),
                endpoint: None,
            }),
            group: Some(Group {
                name: "Green".to_string(),
                role: "Team Lead".to_string(),
            }),
            status: Some(Status { battery: 42 }),
            raw: Some(r#"<remarks>hold position</remarks>"#.to_string()),
            ..Default::default()
        });

        let xml = serialize_event(&event);
        let decoded = parse_cot(&xml).expect("re-parse failed");

        assert_eq!(decoded.uid, event.uid);
        assert_eq!(decoded.event_type, event.event_type);
        assert_eq!(decoded.point, event.point);

        let detail = decoded.detail.expect("detail");
        assert_eq!(detail.contact.unwrap().callsign, "Charlie-3");
        assert_eq!(detail.group.unwrap().name, "Green");
        assert_eq!(detail.status.unwrap().battery, 42);
        assert_eq!(
            detail.raw.as_deref(),
            Some(r#"<remarks>hold position</remarks>"#)
        );
    }

    #[test]
    fn test_roundtrip_preserves_timestamps() {
        let xml = r#"<event version="2.0" uid="t-1" type="a-f-G" time="2024-01-15T10:30:00+00:00" start="2024-01-15T10:30:00+00:00" stale="2024-01-15T10:35:00+00:00" how="m-g">
    <point lat="1.5" lon="-2.25" hae="10"/>
</event>"#;

        let event = parse_cot(xml).expect("parse failed");
        let reencoded = serialize_event(&event);
        let event2 = parse_cot(&reencoded).expect("re-parse failed");

        assert_eq!(event.time, event2.time);
        assert_eq!(event.start, event2.start);
        assert_eq!(event.stale, event2.stale);
        assert_eq!(event, event2);
    }
}
