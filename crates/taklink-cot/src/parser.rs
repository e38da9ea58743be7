//! CoT XML parser built on quick-xml.

use crate::event::{
    Contact, CotEvent, Detail, Group, Point, PrecisionLocation, Status, Takv, Track,
};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid datetime format: {0}")]
    InvalidDateTime(String),

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Invalid event structure: {0}")]
    InvalidStructure(String),

    #[error("Input is not valid UTF-8")]
    InvalidUtf8,
}

/// Parse a CoT message from an XML string
pub fn parse_cot(xml: &str) -> Result<CotEvent, ParseError> {
    parse_cot_bytes(xml.as_bytes())
}

/// Parse a CoT message from XML bytes
pub fn parse_cot_bytes(xml: &[u8]) -> Result<CotEvent, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut detail_buf = Vec::new();

    // Event fields
    let mut version = None;
    let mut uid = None;
    let mut event_type = None;
    let mut time = None;
    let mut start = None;
    let mut stale = None;
    let mut how = None;
    let mut point = None;
    let mut detail = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => match e.name().as_ref() {
                b"event" => {
                    parse_event_attrs(
                        &e,
                        &mut version,
                        &mut uid,
                        &mut event_type,
                        &mut time,
                        &mut start,
                        &mut stale,
                        &mut how,
                    )?;
                }
                b"point" => {
                    point = Some(parse_point(&e)?);
                }
                b"detail" => {
                    detail = Some(parse_detail(&mut reader, &mut detail_buf)?);
                }
                _ => {}
            },
            XmlEvent::Empty(e) => match e.name().as_ref() {
                b"event" => {
                    parse_event_attrs(
                        &e,
                        &mut version,
                        &mut uid,
                        &mut event_type,
                        &mut time,
                        &mut start,
                        &mut stale,
                        &mut how,
                    )?;
                }
                b"point" => {
                    point = Some(parse_point(&e)?);
                }
                b"detail" => {
                    detail = Some(Detail::default());
                }
                _ => {}
            },
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(CotEvent {
        version: version.ok_or_else(|| ParseError::MissingField("version".into()))?,
        uid: uid.ok_or_else(|| ParseError::MissingField("uid".into()))?,
        event_type: event_type.ok_or_else(|| ParseError::MissingField("type".into()))?,
        time: time.ok_or_else(|| ParseError::MissingField("time".into()))?,
        start: start.ok_or_else(|| ParseError::MissingField("start".into()))?,
        stale: stale.ok_or_else(|| ParseError::MissingField("stale".into()))?,
        how: how.ok_or_else(|| ParseError::MissingField("how".into()))?,
        point: point.ok_or_else(|| ParseError::MissingField("point".into()))?,
        detail,
    })
}

#[allow(clippy::too_many_arguments)]
fn parse_event_attrs(
    e: &BytesStart,
    version: &mut Option<String>,
    uid: &mut Option<String>,
    event_type: &mut Option<String>,
    time: &mut Option<DateTime<Utc>>,
    start: &mut Option<DateTime<Utc>>,
    stale: &mut Option<DateTime<Utc>>,
    how: &mut Option<String>,
) -> Result<(), ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        let value = String::from_utf8_lossy(attr.value.as_ref());
        match attr.key.as_ref() {
            b"version" => *version = Some(value.into_owned()),
            b"uid" => *uid = Some(value.into_owned()),
            b"type" => *event_type = Some(value.into_owned()),
            b"time" => *time = Some(parse_datetime(&value)?),
            b"start" => *start = Some(parse_datetime(&value)?),
            b"stale" => *stale = Some(parse_datetime(&value)?),
            b"how" => *how = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(())
}

fn parse_point(e: &BytesStart) -> Result<Point, ParseError> {
    let mut lat = None;
    let mut lon = None;
    let mut hae = None;
    let mut ce = None;
    let mut le = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        let value = String::from_utf8_lossy(attr.value.as_ref());
        match attr.key.as_ref() {
            b"lat" => lat = Some(parse_f64(&value)?),
            b"lon" => lon = Some(parse_f64(&value)?),
            b"hae" => hae = Some(parse_f64(&value)?),
            b"ce" => ce = Some(parse_f64(&value)?),
            b"le" => le = Some(parse_f64(&value)?),
            _ => {}
        }
    }

    Ok(Point {
        lat: lat.ok_or_else(|| ParseError::MissingField("lat".into()))?,
        lon: lon.ok_or_else(|| ParseError::MissingField("lon".into()))?,
        hae: hae.unwrap_or(0.0),
        ce: ce.unwrap_or(9999999.0),
        le: le.unwrap_or(9999999.0),
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, ParseError> {
    s.parse::<DateTime<Utc>>()
        .map_err(|_| ParseError::InvalidDateTime(s.to_string()))
}

fn parse_f64(s: &str) -> Result<f64, ParseError> {
    s.parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

/// Parse the detail section: known children become structured fields, every
/// other child is re-emitted verbatim into the raw passthrough so it survives
/// a round-trip.
fn parse_detail(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<Detail, ParseError> {
    let mut detail = Detail::default();
    let mut raw = Writer::new(Vec::new());
    let mut unknown_depth = 0usize;
    let mut skip_buf = Vec::new();

    loop {
        match reader.read_event_into(buf)? {
            XmlEvent::Empty(e) => {
                if unknown_depth == 0 && is_known_child(e.name().as_ref()) {
                    apply_known_child(&mut detail, &e)?;
                } else {
                    write_raw(&mut raw, XmlEvent::Empty(e))?;
                }
            }
            XmlEvent::Start(e) => {
                if unknown_depth == 0 && is_known_child(e.name().as_ref()) {
                    // Known children are attribute-only; parse the attributes
                    // and skip whatever the sender nested inside.
                    apply_known_child(&mut detail, &e)?;
                    let end = e.to_end().into_owned();
                    reader.read_to_end_into(end.name(), &mut skip_buf)?;
                } else {
                    unknown_depth += 1;
                    write_raw(&mut raw, XmlEvent::Start(e))?;
                }
            }
            XmlEvent::End(e) => {
                if unknown_depth > 0 {
                    unknown_depth -= 1;
                    write_raw(&mut raw, XmlEvent::End(e))?;
                } else if e.name().as_ref() == b"detail" {
                    break;
                }
            }
            XmlEvent::Text(t) => {
                if unknown_depth > 0 {
                    write_raw(&mut raw, XmlEvent::Text(t))?;
                }
            }
            XmlEvent::CData(c) => {
                if unknown_depth > 0 {
                    write_raw(&mut raw, XmlEvent::CData(c))?;
                }
            }
            XmlEvent::Eof => {
                return Err(ParseError::InvalidStructure(
                    "unterminated detail section".into(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    let raw = raw.into_inner();
    if !raw.is_empty() {
        let raw = String::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8)?;
        detail.raw = Some(raw);
    }

    Ok(detail)
}

fn write_raw(writer: &mut Writer<Vec<u8>>, ev: XmlEvent) -> Result<(), ParseError> {
    writer
        .write_event(ev)
        .map_err(|e| ParseError::InvalidStructure(format!("detail passthrough: {e}")))
}

fn is_known_child(name: &[u8]) -> bool {
    matches!(
        name,
        b"contact" | b"__group" | b"track" | b"status" | b"takv" | b"precisionlocation"
    )
}

fn apply_known_child(detail: &mut Detail, e: &BytesStart) -> Result<(), ParseError> {
    match e.name().as_ref() {
        b"contact" => detail.contact = Some(parse_contact(e)?),
        b"__group" => detail.group = Some(parse_group(e)?),
        b"track" => detail.track = Some(parse_track(e)?),
        b"status" => detail.status = Some(parse_status(e)?),
        b"takv" => detail.takv = Some(parse_takv(e)?),
        b"precisionlocation" => detail.precision_location = Some(parse_precision_location(e)?),
        _ => {}
    }
    Ok(())
}

fn parse_contact(element: &BytesStart) -> Result<Contact, ParseError> {
    let mut endpoint = None;
    let mut callsign = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        match attr.key.as_ref() {
            b"endpoint" => {
                endpoint = Some(String::from_utf8_lossy(attr.value.as_ref()).into_owned());
            }
            b"callsign" => {
                callsign = Some(String::from_utf8_lossy(attr.value.as_ref()).into_owned());
            }
            _ => {}
        }
    }

    Ok(Contact {
        endpoint,
        callsign: callsign.ok_or_else(|| ParseError::MissingField("callsign".into()))?,
    })
}

fn parse_group(element: &BytesStart) -> Result<Group, ParseError> {
    let mut name = None;
    let mut role = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        match attr.key.as_ref() {
            b"name" => {
                name = Some(String::from_utf8_lossy(attr.value.as_ref()).into_owned());
            }
            b"role" => {
                role = Some(String::from_utf8_lossy(attr.value.as_ref()).into_owned());
            }
            _ => {}
        }
    }

    Ok(Group {
        name: name.ok_or_else(|| ParseError::MissingField("group name".into()))?,
        role: role.ok_or_else(|| ParseError::MissingField("group role".into()))?,
    })
}

fn parse_track(element: &BytesStart) -> Result<Track, ParseError> {
    let mut speed = None;
    let mut course = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        let value = String::from_utf8_lossy(attr.value.as_ref());
        match attr.key.as_ref() {
            b"speed" => speed = Some(parse_f64(&value)?),
            b"course" => course = Some(parse_f64(&value)?),
            _ => {}
        }
    }

    Ok(Track {
        speed: speed.ok_or_else(|| ParseError::MissingField("track speed".into()))?,
        course: course.ok_or_else(|| ParseError::MissingField("track course".into()))?,
    })
}

fn parse_status(element: &BytesStart) -> Result<Status, ParseError> {
    let mut battery = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        if attr.key.as_ref() == b"battery" {
            let value = String::from_utf8_lossy(attr.value.as_ref());
            battery = Some(
                value
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidNumber(value.to_string()))?,
            );
        }
    }

    Ok(Status {
        battery: battery.ok_or_else(|| ParseError::MissingField("battery".into()))?,
    })
}

fn parse_takv(element: &BytesStart) -> Result<Takv, ParseError> {
    let mut device = None;
    let mut platform = None;
    let mut os = None;
    let mut version = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        let value = String::from_utf8_lossy(attr.value.as_ref()).into_owned();
        match attr.key.as_ref() {
            b"device" => device = Some(value),
            b"platform" => platform = Some(value),
            b"os" => os = Some(value),
            b"version" => version = Some(value),
            _ => {}
        }
    }

    Ok(Takv {
        device: device.ok_or_else(|| ParseError::MissingField("takv device".into()))?,
        platform: platform.ok_or_else(|| ParseError::MissingField("takv platform".into()))?,
        os: os.ok_or_else(|| ParseError::MissingField("takv os".into()))?,
        version: version.ok_or_else(|| ParseError::MissingField("takv version".into()))?,
    })
}

fn parse_precision_location(element: &BytesStart) -> Result<PrecisionLocation, ParseError> {
    let mut geopointsrc = None;
    let mut altsrc = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidAttribute(e.to_string()))?;
        let value = String::from_utf8_lossy(attr.value.as_ref()).into_owned();
        match attr.key.as_ref() {
            b"geopointsrc" => geopointsrc = Some(value),
            b"altsrc" => altsrc = Some(value),
            _ => {}
        }
    }

    Ok(PrecisionLocation {
        geopointsrc: geopointsrc.ok_or_else(|| ParseError::MissingField("geopointsrc".into()))?,
        altsrc: altsrc.ok_or_else(|| ParseError::MissingField("altsrc".into()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_COT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<event version="2.0" uid="ANDROID-12345678" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="h-e">
    <point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="5.0"/>
    <detail>
        <contact callsign="Alpha-1"/>
        <remarks>Test CoT message</remarks>
    </detail>
</event>"#;

    #[test]
    fn test_parse_cot() {
        let event = parse_cot(EXAMPLE_COT).expect("Failed to parse CoT");

        assert_eq!(event.version, "2.0");
        assert_eq!(event.uid, "ANDROID-12345678");
        assert_eq!(event.event_type, "a-f-G");
        assert_eq!(event.how, "h-e");

        assert_eq!(event.point.lat, 37.7749);
        assert_eq!(event.point.lon, -122.4194);
        assert_eq!(event.point.hae, 100.0);
        assert_eq!(event.point.ce, 10.0);
        assert_eq!(event.point.le, 5.0);

        let detail = event.detail.expect("detail missing");
        assert_eq!(detail.contact.unwrap().callsign, "Alpha-1");
        let raw = detail.raw.expect("remarks should pass through");
        assert!(raw.contains("<remarks>"));
        assert!(raw.contains("Test CoT message"));
    }

    #[test]
    fn test_parse_minimal_cot() {
        let minimal_cot = r#"<event version="2.0" uid="test-1" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g">
    <point lat="0.0" lon="0.0" hae="0.0"/>
</event>"#;

        let event = parse_cot(minimal_cot).expect("Failed to parse minimal CoT");
        assert_eq!(event.version, "2.0");
        assert_eq!(event.uid, "test-1");
        assert_eq!(event.point.ce, 9999999.0);
        assert!(event.detail.is_none());
    }

    #[test]
    fn test_parse_malformed_cot() {
        let malformed = r#"<event version="2.0">invalid</event>"#;
        assert!(parse_cot(malformed).is_err());
    }

    #[test]
    fn test_parse_empty_detail() {
        let xml = r#"<event version="2.0" uid="d-1" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g">
    <point lat="1.0" lon="2.0" hae="3.0"/>
    <detail/>
</event>"#;

        let event = parse_cot(xml).expect("Failed to parse CoT");
        assert!(event.detail.expect("detail missing").is_empty());
    }

    #[test]
    fn test_parse_structured_detail() {
        let xml = r#"<event version="2.0" uid="d-2" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g">
    <point lat="1.0" lon="2.0" hae="3.0"/>
    <detail>
        <contact callsign="Bravo-2" endpoint="192.168.1.10:4242"/>
        <__group name="Cyan" role="Team Member"/>
        <track speed="12.5" course="270.0"/>
        <status battery="84"/>
        <takv device="PIXEL 6" platform="ATAK" os="31" version="4.8"/>
        <precisionlocation geopointsrc="GPS" altsrc="GPS"/>
    </detail>
</event>"#;

        let event = parse_cot(xml).expect("Failed to parse CoT");
        let detail = event.detail.expect("detail missing");

        let contact = detail.contact.expect("contact");
        assert_eq!(contact.callsign, "Bravo-2");
        assert_eq!(contact.endpoint.as_deref(), Some("192.168.1.10:4242"));

        let group = detail.group.expect("group");
        assert_eq!(group.name, "Cyan");
        assert_eq!(group.role, "Team Member");

        let track = detail.track.expect("track");
        assert_eq!(track.speed, 12.5);
        assert_eq!(track.course, 270.0);

        assert_eq!(detail.status.expect("status").battery, 84);
        assert_eq!(detail.takv.expect("takv").platform, "ATAK");
        assert_eq!(
            detail.precision_location.expect("precisionlocation").geopointsrc,
            "GPS"
        );
        assert!(detail.raw.is_none());
    }

    #[test]
    fn test_unknown_detail_subtree_passes_through() {
        let xml = r#"<event version="2.0" uid="d-3" type="b-m-p-s-p-loc" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="h-g-i-g-o">
    <point lat="1.0" lon="2.0" hae="3.0"/>
    <detail>
        <link uid="waypoint-1" relation="c"/>
        <shape><ellipse major="5000" minor="5000" angle="0"/></shape>
    </detail>
</event>"#;

        let event = parse_cot(xml).expect("Failed to parse CoT");
        let raw = event.detail.unwrap().raw.expect("raw passthrough");
        assert!(raw.contains(r#"<link uid="waypoint-1" relation="c"/>"#));
        assert!(raw.contains("<shape>"));
        assert!(raw.contains(r#"<ellipse major="5000" minor="5000" angle="0"/>"#));
        assert!(raw.contains("</shape>"));
    }

    #[test]
    fn test_unterminated_detail_is_error() {
        let xml = r#"<event version="2.0" uid="d-4" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g">
    <point lat="1.0" lon="2.0" hae="3.0"/>
    <detail><contact callsign="x"/>"#;
        assert!(parse_cot(xml).is_err());
    }
}
