//! CoT (Cursor on Target) codec: XML parsing, serialization, and incremental
//! stream framing.
//!
//! CoT messages are small XML documents rooted at an `<event>` element. This
//! crate provides the decoded [`CotEvent`] model, a quick-xml based parser
//! and serializer that round-trip every represented field (unknown detail
//! children pass through verbatim), and an [`EventFramer`] that splits an
//! accumulating byte stream into complete documents regardless of how reads
//! chunk the wire.
//!
//! # Example
//!
//! ```rust
//! use taklink_cot::parse_cot;
//!
//! let cot_xml = r#"<event version="2.0" uid="test-1" type="a-f-G"
//!        time="2024-01-15T10:30:00Z"
//!        start="2024-01-15T10:30:00Z"
//!        stale="2024-01-15T10:35:00Z" how="h-e">
//!     <point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="5.0"/>
//! </event>"#;
//!
//! let event = parse_cot(cot_xml).expect("Failed to parse CoT");
//! assert_eq!(event.uid, "test-1");
//! assert_eq!(event.point.lat, 37.7749);
//! ```

pub mod event;
pub mod framer;
pub mod parser;
pub mod serializer;
pub mod validate;

pub use event::{Affiliation, Contact, CotEvent, Detail, Group, Point};
pub use framer::{EventFramer, FrameError, MAX_FRAME_SIZE};
pub use parser::{parse_cot, parse_cot_bytes, ParseError};
pub use serializer::serialize_event;
pub use validate::{validate_event, ValidationError};
