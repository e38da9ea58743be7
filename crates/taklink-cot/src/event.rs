//! CoT event structures and affiliation parsing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoded Cursor on Target message.
///
/// Immutable once constructed; produced by the parser, consumed by callback
/// dispatch or serialized back to XML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CotEvent {
    /// CoT version (typically "2.0")
    pub version: String,
    /// Unique identifier for this event
    pub uid: String,
    /// CoT type (e.g., "a-f-G" for atom-friendly-ground)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event timestamp
    pub time: DateTime<Utc>,
    /// Event start time
    pub start: DateTime<Utc>,
    /// Event stale time (when the event becomes invalid)
    pub stale: DateTime<Utc>,
    /// How the event was generated (e.g., "h-e" for human-entered)
    pub how: String,
    /// Geographic location and accuracy
    pub point: Point,
    /// Optional structured detail section
    pub detail: Option<Detail>,
}

/// Geographic point with accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in decimal degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub lon: f64,
    /// Height above ellipsoid in meters
    pub hae: f64,
    /// Circular error in meters (95% confidence)
    pub ce: f64,
    /// Linear error in meters (95% confidence)
    pub le: f64,
}

/// Detail section: structured fields plus a verbatim passthrough for
/// everything the model does not represent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Detail {
    /// Contact information
    pub contact: Option<Contact>,
    /// Group information
    pub group: Option<Group>,
    /// Track information
    pub track: Option<Track>,
    /// Status information
    pub status: Option<Status>,
    /// TAK version information
    pub takv: Option<Takv>,
    /// Precision location source
    pub precision_location: Option<PrecisionLocation>,
    /// Unknown detail children, preserved as raw XML
    pub raw: Option<String>,
}

/// Contact information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Optional endpoint for communication
    pub endpoint: Option<String>,
    /// Callsign for display
    pub callsign: String,
}

/// Group information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,
    /// Group role
    pub role: String,
}

/// Track information for moving entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Speed in meters per second
    pub speed: f64,
    /// Course/heading in degrees (0-360)
    pub course: f64,
}

/// Status information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Battery level (0-100)
    pub battery: u32,
}

/// TAK version and device information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Takv {
    /// Device identifier
    pub device: String,
    /// Platform (e.g., "ATAK", "WinTAK", "iTAK")
    pub platform: String,
    /// Operating system
    pub os: String,
    /// Version string
    pub version: String,
}

/// Precision location source information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionLocation {
    /// Geopoint source (e.g., "GPS", "USER")
    pub geopointsrc: String,
    /// Altitude source (e.g., "GPS", "DTED")
    pub altsrc: String,
}

/// MIL-STD-2525 affiliation parsed from the CoT type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Affiliation {
    /// Pending (p)
    Pending,
    /// Unknown (u)
    Unknown,
    /// Assumed Friend (a)
    AssumedFriend,
    /// Friend (f)
    Friend,
    /// Neutral (n)
    Neutral,
    /// Suspect (s)
    Suspect,
    /// Hostile (h)
    Hostile,
    /// Joker (j)
    Joker,
    /// Faker (k)
    Faker,
    /// None specified (o)
    None,
}

impl Affiliation {
    /// Parse affiliation from a CoT type field such as "a-f-G", where the
    /// second dash-separated token carries the affiliation character.
    pub fn from_cot_type(cot_type: &str) -> Option<Self> {
        let parts: Vec<&str> = cot_type.split('-').collect();
        if parts.len() < 2 {
            return None;
        }

        match parts[1].chars().next() {
            Some('p') => Some(Affiliation::Pending),
            Some('u') => Some(Affiliation::Unknown),
            Some('a') => Some(Affiliation::AssumedFriend),
            Some('f') => Some(Affiliation::Friend),
            Some('n') => Some(Affiliation::Neutral),
            Some('s') => Some(Affiliation::Suspect),
            Some('h') => Some(Affiliation::Hostile),
            Some('j') => Some(Affiliation::Joker),
            Some('k') => Some(Affiliation::Faker),
            Some('o') => Some(Affiliation::None),
            _ => None,
        }
    }
}

impl fmt::Display for Affiliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affiliation::Pending => write!(f, "Pending"),
            Affiliation::Unknown => write!(f, "Unknown"),
            Affiliation::AssumedFriend => write!(f, "Assumed Friend"),
            Affiliation::Friend => write!(f, "Friend"),
            Affiliation::Neutral => write!(f, "Neutral"),
            Affiliation::Suspect => write!(f, "Suspect"),
            Affiliation::Hostile => write!(f, "Hostile"),
            Affiliation::Joker => write!(f, "Joker"),
            Affiliation::Faker => write!(f, "Faker"),
            Affiliation::None => write!(f, "None"),
        }
    }
}

impl Detail {
    /// Create a new empty Detail
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the detail carries no content at all
    pub fn is_empty(&self) -> bool {
        self.contact.is_none()
            && self.group.is_none()
            && self.track.is_none()
            && self.status.is_none()
            && self.takv.is_none()
            && self.precision_location.is_none()
            && self.raw.is_none()
    }
}

impl CotEvent {
    /// Get the affiliation from the event type
    pub fn affiliation(&self) -> Option<Affiliation> {
        Affiliation::from_cot_type(&self.event_type)
    }

    /// Get the callsign from the contact detail, if present
    pub fn callsign(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.contact.as_ref())
            .map(|c| c.callsign.as_str())
    }

    /// Get the group name from the group detail, if present
    pub fn group_name(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(|d| d.group.as_ref())
            .map(|g| g.name.as_str())
    }

    /// Get the speed from the track detail, if present
    pub fn speed(&self) -> Option<f64> {
        self.detail
            .as_ref()
            .and_then(|d| d.track.as_ref())
            .map(|t| t.speed)
    }

    /// Get the course from the track detail, if present
    pub fn course(&self) -> Option<f64> {
        self.detail
            .as_ref()
            .and_then(|d| d.track.as_ref())
            .map(|t| t.course)
    }
}

impl Point {
    /// Create a new Point with default accuracy values
    pub fn new(lat: f64, lon: f64, hae: f64) -> Self {
        Self {
            lat,
            lon,
            hae,
            ce: 9999999.0,
            le: 9999999.0,
        }
    }

    /// Create a new Point with specified accuracy
    pub fn with_accuracy(lat: f64, lon: f64, hae: f64, ce: f64, le: f64) -> Self {
        Self { lat, lon, hae, ce, le }
    }
}
