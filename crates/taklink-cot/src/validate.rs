//! Sanity checks applied to outbound events.

use crate::event::CotEvent;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("uid is empty")]
    EmptyUid,

    #[error("type is empty")]
    EmptyType,

    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("stale {stale} is not after start {start}")]
    StaleBeforeStart { start: String, stale: String },
}

/// Validate an event before serialization.
pub fn validate_event(event: &CotEvent) -> Result<(), ValidationError> {
    if event.uid.is_empty() {
        return Err(ValidationError::EmptyUid);
    }
    if event.event_type.is_empty() {
        return Err(ValidationError::EmptyType);
    }
    if !(-90.0..=90.0).contains(&event.point.lat) {
        return Err(ValidationError::LatitudeOutOfRange(event.point.lat));
    }
    if !(-180.0..=180.0).contains(&event.point.lon) {
        return Err(ValidationError::LongitudeOutOfRange(event.point.lon));
    }
    if event.stale <= event.start {
        return Err(ValidationError::StaleBeforeStart {
            start: event.start.to_rfc3339(),
            stale: event.stale.to_rfc3339(),
        });
    }
    Ok(())
}
