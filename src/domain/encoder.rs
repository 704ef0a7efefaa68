//! Position -> watch message encoding
//!
//! The peer channel carries no floating point for position fields, so
//! coordinates and speed travel as integers scaled by [`SCALE`] and truncated
//! toward zero (0.001 deg is roughly 111 m at the equator). Calendar fields are
//! decomposed in local time because the watch has no timezone database.
//!
//! Heading and altitude accuracy default to 0 when unknown. A heading of 0 is
//! therefore ambiguous with due north; consumers treat 0 heading at 0 speed as
//! "no bearing". Altitude and accuracy have no default and must be present.

use crate::domain::models::{OutboundMessage, PositionSample};
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};
use thiserror::Error;

/// Fixed-point scale for coordinates and speed
pub const SCALE: f64 = 1000.0;

/// A sample that cannot be expressed in the outbound schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("schema violation: sample has no {0}")]
    MissingField(&'static str),

    #[error("schema violation: {0} is not a finite number")]
    NonFinite(&'static str),

    #[error("schema violation: {field} = {value} does not fit a 32-bit integer")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("schema violation: timestamp {0} ms is not a representable instant")]
    InvalidTimestamp(i64),
}

/// Turns provider fixes into [`OutboundMessage`]s.
///
/// Pure apart from the timezone used for the calendar fields, which defaults to
/// the host's local zone.
#[derive(Debug, Clone)]
pub struct MessageEncoder<Tz: TimeZone = Local> {
    tz: Tz,
}

impl MessageEncoder<Local> {
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl Default for MessageEncoder<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> MessageEncoder<Tz> {
    /// Encoder decomposing timestamps in `tz` instead of the host zone.
    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn encode(&self, sample: &PositionSample) -> Result<OutboundMessage, EncodeError> {
        let coords = &sample.coords;

        let instant = DateTime::<Utc>::from_timestamp_millis(sample.timestamp)
            .ok_or(EncodeError::InvalidTimestamp(sample.timestamp))?;
        let local = instant.with_timezone(&self.tz);

        let alt = coords
            .altitude
            .ok_or(EncodeError::MissingField("altitude"))?;
        let acc = coords
            .accuracy
            .ok_or(EncodeError::MissingField("accuracy"))?;

        Ok(OutboundMessage {
            timestamp: sample.timestamp,
            day: local.day() as i32,
            mon: local.month() as i32,
            year: local.year(),
            hour: local.hour() as i32,
            min: local.minute() as i32,
            sec: local.second() as i32,
            lat: truncate("latitude", coords.latitude * SCALE)?,
            lon: truncate("longitude", coords.longitude * SCALE)?,
            speed: match known(coords.speed) {
                Some(speed) => truncate("speed", speed * SCALE)?,
                None => 0,
            },
            heading: match known(coords.heading) {
                Some(heading) => truncate("heading", heading)?,
                None => 0,
            },
            alt: finite("altitude", alt)?,
            acc: finite("accuracy", acc)?,
            alt_acc: known(coords.altitude_accuracy).unwrap_or(0.0),
        })
    }
}

/// Providers report NaN as well as null for "unknown".
fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn finite(field: &'static str, value: f64) -> Result<f64, EncodeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EncodeError::NonFinite(field))
    }
}

/// Truncate toward zero into the peer's integer type.
fn truncate(field: &'static str, value: f64) -> Result<i32, EncodeError> {
    let whole = finite(field, value)?.trunc();
    if whole < i32::MIN as f64 || whole > i32::MAX as f64 {
        return Err(EncodeError::OutOfRange { field, value });
    }
    Ok(whole as i32)
}
