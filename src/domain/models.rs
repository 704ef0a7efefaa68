use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position and motion of a single fix, shaped like the provider reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Signed decimal degrees
    pub latitude: f64,
    /// Signed decimal degrees
    pub longitude: f64,
    /// Ground speed (m/s)
    #[serde(default)]
    pub speed: Option<f64>,
    /// Degrees clockwise from true north. Unknown when stationary.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Altitude (m)
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Horizontal accuracy (m)
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Altitude accuracy (m)
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }
}

/// One fix from the location provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Provider timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub coords: Coordinates,
}

impl PositionSample {
    pub fn new(timestamp: i64, coords: Coordinates) -> Self {
        Self { timestamp, coords }
    }
}

/// Why the provider could not produce a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

/// Acquisition failure reported by the provider's error callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationError {
    pub kind: LocationErrorKind,
    pub message: String,
}

impl LocationError {
    pub fn new(kind: LocationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// A value the peer channel can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Int(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Flat key -> primitive mapping, the only shape the peer channel accepts.
pub type Payload = BTreeMap<String, Primitive>;

/// Integer keys the watch firmware uses for each outbound field
pub mod keys {
    pub const TIMESTAMP: u32 = 10;
    pub const LAT: u32 = 11;
    pub const LON: u32 = 12;
    pub const SPEED: u32 = 13;
    pub const HEADING: u32 = 14;
    pub const ALT: u32 = 15;
    pub const ACC: u32 = 16;
    pub const ALT_ACC: u32 = 17;
    pub const DAY: u32 = 19;
    pub const MON: u32 = 20;
    pub const YEAR: u32 = 21;
    pub const HOUR: u32 = 22;
    pub const MIN: u32 = 23;
    pub const SEC: u32 = 24;
}

/// Location update in the fixed schema the watch expects.
///
/// Coordinates and speed are scaled by 1000 and truncated, calendar fields are
/// in local time. `heading` and `alt_acc` are 0 when the provider did not
/// report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub timestamp: i64,
    pub day: i32,
    pub mon: i32,
    pub year: i32,
    pub hour: i32,
    pub min: i32,
    pub sec: i32,
    pub lat: i32,
    pub lon: i32,
    pub speed: i32,
    pub heading: i32,
    pub alt: f64,
    pub acc: f64,
    pub alt_acc: f64,
}

impl OutboundMessage {
    /// Field name, firmware key and value for every field, in key order.
    fn fields(&self) -> [(&'static str, u32, Primitive); 14] {
        use Primitive::{Int, Number};
        [
            ("timestamp", keys::TIMESTAMP, Int(self.timestamp)),
            ("lat", keys::LAT, Int(self.lat.into())),
            ("lon", keys::LON, Int(self.lon.into())),
            ("speed", keys::SPEED, Int(self.speed.into())),
            ("heading", keys::HEADING, Int(self.heading.into())),
            ("alt", keys::ALT, Number(self.alt)),
            ("acc", keys::ACC, Number(self.acc)),
            ("alt_acc", keys::ALT_ACC, Number(self.alt_acc)),
            ("day", keys::DAY, Int(self.day.into())),
            ("mon", keys::MON, Int(self.mon.into())),
            ("year", keys::YEAR, Int(self.year.into())),
            ("hour", keys::HOUR, Int(self.hour.into())),
            ("min", keys::MIN, Int(self.min.into())),
            ("sec", keys::SEC, Int(self.sec.into())),
        ]
    }

    /// Flatten into the name-keyed payload handed to the transport.
    pub fn to_payload(&self) -> Payload {
        self.fields()
            .into_iter()
            .map(|(name, _, value)| (name.to_string(), value))
            .collect()
    }

    /// Same values addressed by the firmware's integer keys.
    pub fn keyed_entries(&self) -> Vec<(u32, Primitive)> {
        self.fields()
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .collect()
    }
}

/// Message received from the peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundMessage {
    pub payload: Payload,
}

impl InboundMessage {
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }
}

/// Identifier the transport assigns to each send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u32);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acknowledged,
    Failed(String),
}

/// Everything the bridge reacts to, funnelled through one queue.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The provider produced a fix
    Fix(PositionSample),
    /// The provider failed to produce a fix
    LocationError(LocationError),
    /// The peer channel is established
    TransportReady,
    /// The peer sent a message
    Inbound(InboundMessage),
    /// Completion signal for an earlier send
    Delivery {
        id: TransactionId,
        outcome: DeliveryOutcome,
    },
}
