//! `helm-types` – shared vocabulary for the Helm vessel stack.
//!
//! Identifiers, inbound/outbound message shapes, the bus [`Event`] envelope
//! and the [`HelmError`] taxonomy used by every other crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a remote operation centre (ROC) that may hold navigational
/// authority, e.g. `"ROC_1"`.
///
/// Always trimmed and non-empty; construct with [`ControllerId::parse`] or
/// [`str::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControllerId(String);

impl ControllerId {
    /// Validate and wrap a raw controller identifier.
    ///
    /// Surrounding whitespace is stripped.  Empty identifiers and identifiers
    /// containing `/` (which would corrupt key expressions) are rejected.
    pub fn parse(raw: &str) -> Result<Self, HelmError> {
        let id = raw.trim();
        if id.is_empty() || id.contains('/') {
            return Err(HelmError::InvalidControllerId(raw.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ControllerId {
    type Err = HelmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ControllerId {
    type Error = HelmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ControllerId> for String {
    fn from(id: ControllerId) -> Self {
        id.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a safety gate, unique within one vessel's gate registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GateId(pub u32);

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GateId {
    type Err = HelmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(GateId)
            .map_err(|e| HelmError::Decode {
                key: "gate_id".to_string(),
                reason: format!("{s:?} is not a gate id: {e}"),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geography & navigation state
// ─────────────────────────────────────────────────────────────────────────────

/// WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Navigation status published on `nav_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavStatus {
    /// Normal operation; commanded speed is held.
    #[default]
    UnderWay,
    /// Commanded stop; speed decays at the vessel's deceleration rate.
    Holding,
}

impl fmt::Display for NavStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavStatus::UnderWay => f.write_str("UNDER_WAY"),
            NavStatus::Holding => f.write_str("HOLDING"),
        }
    }
}

/// Operator hold-state request received on `{vessel}/state`.
///
/// Only `"go"` and `"no-go"` are valid; anything else is an
/// [`HelmError::InvalidState`] and never reaches the vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldRequest {
    Go,
    NoGo,
}

impl HoldRequest {
    /// The [`NavStatus`] this request puts the vessel in.
    pub fn nav_status(self) -> NavStatus {
        match self {
            HoldRequest::Go => NavStatus::UnderWay,
            HoldRequest::NoGo => NavStatus::Holding,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HoldRequest::Go => "go",
            HoldRequest::NoGo => "no-go",
        }
    }
}

impl FromStr for HoldRequest {
    type Err = HelmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "go" => Ok(HoldRequest::Go),
            "no-go" => Ok(HoldRequest::NoGo),
            other => Err(HelmError::InvalidState(format!(
                "state must be 'go' or 'no-go', got {other:?}"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound messages
// ─────────────────────────────────────────────────────────────────────────────

/// Which navigation quantity a [`NavCommand`] sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Course over ground, degrees.
    Cog,
    /// Speed over ground, knots.
    Sog,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Cog => f.write_str("COG"),
            CommandKind::Sog => f.write_str("SOG"),
        }
    }
}

/// A course or speed command from a remote operation centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavCommand {
    pub controller_id: ControllerId,
    pub kind: CommandKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// A value stamped with the time it was produced.  This is the envelope
/// every encoded payload on the wire carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    pub timestamp: DateTime<Utc>,
    pub value: T,
}

impl<T> Timestamped<T> {
    /// Stamp `value` with the current wall-clock time.
    pub fn now(value: T) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
        }
    }
}

/// Operator-supplied safety gate definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    pub id: GateId,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller status
// ─────────────────────────────────────────────────────────────────────────────

/// Operational state reported for a registered controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ControllerState {
    #[default]
    Monitoring,
}

/// One row of the `roc_status` telemetry message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub id: ControllerId,
    pub state: ControllerState,
    pub is_authorized: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus events
// ─────────────────────────────────────────────────────────────────────────────

/// Typed telemetry field, one per outbound telemetry topic.  Encoded onto the
/// wire by the middleware codec; the subject in the key says which variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryValue {
    LocationFix(GeoPoint),
    CourseOverGround(f64),
    SpeedOverGround(f64),
    Name(String),
    Mmsi(u32),
    Imo(u32),
    NavStatus(NavStatus),
    RocStatus(Vec<ControllerStatus>),
}

/// Unified event wrapper carried by the transport.
///
/// `source` holds the key expression the event was published on, e.g.
/// `"rise/@v0/MASS_0/pubsub/location_fix/gnss/0"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh event published on `source`.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can travel over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Plain UTF-8 string payload (handover traffic, operator status text).
    Text(String),
    /// Codec-enveloped payload awaiting decoding.
    Encoded(Vec<u8>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error taxonomy for the vessel core.  None of these are fatal: the event
/// loop logs them and drops the offending message.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HelmError {
    /// Malformed inbound payload.
    #[error("Decode error on {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Navigation command from a controller that does not hold authority.
    #[error("Unauthorized sender {sender}; authority is held by {holder}")]
    UnauthorizedSender {
        sender: ControllerId,
        holder: ControllerId,
    },

    /// Hold-state request outside `go` / `no-go`.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Relinquish/takeover outside an active session or from the wrong party.
    #[error("Handover protocol violation: {0}")]
    ProtocolViolation(String),

    /// Authorized command whose value is not physically meaningful.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid controller id: {0:?}")]
    InvalidControllerId(String),

    /// Configuration value outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The event queue or transport channel is closed.
    #[error("Channel error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_id_is_trimmed() {
        let id = ControllerId::parse("  ROC_2\n").unwrap();
        assert_eq!(id.as_str(), "ROC_2");
        assert_eq!(id.to_string(), "ROC_2");
    }

    #[test]
    fn controller_id_rejects_empty_and_slashes() {
        assert!(matches!(
            ControllerId::parse("   "),
            Err(HelmError::InvalidControllerId(_))
        ));
        assert!(ControllerId::parse("ROC/1").is_err());
    }

    #[test]
    fn controller_id_deserialization_validates() {
        let ok: ControllerId = serde_json::from_str("\"ROC_1\"").unwrap();
        assert_eq!(ok.as_str(), "ROC_1");
        assert!(serde_json::from_str::<ControllerId>("\"\"").is_err());
    }

    #[test]
    fn hold_request_parses_only_go_and_no_go() {
        assert_eq!("go".parse::<HoldRequest>().unwrap(), HoldRequest::Go);
        assert_eq!(" no-go ".parse::<HoldRequest>().unwrap(), HoldRequest::NoGo);
        assert!(matches!(
            "stop".parse::<HoldRequest>(),
            Err(HelmError::InvalidState(_))
        ));
        assert_eq!(HoldRequest::NoGo.nav_status(), NavStatus::Holding);
    }

    #[test]
    fn gate_id_parse_reports_decode_error() {
        assert_eq!("7".parse::<GateId>().unwrap(), GateId(7));
        assert!(matches!(
            "seven".parse::<GateId>(),
            Err(HelmError::Decode { .. })
        ));
    }

    #[test]
    fn nav_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&NavStatus::UnderWay).unwrap();
        assert_eq!(json, "\"UNDER_WAY\"");
        assert_eq!(NavStatus::Holding.to_string(), "HOLDING");
    }

    #[test]
    fn event_roundtrip() {
        let event = Event::new(
            "rise/@v0/MASS_0/pubsub/roc_status/bridge/0",
            EventPayload::Encoded(br#"{"timestamp":"2024-01-01T00:00:00Z","value":15.0}"#.to_vec()),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.source, back.source);
        assert_eq!(event.payload, back.payload);
    }

    #[test]
    fn helm_error_display() {
        let err = HelmError::UnauthorizedSender {
            sender: ControllerId::parse("ROC_2").unwrap(),
            holder: ControllerId::parse("ROC_1").unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ROC_2"));
        assert!(msg.contains("ROC_1"));

        let err2 = HelmError::ProtocolViolation("no active handover".into());
        assert!(err2.to_string().contains("no active handover"));
    }
}
