//! Wire codec.
//!
//! Encoded payloads are JSON envelopes:
//!
//! ```json
//! {"timestamp": "2024-05-01T12:00:00Z", "value": 45.0}
//! ```
//!
//! Telemetry values go on the wire *untagged*; the subject in the key says
//! how to read them back.  Plain-string payloads (handover acks, hold
//! requests, gate clears) are UTF-8 and trimmed.

use helm_types::{
    ControllerId, ControllerStatus, Event, EventPayload, GateDefinition, GateId, GeoPoint,
    HelmError, HoldRequest, NavCommand, NavStatus, TelemetryValue, Timestamped,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::keys::{InboundKey, KeySpace, subject};

/// Serialise a timestamped value into an envelope.
pub fn encode<T: Serialize>(value: &Timestamped<T>) -> Result<Vec<u8>, HelmError> {
    serde_json::to_vec(value).map_err(|e| HelmError::Decode {
        key: "encode".to_string(),
        reason: e.to_string(),
    })
}

/// Parse an envelope received on `key`.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<Timestamped<T>, HelmError> {
    serde_json::from_slice(bytes).map_err(|e| HelmError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Encode a telemetry field with its bare value in the envelope.
pub fn encode_telemetry(value: &Timestamped<TelemetryValue>) -> Result<Vec<u8>, HelmError> {
    fn env<T: Serialize>(ts: &Timestamped<TelemetryValue>, v: T) -> Result<Vec<u8>, HelmError> {
        encode(&Timestamped {
            timestamp: ts.timestamp,
            value: v,
        })
    }
    match &value.value {
        TelemetryValue::LocationFix(p) => env(value, p),
        TelemetryValue::CourseOverGround(v) | TelemetryValue::SpeedOverGround(v) => env(value, v),
        TelemetryValue::Name(n) => env(value, n),
        TelemetryValue::Mmsi(n) | TelemetryValue::Imo(n) => env(value, n),
        TelemetryValue::NavStatus(s) => env(value, s),
        TelemetryValue::RocStatus(rows) => env(value, rows),
    }
}

/// Decode a telemetry envelope published under `subject`.
///
/// # Errors
///
/// [`HelmError::Decode`] for an unknown subject or a malformed envelope.
pub fn decode_telemetry(subject: &str, bytes: &[u8]) -> Result<Timestamped<TelemetryValue>, HelmError> {
    fn map<T: DeserializeOwned>(
        subject: &str,
        bytes: &[u8],
        f: impl FnOnce(T) -> TelemetryValue,
    ) -> Result<Timestamped<TelemetryValue>, HelmError> {
        let Timestamped { timestamp, value } = decode::<T>(subject, bytes)?;
        Ok(Timestamped {
            timestamp,
            value: f(value),
        })
    }
    match subject {
        subject::LOCATION_FIX => map::<GeoPoint>(subject, bytes, TelemetryValue::LocationFix),
        subject::COURSE_OVER_GROUND => map(subject, bytes, TelemetryValue::CourseOverGround),
        subject::SPEED_OVER_GROUND => map(subject, bytes, TelemetryValue::SpeedOverGround),
        subject::NAME => map(subject, bytes, TelemetryValue::Name),
        subject::MMSI => map(subject, bytes, TelemetryValue::Mmsi),
        subject::IMO => map(subject, bytes, TelemetryValue::Imo),
        subject::NAV_STATUS => map::<NavStatus>(subject, bytes, TelemetryValue::NavStatus),
        subject::ROC_STATUS => {
            map::<Vec<ControllerStatus>>(subject, bytes, TelemetryValue::RocStatus)
        }
        other => Err(HelmError::Decode {
            key: other.to_string(),
            reason: "not a telemetry subject".to_string(),
        }),
    }
}

/// Plain-string view of a payload, trimmed.
pub fn text(key: &str, payload: &EventPayload) -> Result<String, HelmError> {
    match payload {
        EventPayload::Text(s) => Ok(s.trim().to_string()),
        EventPayload::Encoded(bytes) => std::str::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|e| HelmError::Decode {
                key: key.to_string(),
                reason: format!("payload is not UTF-8: {e}"),
            }),
    }
}

fn encoded<'p>(key: &str, payload: &'p EventPayload) -> Result<&'p [u8], HelmError> {
    match payload {
        EventPayload::Encoded(bytes) => Ok(bytes),
        EventPayload::Text(_) => Err(HelmError::Decode {
            key: key.to_string(),
            reason: "expected an encoded envelope, got plain text".to_string(),
        }),
    }
}

/// A decoded message addressed to the vessel.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Command(NavCommand),
    Relinquish(ControllerId),
    Takeover(ControllerId),
    Hold(HoldRequest),
    DefineGate(GateDefinition),
    ClearGate(GateId),
}

/// Decode an inbound event.
///
/// `Ok(None)` means the key is not addressed to this vessel (or not part of
/// the inbound vocabulary) and the event should be ignored silently.
pub fn decode_inbound(keys: &KeySpace, event: &Event) -> Result<Option<InboundMessage>, HelmError> {
    let key = event.source.as_str();
    let Some(kind) = keys.classify(key) else {
        return Ok(None);
    };
    let msg = match kind {
        InboundKey::Command { controller, kind } => {
            let controller_id = ControllerId::parse(&controller)?;
            let Timestamped { timestamp, value } =
                decode::<f64>(key, encoded(key, &event.payload)?)?;
            InboundMessage::Command(NavCommand {
                controller_id,
                kind,
                value,
                timestamp,
            })
        }
        InboundKey::Relinquish => {
            InboundMessage::Relinquish(ControllerId::parse(&text(key, &event.payload)?)?)
        }
        InboundKey::Takeover => {
            InboundMessage::Takeover(ControllerId::parse(&text(key, &event.payload)?)?)
        }
        InboundKey::Hold => InboundMessage::Hold(text(key, &event.payload)?.parse()?),
        InboundKey::DefineGate => {
            let def = decode::<GateDefinition>(key, encoded(key, &event.payload)?)?;
            InboundMessage::DefineGate(def.value)
        }
        InboundKey::ClearGate => InboundMessage::ClearGate(text(key, &event.payload)?.parse()?),
    };
    Ok(Some(msg))
}
