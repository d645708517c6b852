//! Key expressions for one vessel.
//!
//! Outbound keys are absolute, `{base}/{vessel}/pubsub/{subject}/{source}`
//! for telemetry and `{base}/{vessel}/handover/{request,state}` for the
//! handover protocol.  Inbound keys are vessel-relative:
//!
//! ```text
//! {vessel}/control/roc/{controller}/COG
//! {vessel}/control/roc/{controller}/SOG
//! {vessel}/handover/relinquish
//! {vessel}/handover/takeover
//! {vessel}/state
//! {vessel}/gates/define
//! {vessel}/gates/clear
//! ```

use helm_types::{CommandKind, TelemetryValue};

pub const DEFAULT_KEY_BASE: &str = "rise/@v0";
pub const DEFAULT_VESSEL: &str = "MASS_0";

/// Outbound subject names.
pub mod subject {
    pub const LOCATION_FIX: &str = "location_fix";
    pub const COURSE_OVER_GROUND: &str = "course_over_ground_deg";
    pub const SPEED_OVER_GROUND: &str = "speed_over_ground_knots";
    pub const NAME: &str = "name";
    pub const MMSI: &str = "mmsi_number";
    pub const IMO: &str = "imo_number";
    pub const NAV_STATUS: &str = "nav_status";
    pub const ROC_STATUS: &str = "roc_status";
    pub const REMOTE_STATUS: &str = "remote_status";
    pub const REMOTE_TIME: &str = "remote_time";
}

/// Subject and source for a telemetry field.
pub fn telemetry_route(value: &TelemetryValue) -> (&'static str, &'static str) {
    match value {
        TelemetryValue::LocationFix(_) => (subject::LOCATION_FIX, "gnss/0"),
        TelemetryValue::CourseOverGround(_) => (subject::COURSE_OVER_GROUND, "gnss/0"),
        TelemetryValue::SpeedOverGround(_) => (subject::SPEED_OVER_GROUND, "gnss/0"),
        TelemetryValue::Name(_) => (subject::NAME, "registrar/0"),
        TelemetryValue::Mmsi(_) => (subject::MMSI, "registrar/0"),
        TelemetryValue::Imo(_) => (subject::IMO, "registrar/0"),
        TelemetryValue::NavStatus(_) => (subject::NAV_STATUS, "bridge/0"),
        TelemetryValue::RocStatus(_) => (subject::ROC_STATUS, "bridge/0"),
    }
}

/// Classified inbound key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKey {
    /// Course/speed command; `controller` is the raw path segment.
    Command { controller: String, kind: CommandKind },
    Relinquish,
    Takeover,
    Hold,
    DefineGate,
    ClearGate,
}

/// Key builder and classifier bound to one vessel.
///
/// # Example
///
/// ```
/// use helm_middleware::keys::{InboundKey, KeySpace};
/// use helm_types::CommandKind;
///
/// let keys = KeySpace::new("rise/@v0", "MASS_0");
/// assert_eq!(keys.pubsub("location_fix", "gnss/0"), "rise/@v0/MASS_0/pubsub/location_fix/gnss/0");
/// assert_eq!(
///     keys.classify("MASS_0/control/roc/ROC_2/SOG"),
///     Some(InboundKey::Command { controller: "ROC_2".into(), kind: CommandKind::Sog })
/// );
/// assert_eq!(keys.classify("MASS_1/handover/takeover"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    base: String,
    vessel: String,
}

impl KeySpace {
    pub fn new(base: impl Into<String>, vessel: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            vessel: vessel.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn vessel(&self) -> &str {
        &self.vessel
    }

    // ── outbound ────────────────────────────────────────────────────────────

    pub fn pubsub(&self, subject: &str, source: &str) -> String {
        format!("{}/{}/pubsub/{subject}/{source}", self.base, self.vessel)
    }

    pub fn telemetry(&self, value: &TelemetryValue) -> String {
        let (subject, source) = telemetry_route(value);
        self.pubsub(subject, source)
    }

    pub fn remote_status(&self) -> String {
        self.pubsub(subject::REMOTE_STATUS, "bridge/0")
    }

    pub fn remote_time(&self) -> String {
        self.pubsub(subject::REMOTE_TIME, "bridge/1")
    }

    pub fn handover_request(&self) -> String {
        format!("{}/{}/handover/request", self.base, self.vessel)
    }

    pub fn handover_state(&self) -> String {
        format!("{}/{}/handover/state", self.base, self.vessel)
    }

    /// Prefix shared by every outbound key of this vessel.
    pub fn outbound_prefix(&self) -> String {
        format!("{}/{}/", self.base, self.vessel)
    }

    /// Subject segment of an outbound pubsub key, if it is one of ours.
    pub fn subject_of<'k>(&self, key: &'k str) -> Option<&'k str> {
        let rest = key.strip_prefix(&self.outbound_prefix())?;
        rest.strip_prefix("pubsub/")?.split('/').next()
    }

    // ── inbound ─────────────────────────────────────────────────────────────

    pub fn command(&self, controller: &str, kind: CommandKind) -> String {
        format!("{}/control/roc/{controller}/{kind}", self.vessel)
    }

    pub fn relinquish(&self) -> String {
        format!("{}/handover/relinquish", self.vessel)
    }

    pub fn takeover(&self) -> String {
        format!("{}/handover/takeover", self.vessel)
    }

    pub fn hold_state(&self) -> String {
        format!("{}/state", self.vessel)
    }

    pub fn define_gate(&self) -> String {
        format!("{}/gates/define", self.vessel)
    }

    pub fn clear_gate(&self) -> String {
        format!("{}/gates/clear", self.vessel)
    }

    /// Classify an inbound key.  `None` for keys addressed to another vessel
    /// or not part of the inbound vocabulary.
    pub fn classify(&self, key: &str) -> Option<InboundKey> {
        let rest = key.strip_prefix(self.vessel.as_str())?.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            ["control", "roc", controller, kind] if !controller.is_empty() => {
                let kind = match *kind {
                    "COG" => CommandKind::Cog,
                    "SOG" => CommandKind::Sog,
                    _ => return None,
                };
                Some(InboundKey::Command {
                    controller: (*controller).to_string(),
                    kind,
                })
            }
            ["handover", "relinquish"] => Some(InboundKey::Relinquish),
            ["handover", "takeover"] => Some(InboundKey::Takeover),
            ["state"] => Some(InboundKey::Hold),
            ["gates", "define"] => Some(InboundKey::DefineGate),
            ["gates", "clear"] => Some(InboundKey::ClearGate),
            _ => None,
        }
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_BASE, DEFAULT_VESSEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_types::GeoPoint;

    #[test]
    fn outbound_keys_follow_pubsub_layout() {
        let keys = KeySpace::default();
        assert_eq!(
            keys.telemetry(&TelemetryValue::LocationFix(GeoPoint::new(0.0, 0.0))),
            "rise/@v0/MASS_0/pubsub/location_fix/gnss/0"
        );
        assert_eq!(
            keys.telemetry(&TelemetryValue::Mmsi(1)),
            "rise/@v0/MASS_0/pubsub/mmsi_number/registrar/0"
        );
        assert_eq!(keys.remote_time(), "rise/@v0/MASS_0/pubsub/remote_time/bridge/1");
        assert_eq!(keys.handover_request(), "rise/@v0/MASS_0/handover/request");
        assert_eq!(keys.handover_state(), "rise/@v0/MASS_0/handover/state");
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let keys = KeySpace::new("rise/@v0/", "MASS_0");
        assert_eq!(keys.handover_state(), "rise/@v0/MASS_0/handover/state");
    }

    #[test]
    fn subject_of_extracts_our_subjects_only() {
        let keys = KeySpace::default();
        assert_eq!(
            keys.subject_of("rise/@v0/MASS_0/pubsub/nav_status/bridge/0"),
            Some("nav_status")
        );
        assert_eq!(keys.subject_of("rise/@v0/MASS_1/pubsub/nav_status/bridge/0"), None);
        assert_eq!(keys.subject_of("rise/@v0/MASS_0/handover/state"), None);
    }

    #[test]
    fn builders_and_classifier_agree() {
        let keys = KeySpace::default();
        assert_eq!(
            keys.classify(&keys.command("ROC_1", CommandKind::Cog)),
            Some(InboundKey::Command {
                controller: "ROC_1".into(),
                kind: CommandKind::Cog
            })
        );
        assert_eq!(keys.classify(&keys.relinquish()), Some(InboundKey::Relinquish));
        assert_eq!(keys.classify(&keys.takeover()), Some(InboundKey::Takeover));
        assert_eq!(keys.classify(&keys.hold_state()), Some(InboundKey::Hold));
        assert_eq!(keys.classify(&keys.define_gate()), Some(InboundKey::DefineGate));
        assert_eq!(keys.classify(&keys.clear_gate()), Some(InboundKey::ClearGate));
    }

    #[test]
    fn foreign_and_malformed_keys_are_ignored() {
        let keys = KeySpace::default();
        assert_eq!(keys.classify("MASS_01/state"), None);
        assert_eq!(keys.classify("MASS_0/COG"), None);
        assert_eq!(keys.classify("MASS_0/control/roc/ROC_1/RPM"), None);
        assert_eq!(keys.classify("MASS_0/control/roc//COG"), None);
        assert_eq!(keys.classify("MASS_0/control/roc/ROC_1/COG/extra"), None);
    }
}
