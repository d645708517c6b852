//! [`HandoverCoordinator`] – gate-triggered transfer of navigational authority.
//!
//! ```text
//!            ETA ∈ (0, threshold] and no request yet
//!   IDLE ───────────────────────────────────────────► APPROACHING
//!    ▲          emits HandoverEvent::Requested            │
//!    │                                                     │ relinquish(holder)
//!    │   both acks present: authority flips,               │ takeover(other)
//!    │   target gate deactivated, Completed emitted        │ (either order)
//!    └─────────────────────────────────────────────────────┘
//!            or: optional timeout elapses, Expired emitted
//! ```
//!
//! The request is edge-triggered: while a session is open further approach
//! reports are ignored, so exactly one request is broadcast per session.
//! Completion is atomic from the caller's point of view since it happens
//! inside a single `&mut self` call.
//!
//! # Example
//!
//! ```
//! use helm_kernel::{ControllerRegistry, HandoverConfig, HandoverCoordinator, HandoverEvent};
//! use helm_nav::{GateRegistry, SafetyGate};
//! use helm_types::{ControllerId, GateId, GeoPoint};
//!
//! let roc1: ControllerId = "ROC_1".parse().unwrap();
//! let roc2: ControllerId = "ROC_2".parse().unwrap();
//! let mut controllers = ControllerRegistry::new(roc1.clone());
//! let mut gates = GateRegistry::new();
//! let gate = gates.add(SafetyGate::new(GateId(1), GeoPoint::new(30.0, -40.0), 100.0));
//!
//! let mut hc = HandoverCoordinator::new(HandoverConfig::default());
//! let req = hc.on_approach(Some((gate, 120.0)), controllers.holder());
//! assert!(matches!(req, Some(HandoverEvent::Requested { .. })));
//!
//! assert_eq!(hc.relinquish(&roc1, &mut controllers, &mut gates), Ok(None));
//! let done = hc.takeover(&roc2, &mut controllers, &mut gates).unwrap();
//! assert!(matches!(done, Some(HandoverEvent::Completed { .. })));
//! assert!(controllers.is_holder(&roc2));
//! assert!(!gates.get(gate).unwrap().active);
//! ```

use std::fmt;

use helm_nav::GateRegistry;
use helm_types::{ControllerId, GateId, HelmError};
use tracing::{debug, info, warn};

use crate::controller_registry::ControllerRegistry;

/// ETA (seconds) at or below which a handover request is broadcast.
pub const DEFAULT_ETA_THRESHOLD_SECS: f64 = 900.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HandoverConfig {
    pub eta_threshold_secs: f64,
    /// Simulated seconds an open session may wait for acknowledgements.
    /// `None` waits indefinitely.
    pub timeout_secs: Option<f64>,
}

impl Default for HandoverConfig {
    fn default() -> Self {
        Self {
            eta_threshold_secs: DEFAULT_ETA_THRESHOLD_SECS,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverPhase {
    Idle,
    Approaching,
}

impl fmt::Display for HandoverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoverPhase::Idle => f.write_str("IDLE"),
            HandoverPhase::Approaching => f.write_str("APPROACHING"),
        }
    }
}

/// The vessel's single handover session.  Acknowledgements only exist while
/// the session is active and are wiped on every reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthoritySession {
    active: bool,
    target_gate: Option<GateId>,
    request_broadcast: bool,
    relinquish_from: Option<ControllerId>,
    takeover_from: Option<ControllerId>,
    elapsed_secs: f64,
}

impl AuthoritySession {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn target_gate(&self) -> Option<GateId> {
        self.target_gate
    }

    pub fn request_broadcast(&self) -> bool {
        self.request_broadcast
    }

    pub fn relinquish_from(&self) -> Option<&ControllerId> {
        self.relinquish_from.as_ref()
    }

    pub fn takeover_from(&self) -> Option<&ControllerId> {
        self.takeover_from.as_ref()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn phase(&self) -> HandoverPhase {
        if self.active {
            HandoverPhase::Approaching
        } else {
            HandoverPhase::Idle
        }
    }
}

/// Outcome of a handover step that must be published.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoverEvent {
    Requested {
        gate: GateId,
        eta_secs: f64,
        holder: ControllerId,
    },
    Completed {
        previous: ControllerId,
        new_holder: ControllerId,
        gate: GateId,
    },
    Expired {
        gate: GateId,
        elapsed_secs: f64,
    },
}

/// Renders the wire text operators' consoles parse.
impl fmt::Display for HandoverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoverEvent::Requested {
                gate,
                eta_secs,
                holder,
            } => write!(
                f,
                "READY_FOR_HANDOVER gate_id={gate} time_to_gate={eta_secs:.1} current_roc={holder}"
            ),
            HandoverEvent::Completed {
                new_holder, gate, ..
            } => write!(f, "HANDOVER_COMPLETED new_priority={new_holder} gate={gate}"),
            HandoverEvent::Expired { gate, elapsed_secs } => {
                write!(f, "HANDOVER_EXPIRED gate={gate} elapsed={elapsed_secs:.1}")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HandoverCoordinator {
    config: HandoverConfig,
    session: AuthoritySession,
}

impl HandoverCoordinator {
    pub fn new(config: HandoverConfig) -> Self {
        Self {
            config,
            session: AuthoritySession::default(),
        }
    }

    pub fn config(&self) -> &HandoverConfig {
        &self.config
    }

    pub fn session(&self) -> &AuthoritySession {
        &self.session
    }

    /// Feed the tick's nearest approach.  Opens a session and returns the
    /// request when the ETA is strictly positive and within the threshold and
    /// no request has been broadcast yet.
    pub fn on_approach(
        &mut self,
        approach: Option<(GateId, f64)>,
        holder: &ControllerId,
    ) -> Option<HandoverEvent> {
        if self.session.request_broadcast {
            return None;
        }
        let (gate, eta) = approach?;
        if !(eta > 0.0 && eta <= self.config.eta_threshold_secs) {
            return None;
        }

        self.session = AuthoritySession {
            active: true,
            target_gate: Some(gate),
            request_broadcast: true,
            ..AuthoritySession::default()
        };
        info!(gate = %gate, eta_secs = eta, holder = %holder, "handover requested");
        Some(HandoverEvent::Requested {
            gate,
            eta_secs: eta,
            holder: holder.clone(),
        })
    }

    /// Advance the session clock by `dt` simulated seconds and expire the
    /// session if a timeout is configured and exceeded.
    pub fn advance(&mut self, dt: f64) -> Option<HandoverEvent> {
        if !self.session.active || !(dt.is_finite() && dt > 0.0) {
            return None;
        }
        self.session.elapsed_secs += dt;

        let timeout = self.config.timeout_secs?;
        if self.session.elapsed_secs <= timeout {
            return None;
        }
        let gate = self.session.target_gate?;
        let elapsed_secs = self.session.elapsed_secs;
        warn!(gate = %gate, elapsed_secs, timeout_secs = timeout, "handover session expired");
        self.session = AuthoritySession::default();
        Some(HandoverEvent::Expired { gate, elapsed_secs })
    }

    /// Record the holder's consent to give up authority.
    ///
    /// # Errors
    ///
    /// [`HelmError::ProtocolViolation`] when no session is active or `id` is
    /// not the holder.  The session is left untouched.
    pub fn relinquish(
        &mut self,
        id: &ControllerId,
        controllers: &mut ControllerRegistry,
        gates: &mut GateRegistry,
    ) -> Result<Option<HandoverEvent>, HelmError> {
        if !self.session.active {
            return Err(HelmError::ProtocolViolation(format!(
                "relinquish from {id} with no handover in progress"
            )));
        }
        if !controllers.is_holder(id) {
            return Err(HelmError::ProtocolViolation(format!(
                "relinquish from {id}, but authority is held by {}",
                controllers.holder()
            )));
        }
        debug!(controller = %id, "relinquish acknowledged");
        self.session.relinquish_from = Some(id.clone());
        Ok(self.try_complete(controllers, gates))
    }

    /// Record a non-holder's readiness to take authority.  Unknown
    /// controllers are registered as monitoring.
    ///
    /// # Errors
    ///
    /// [`HelmError::ProtocolViolation`] when no session is active or `id`
    /// already holds authority.
    pub fn takeover(
        &mut self,
        id: &ControllerId,
        controllers: &mut ControllerRegistry,
        gates: &mut GateRegistry,
    ) -> Result<Option<HandoverEvent>, HelmError> {
        if !self.session.active {
            return Err(HelmError::ProtocolViolation(format!(
                "takeover from {id} with no handover in progress"
            )));
        }
        if controllers.is_holder(id) {
            return Err(HelmError::ProtocolViolation(format!(
                "takeover from {id}, which already holds authority"
            )));
        }
        controllers.ensure_registered(id);
        debug!(controller = %id, "takeover acknowledged");
        self.session.takeover_from = Some(id.clone());
        Ok(self.try_complete(controllers, gates))
    }

    fn try_complete(
        &mut self,
        controllers: &mut ControllerRegistry,
        gates: &mut GateRegistry,
    ) -> Option<HandoverEvent> {
        if self.session.relinquish_from.is_none() {
            return None;
        }
        let new_holder = self.session.takeover_from.clone()?;
        let gate = self.session.target_gate?;

        let previous = controllers.transfer_to(new_holder.clone());
        gates.deactivate(gate);
        self.session = AuthoritySession::default();
        info!(gate = %gate, from = %previous, to = %new_holder, "handover completed");
        Some(HandoverEvent::Completed {
            previous,
            new_holder,
            gate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_nav::SafetyGate;
    use helm_types::GeoPoint;

    fn id(s: &str) -> ControllerId {
        ControllerId::parse(s).unwrap()
    }

    struct Fixture {
        hc: HandoverCoordinator,
        controllers: ControllerRegistry,
        gates: GateRegistry,
        gate: GateId,
    }

    fn fixture(config: HandoverConfig) -> Fixture {
        let mut gates = GateRegistry::new();
        let gate = gates.add(SafetyGate::new(GateId(1), GeoPoint::new(30.0, -40.0), 100.0));
        Fixture {
            hc: HandoverCoordinator::new(config),
            controllers: ControllerRegistry::new(id("ROC_1")),
            gates,
            gate,
        }
    }

    fn opened() -> Fixture {
        let mut f = fixture(HandoverConfig::default());
        let holder = f.controllers.holder().clone();
        assert!(f.hc.on_approach(Some((f.gate, 300.0)), &holder).is_some());
        f
    }

    #[test]
    fn request_is_broadcast_once_per_session() {
        let mut f = fixture(HandoverConfig::default());
        let holder = id("ROC_1");
        let first = f.hc.on_approach(Some((f.gate, 600.0)), &holder);
        assert_eq!(
            first,
            Some(HandoverEvent::Requested {
                gate: f.gate,
                eta_secs: 600.0,
                holder: holder.clone(),
            })
        );
        assert_eq!(f.hc.on_approach(Some((f.gate, 590.0)), &holder), None);
        assert_eq!(f.hc.on_approach(Some((f.gate, 0.0)), &holder), None);
        assert_eq!(f.hc.session().phase(), HandoverPhase::Approaching);
    }

    #[test]
    fn eta_outside_window_does_not_open() {
        let mut f = fixture(HandoverConfig::default());
        let holder = id("ROC_1");
        assert_eq!(f.hc.on_approach(None, &holder), None);
        assert_eq!(f.hc.on_approach(Some((f.gate, 900.1)), &holder), None);
        assert_eq!(f.hc.on_approach(Some((f.gate, 0.0)), &holder), None);
        assert_eq!(f.hc.session().phase(), HandoverPhase::Idle);
        assert!(f.hc.on_approach(Some((f.gate, 900.0)), &holder).is_some());
    }

    #[test]
    fn relinquish_then_takeover_completes() {
        let mut f = opened();
        assert_eq!(
            f.hc.relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates),
            Ok(None)
        );
        let done = f
            .hc
            .takeover(&id("ROC_2"), &mut f.controllers, &mut f.gates)
            .unwrap();
        assert_eq!(
            done,
            Some(HandoverEvent::Completed {
                previous: id("ROC_1"),
                new_holder: id("ROC_2"),
                gate: f.gate,
            })
        );
        assert!(f.controllers.is_holder(&id("ROC_2")));
        assert!(!f.gates.get(f.gate).unwrap().active);
        assert_eq!(f.hc.session(), &AuthoritySession::default());
    }

    #[test]
    fn takeover_then_relinquish_completes() {
        let mut f = opened();
        assert_eq!(
            f.hc.takeover(&id("ROC_2"), &mut f.controllers, &mut f.gates),
            Ok(None)
        );
        assert!(f.controllers.contains(&id("ROC_2")));
        assert!(f.controllers.is_holder(&id("ROC_1")));
        let done = f
            .hc
            .relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates)
            .unwrap();
        assert!(matches!(done, Some(HandoverEvent::Completed { .. })));
        assert!(f.controllers.is_holder(&id("ROC_2")));
    }

    #[test]
    fn acks_without_session_are_violations() {
        let mut f = fixture(HandoverConfig::default());
        assert!(matches!(
            f.hc.relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates),
            Err(HelmError::ProtocolViolation(_))
        ));
        assert!(matches!(
            f.hc.takeover(&id("ROC_2"), &mut f.controllers, &mut f.gates),
            Err(HelmError::ProtocolViolation(_))
        ));
        assert!(!f.controllers.contains(&id("ROC_2")));
    }

    #[test]
    fn relinquish_from_non_holder_is_rejected() {
        let mut f = opened();
        let before = f.hc.session().clone();
        assert!(matches!(
            f.hc.relinquish(&id("ROC_2"), &mut f.controllers, &mut f.gates),
            Err(HelmError::ProtocolViolation(_))
        ));
        assert_eq!(f.hc.session(), &before);
    }

    #[test]
    fn takeover_by_holder_is_rejected() {
        let mut f = opened();
        f.hc.relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates)
            .unwrap();
        assert!(matches!(
            f.hc.takeover(&id("ROC_1"), &mut f.controllers, &mut f.gates),
            Err(HelmError::ProtocolViolation(_))
        ));
        assert!(f.controllers.is_holder(&id("ROC_1")));
        assert!(f.gates.get(f.gate).unwrap().active);
    }

    #[test]
    fn latest_takeover_wins() {
        let mut f = opened();
        f.hc.takeover(&id("ROC_2"), &mut f.controllers, &mut f.gates)
            .unwrap();
        f.hc.takeover(&id("ROC_3"), &mut f.controllers, &mut f.gates)
            .unwrap();
        f.hc.relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates)
            .unwrap();
        assert!(f.controllers.is_holder(&id("ROC_3")));
    }

    #[test]
    fn old_holder_cannot_relinquish_after_completion() {
        let mut f = opened();
        f.hc.relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates)
            .unwrap();
        f.hc.takeover(&id("ROC_2"), &mut f.controllers, &mut f.gates)
            .unwrap();
        assert!(f
            .hc
            .relinquish(&id("ROC_1"), &mut f.controllers, &mut f.gates)
            .is_err());
    }

    #[test]
    fn no_timeout_waits_forever() {
        let mut f = opened();
        for _ in 0..10_000 {
            assert_eq!(f.hc.advance(1.0), None);
        }
        assert!(f.hc.session().is_active());
        assert_eq!(f.hc.session().elapsed_secs(), 10_000.0);
    }

    #[test]
    fn timeout_resets_and_rearms() {
        let mut f = fixture(HandoverConfig {
            timeout_secs: Some(5.0),
            ..HandoverConfig::default()
        });
        let holder = id("ROC_1");
        f.hc.on_approach(Some((f.gate, 100.0)), &holder).unwrap();
        f.hc.takeover(&id("ROC_2"), &mut f.controllers, &mut f.gates)
            .unwrap();
        for _ in 0..5 {
            assert_eq!(f.hc.advance(1.0), None);
        }
        let expired = f.hc.advance(1.0);
        assert_eq!(
            expired,
            Some(HandoverEvent::Expired {
                gate: f.gate,
                elapsed_secs: 6.0,
            })
        );
        assert_eq!(f.hc.session(), &AuthoritySession::default());
        // The stale takeover ack does not survive into the next session.
        f.hc.on_approach(Some((f.gate, 94.0)), &holder).unwrap();
        assert_eq!(
            f.hc.relinquish(&holder, &mut f.controllers, &mut f.gates),
            Ok(None)
        );
    }

    #[test]
    fn advance_ignores_idle_and_bad_dt() {
        let mut f = fixture(HandoverConfig {
            timeout_secs: Some(0.5),
            ..HandoverConfig::default()
        });
        assert_eq!(f.hc.advance(1.0), None);
        f.hc.on_approach(Some((f.gate, 10.0)), &id("ROC_1")).unwrap();
        assert_eq!(f.hc.advance(f64::NAN), None);
        assert_eq!(f.hc.advance(-3.0), None);
        assert_eq!(f.hc.session().elapsed_secs(), 0.0);
    }

    #[test]
    fn event_text_matches_operator_format() {
        let req = HandoverEvent::Requested {
            gate: GateId(1),
            eta_secs: 123.456,
            holder: id("ROC_1"),
        };
        assert_eq!(
            req.to_string(),
            "READY_FOR_HANDOVER gate_id=1 time_to_gate=123.5 current_roc=ROC_1"
        );
        let done = HandoverEvent::Completed {
            previous: id("ROC_1"),
            new_holder: id("ROC_2"),
            gate: GateId(1),
        };
        assert_eq!(done.to_string(), "HANDOVER_COMPLETED new_priority=ROC_2 gate=1");
        let expired = HandoverEvent::Expired {
            gate: GateId(4),
            elapsed_secs: 30.0,
        };
        assert_eq!(expired.to_string(), "HANDOVER_EXPIRED gate=4 elapsed=30.0");
    }
}
