//! [`GateRegistry`] – the vessel's circular safety gates.
//!
//! Gates are never removed.  Deactivation is terminal and kept for the
//! record; inactive gates are skipped by every query.
//!
//! # Example
//!
//! ```rust
//! use helm_nav::gates::{GateRegistry, SafetyGate};
//! use helm_types::{GateId, GeoPoint};
//!
//! let mut gates = GateRegistry::new();
//! let a = gates.add(SafetyGate::new(GateId(1), GeoPoint::new(30.0, -40.0), 100.0));
//! let b = gates.add(SafetyGate::new(GateId(1), GeoPoint::new(31.0, -40.0), 100.0));
//! assert_eq!((a, b), (GateId(1), GateId(2))); // collision bumps the id
//!
//! assert!(gates.is_inside_any(GeoPoint::new(30.0, -40.0)));
//! gates.deactivate(a);
//! assert!(!gates.is_inside_any(GeoPoint::new(30.0, -40.0)));
//! ```

use std::collections::BTreeMap;

use helm_types::{GateDefinition, GateId, GeoPoint, HelmError};
use tracing::{debug, info};

use crate::geomath::{self, Velocity};

/// A circular geofence.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyGate {
    pub id: GateId,
    pub centre: GeoPoint,
    pub radius_m: f64,
    pub active: bool,
}

impl SafetyGate {
    /// An active gate.  The id is the *requested* id; the registry may assign
    /// a different one on collision.
    pub fn new(id: GateId, centre: GeoPoint, radius_m: f64) -> Self {
        Self {
            id,
            centre,
            radius_m,
            active: true,
        }
    }

    /// Validate an operator-supplied definition.
    ///
    /// # Errors
    ///
    /// [`HelmError::InvalidCommand`] for non-finite coordinates, latitudes
    /// outside ±90° or a radius that is not strictly positive.
    pub fn from_definition(def: &GateDefinition) -> Result<Self, HelmError> {
        let finite = def.latitude.is_finite() && def.longitude.is_finite();
        if !finite || def.latitude.abs() > 90.0 {
            return Err(HelmError::InvalidCommand(format!(
                "gate {} centre ({}, {}) is not a valid position",
                def.id, def.latitude, def.longitude
            )));
        }
        if !(def.radius_m.is_finite() && def.radius_m > 0.0) {
            return Err(HelmError::InvalidCommand(format!(
                "gate {} radius {} must be a positive number of metres",
                def.id, def.radius_m
            )));
        }
        Ok(Self::new(
            def.id,
            GeoPoint::new(def.latitude, def.longitude),
            def.radius_m,
        ))
    }

    /// `true` when `position` is on or inside the circle.
    pub fn contains(&self, position: GeoPoint) -> bool {
        geomath::distance(position, self.centre) <= self.radius_m
    }
}

/// Ordered store of safety gates keyed by [`GateId`].
#[derive(Debug, Default, Clone)]
pub struct GateRegistry {
    gates: BTreeMap<GateId, SafetyGate>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `gate`, returning the id it was stored under.
    ///
    /// The requested id is kept when free; otherwise the smallest unused id
    /// above it is assigned.  Existing gates are never overwritten.
    pub fn add(&mut self, mut gate: SafetyGate) -> GateId {
        let requested = gate.id;
        let id = (requested.0..=u32::MAX)
            .chain(0..requested.0)
            .map(GateId)
            .find(|id| !self.gates.contains_key(id))
            // Only reachable with 2^32 gates registered.
            .unwrap_or(requested);
        if id != requested {
            debug!(requested = %requested, assigned = %id, "gate id taken; reassigned");
        }
        gate.id = id;
        info!(gate = %id, lat = gate.centre.latitude, lon = gate.centre.longitude,
            radius_m = gate.radius_m, "safety gate added");
        self.gates.insert(id, gate);
        id
    }

    /// Mark gate `id` inactive.
    ///
    /// Idempotent: returns `true` only when the gate was active before the
    /// call.  Unknown ids are ignored.
    pub fn deactivate(&mut self, id: GateId) -> bool {
        match self.gates.get_mut(&id) {
            Some(gate) if gate.active => {
                gate.active = false;
                info!(gate = %id, "safety gate deactivated");
                true
            }
            Some(_) => false,
            None => {
                debug!(gate = %id, "deactivate ignored: unknown gate");
                false
            }
        }
    }

    pub fn get(&self, id: GateId) -> Option<&SafetyGate> {
        self.gates.get(&id)
    }

    /// All gates, active or not, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SafetyGate> {
        self.gates.values()
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Earliest predicted boundary contact among active gates.
    ///
    /// Returns the gate with the smallest ETA (zero when already inside);
    /// ties go to the lowest id.  `None` when no active gate is reachable.
    pub fn nearest_approach(&self, position: GeoPoint, velocity: Velocity) -> Option<(GateId, f64)> {
        let mut best: Option<(GateId, f64)> = None;
        for gate in self.active() {
            let Some(eta) = geomath::time_to_circle(position, velocity, gate.centre, gate.radius_m)
            else {
                continue;
            };
            if !(eta.is_finite() && eta >= 0.0) {
                continue;
            }
            // Strict comparison keeps the lower id on ties (ids iterate ascending).
            if best.is_none_or(|(_, t)| eta < t) {
                best = Some((gate.id, eta));
            }
        }
        best
    }

    /// `true` when `position` is within any active gate.
    pub fn is_inside_any(&self, position: GeoPoint) -> bool {
        self.active().any(|g| g.contains(position))
    }

    fn active(&self) -> impl Iterator<Item = &SafetyGate> {
        self.gates.values().filter(|g| g.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geomath::displace;

    const ORIGIN: GeoPoint = GeoPoint::new(30.0, -40.0);

    fn gate_at(id: u32, bearing: f64, metres: f64, radius: f64) -> SafetyGate {
        SafetyGate::new(GateId(id), displace(ORIGIN, bearing, metres), radius)
    }

    #[test]
    fn add_keeps_free_requested_id() {
        let mut reg = GateRegistry::new();
        assert_eq!(reg.add(gate_at(5, 0.0, 500.0, 50.0)), GateId(5));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn add_picks_smallest_unused_id_at_or_above_request() {
        let mut reg = GateRegistry::new();
        reg.add(gate_at(1, 0.0, 500.0, 50.0));
        reg.add(gate_at(2, 0.0, 600.0, 50.0));
        reg.add(gate_at(4, 0.0, 700.0, 50.0));
        assert_eq!(reg.add(gate_at(1, 0.0, 800.0, 50.0)), GateId(3));
        assert_eq!(reg.add(gate_at(1, 0.0, 900.0, 50.0)), GateId(5));
        // Originals untouched.
        assert_eq!(reg.get(GateId(1)).unwrap().centre, displace(ORIGIN, 0.0, 500.0));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut reg = GateRegistry::new();
        let id = reg.add(gate_at(1, 0.0, 500.0, 50.0));
        assert!(reg.deactivate(id));
        let once = reg.get(id).cloned();
        assert!(!reg.deactivate(id));
        assert_eq!(reg.get(id).cloned(), once);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn deactivate_unknown_gate_is_noop() {
        let mut reg = GateRegistry::new();
        assert!(!reg.deactivate(GateId(99)));
    }

    #[test]
    fn nearest_approach_prefers_smallest_eta() {
        let mut reg = GateRegistry::new();
        reg.add(gate_at(1, 0.0, 2_000.0, 100.0));
        reg.add(gate_at(2, 0.0, 1_000.0, 100.0));
        let (id, eta) = reg
            .nearest_approach(ORIGIN, Velocity::from_course(0.0, 10.0))
            .unwrap();
        assert_eq!(id, GateId(2));
        assert!(eta > 0.0);
    }

    #[test]
    fn nearest_approach_ties_go_to_lowest_id() {
        let mut reg = GateRegistry::new();
        reg.add(gate_at(7, 0.0, 1_000.0, 100.0));
        reg.add(gate_at(3, 0.0, 1_000.0, 100.0));
        let (id, _) = reg
            .nearest_approach(ORIGIN, Velocity::from_course(0.0, 10.0))
            .unwrap();
        assert_eq!(id, GateId(3));
    }

    #[test]
    fn nearest_approach_skips_inactive_and_unreachable() {
        let mut reg = GateRegistry::new();
        let ahead = reg.add(gate_at(1, 0.0, 1_000.0, 100.0));
        reg.add(gate_at(2, 180.0, 1_000.0, 100.0));
        reg.deactivate(ahead);
        assert!(reg
            .nearest_approach(ORIGIN, Velocity::from_course(0.0, 10.0))
            .is_none());
    }

    #[test]
    fn nearest_approach_reports_zero_when_inside() {
        let mut reg = GateRegistry::new();
        reg.add(gate_at(1, 0.0, 2_000.0, 100.0));
        reg.add(gate_at(2, 90.0, 10.0, 100.0));
        assert_eq!(
            reg.nearest_approach(ORIGIN, Velocity::from_course(0.0, 10.0)),
            Some((GateId(2), 0.0))
        );
    }

    #[test]
    fn stationary_vessel_has_no_approach() {
        let mut reg = GateRegistry::new();
        reg.add(gate_at(1, 0.0, 1_000.0, 100.0));
        assert!(reg
            .nearest_approach(ORIGIN, Velocity::from_course(0.0, 0.0))
            .is_none());
    }

    #[test]
    fn is_inside_any_honours_active_flag() {
        let mut reg = GateRegistry::new();
        let id = reg.add(gate_at(1, 0.0, 50.0, 100.0));
        assert!(reg.is_inside_any(ORIGIN));
        reg.deactivate(id);
        assert!(!reg.is_inside_any(ORIGIN));
    }

    #[test]
    fn boundary_counts_as_inside() {
        let gate = SafetyGate::new(GateId(1), ORIGIN, 100.0);
        assert!(gate.contains(displace(ORIGIN, 0.0, 99.999)));
        assert!(!gate.contains(displace(ORIGIN, 0.0, 100.01)));
    }

    #[test]
    fn from_definition_rejects_bad_geometry() {
        let mut def = GateDefinition {
            id: GateId(1),
            latitude: 30.0,
            longitude: -40.0,
            radius_m: 100.0,
        };
        assert!(SafetyGate::from_definition(&def).is_ok());
        def.radius_m = 0.0;
        assert!(matches!(
            SafetyGate::from_definition(&def),
            Err(HelmError::InvalidCommand(_))
        ));
        def.radius_m = 100.0;
        def.latitude = 91.0;
        assert!(SafetyGate::from_definition(&def).is_err());
        def.latitude = f64::NAN;
        assert!(SafetyGate::from_definition(&def).is_err());
    }
}
