//! Vessel state and dead-reckoning integration.
//!
//! [`VesselState`] holds the immutable identity of the vessel together with
//! its mutable kinematics.  [`integrate`] advances it over a time step:
//!
//! 1. While [`NavStatus::Holding`] the speed decays by `decel · dt`, floored
//!    at zero.  Holding models a commanded stop, so speed never rises.
//! 2. The position moves along the course at the (possibly reduced) speed
//!    using the tangent-plane step from [`geomath::displace`].
//!
//! [`KinematicsEngine`] wraps [`integrate`] with optional Gaussian noise on
//! course and speed for simulation fidelity.
//!
//! # Example
//!
//! ```rust
//! use helm_nav::kinematics::{VesselSpec, VesselState, integrate};
//! use helm_types::NavStatus;
//!
//! let mut state = VesselState::new(VesselSpec { sog_knots: 2.0, ..VesselSpec::default() });
//! state.set_nav_status(NavStatus::Holding);
//!
//! integrate(&mut state, 10.0); // 0.5 kn/s for 10 s
//! assert_eq!(state.sog_knots(), 0.0);
//! ```

use helm_types::{GeoPoint, HelmError, NavStatus};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::geomath::{self, KNOTS_TO_MPS, Velocity};

/// Bounds on the derived deceleration rate, knots per second.
const MIN_DECEL_KNOTS_PER_S: f64 = 0.01;
const MAX_DECEL_KNOTS_PER_S: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Identity & construction
// ────────────────────────────────────────────────────────────────────────────

/// Registrar identity of the vessel.  Fixed for the vessel's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VesselIdentity {
    name: String,
    mmsi: u32,
    imo: u32,
}

impl VesselIdentity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mmsi(&self) -> u32 {
        self.mmsi
    }

    pub fn imo(&self) -> u32 {
        self.imo
    }
}

/// Everything needed to create a [`VesselState`].
#[derive(Debug, Clone, PartialEq)]
pub struct VesselSpec {
    pub name: String,
    pub mmsi: u32,
    pub imo: u32,
    pub position: GeoPoint,
    pub cog_deg: f64,
    pub sog_knots: f64,
    /// Gross tonnage; only used to derive the deceleration rate.
    pub tonnage: f64,
    pub length_m: f64,
}

impl Default for VesselSpec {
    fn default() -> Self {
        Self {
            name: "MASS_0".to_string(),
            mmsi: 265_123_000,
            imo: 9_319_466,
            position: GeoPoint::new(30.0, -40.0),
            cog_deg: 0.0,
            sog_knots: 10.0,
            tonnage: 5000.0,
            length_m: 120.0,
        }
    }
}

/// Deceleration rate for a vessel of `tonnage`, in knots per second.
///
/// `clamp(5000 / (tonnage + 1), 0.01, 0.5)`.
pub fn decel_rate_for(tonnage: f64) -> f64 {
    (5000.0 / (tonnage + 1.0)).clamp(MIN_DECEL_KNOTS_PER_S, MAX_DECEL_KNOTS_PER_S)
}

// ────────────────────────────────────────────────────────────────────────────
// VesselState
// ────────────────────────────────────────────────────────────────────────────

/// Live state of the vessel.
///
/// Course is kept in `[0, 360)` and speed `≥ 0` by the setters.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselState {
    identity: VesselIdentity,
    length_m: f64,
    decel_rate: f64,
    position: GeoPoint,
    cog_deg: f64,
    sog_knots: f64,
    nav_status: NavStatus,
}

impl VesselState {
    /// Create the vessel under way at `VesselSpec`'s position, course and speed.
    pub fn new(spec: VesselSpec) -> Self {
        let mut state = Self {
            identity: VesselIdentity {
                name: spec.name,
                mmsi: spec.mmsi,
                imo: spec.imo,
            },
            length_m: spec.length_m,
            decel_rate: decel_rate_for(spec.tonnage),
            position: spec.position,
            cog_deg: 0.0,
            sog_knots: 0.0,
            nav_status: NavStatus::UnderWay,
        };
        state.set_cog(spec.cog_deg);
        state.set_sog(spec.sog_knots);
        state
    }

    pub fn identity(&self) -> &VesselIdentity {
        &self.identity
    }

    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    /// Knots lost per second while holding.
    pub fn decel_rate(&self) -> f64 {
        self.decel_rate
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn cog_deg(&self) -> f64 {
        self.cog_deg
    }

    pub fn sog_knots(&self) -> f64 {
        self.sog_knots
    }

    pub fn nav_status(&self) -> NavStatus {
        self.nav_status
    }

    /// Current ground velocity vector.
    pub fn velocity(&self) -> Velocity {
        Velocity::from_course(self.cog_deg, self.sog_knots)
    }

    /// Set the course, normalised into `[0, 360)`.  Non-finite values are
    /// ignored.
    pub fn set_cog(&mut self, cog_deg: f64) {
        if cog_deg.is_finite() {
            // rem_euclid can round up to exactly 360.0 for tiny negatives.
            let c = cog_deg.rem_euclid(360.0);
            self.cog_deg = if c >= 360.0 { 0.0 } else { c };
        }
    }

    /// Set the speed, floored at zero.  Non-finite values are ignored.
    pub fn set_sog(&mut self, sog_knots: f64) {
        if sog_knots.is_finite() {
            self.sog_knots = sog_knots.max(0.0);
        }
    }

    pub fn set_nav_status(&mut self, status: NavStatus) {
        self.nav_status = status;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Integration
// ────────────────────────────────────────────────────────────────────────────

/// Advance `state` by `dt` seconds.  Non-positive or non-finite `dt` is a
/// no-op.
pub fn integrate(state: &mut VesselState, dt: f64) {
    if !(dt.is_finite() && dt > 0.0) {
        debug!(dt, "ignoring non-positive integration step");
        return;
    }

    if state.nav_status == NavStatus::Holding {
        state.sog_knots = (state.sog_knots - state.decel_rate * dt).max(0.0);
    }

    let metres = state.sog_knots * KNOTS_TO_MPS * dt;
    state.position = geomath::displace(state.position, state.cog_deg, metres);
}

/// Standard deviations of the perturbation applied before each step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
    pub sog_sigma_knots: f64,
    pub cog_sigma_deg: f64,
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            sog_sigma_knots: 0.05,
            cog_sigma_deg: 0.2,
        }
    }
}

/// Zero-mean distributions built from a [`NoiseModel`].
#[derive(Debug, Clone, Copy)]
struct NoiseSampler {
    model: NoiseModel,
    sog: Normal<f64>,
    cog: Normal<f64>,
}

impl NoiseSampler {
    fn new(model: NoiseModel) -> Result<Self, HelmError> {
        let normal = |sigma: f64, what: &str| {
            if !sigma.is_finite() {
                return Err(HelmError::InvalidConfig(format!(
                    "{what} noise sigma must be finite, got {sigma}"
                )));
            }
            Normal::new(0.0, sigma)
                .map_err(|e| HelmError::InvalidConfig(format!("{what} noise sigma {sigma}: {e}")))
        };
        Ok(Self {
            model,
            sog: normal(model.sog_sigma_knots, "speed")?,
            cog: normal(model.cog_sigma_deg, "course")?,
        })
    }
}

/// Integrator with optional course/speed noise.
pub struct KinematicsEngine {
    noise: Option<NoiseSampler>,
    rng: StdRng,
}

impl KinematicsEngine {
    /// Deterministic engine without noise.
    pub fn new() -> Self {
        Self {
            noise: None,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Engine that perturbs course and speed every step.  Pass a `seed` for
    /// reproducible runs.
    ///
    /// Negative or non-finite sigmas are [`HelmError::InvalidConfig`].
    pub fn with_noise(noise: NoiseModel, seed: Option<u64>) -> Result<Self, HelmError> {
        let sampler = NoiseSampler::new(noise)?;
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            noise: Some(sampler),
            rng,
        })
    }

    pub fn noise(&self) -> Option<NoiseModel> {
        self.noise.map(|n| n.model)
    }

    /// Perturb (if configured) and integrate `state` over `dt` seconds.
    pub fn step(&mut self, state: &mut VesselState, dt: f64) {
        if let Some(noise) = self.noise {
            // Speed noise would let a holding vessel speed up.
            if state.nav_status == NavStatus::UnderWay {
                let dv = noise.sog.sample(&mut self.rng);
                state.set_sog(state.sog_knots + dv);
            }
            let dc = noise.cog.sample(&mut self.rng);
            state.set_cog(state.cog_deg + dc);
        }
        integrate(state, dt);
    }
}

impl Default for KinematicsEngine {
    fn default() -> Self {
        Self::new()
    }
}
