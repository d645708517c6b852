//! Local tangent-plane geometry.
//!
//! Every distance and displacement in Helm is computed on a flat plane tangent
//! to the earth at the reference point:
//!
//! ```text
//! north = Δlat · R
//! east  = Δlon · R · cos(lat_ref)
//! ```
//!
//! with `R = 6 371 000 m`.  Gate radii are hundreds of metres, far below the
//! scale where curvature matters, and using a single projection keeps gate
//! containment, ETA prediction and dead reckoning mutually consistent.
//!
//! Longitude differences are taken the short way round the antimeridian.
//! The projection degenerates at the poles: there an east-west step has no
//! meaning and [`displace`] leaves the longitude unchanged.
//!
//! # Example
//!
//! ```rust
//! use helm_nav::geomath::{Velocity, time_to_circle};
//! use helm_types::GeoPoint;
//!
//! let vessel = GeoPoint::new(30.0, -40.0);
//! let gate = GeoPoint::new(30.001, -39.999);
//!
//! // 15 kn on a north-easterly course reaches the 100 m circle in ~6 s.
//! let eta = time_to_circle(vessel, Velocity::from_course(45.0, 15.0), gate, 100.0).unwrap();
//! assert!(eta > 5.0 && eta < 7.0);
//!
//! // Stationary: no prediction.
//! assert!(time_to_circle(vessel, Velocity::from_course(45.0, 0.0), gate, 100.0).is_none());
//! ```

use helm_types::GeoPoint;

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per second in one knot.
pub const KNOTS_TO_MPS: f64 = 0.514444;

/// `cos(lat)` below which a point is treated as sitting on a pole.
const POLE_COS_EPSILON: f64 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Planar vectors
// ────────────────────────────────────────────────────────────────────────────

/// Planar displacement in metres, east/north of a reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub east: f64,
    pub north: f64,
}

impl Offset {
    pub fn norm(self) -> f64 {
        self.east.hypot(self.north)
    }
}

/// Planar ground velocity in metres per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub east: f64,
    pub north: f64,
}

impl Velocity {
    /// Velocity of a vessel steering `cog_deg` (clockwise from north) at
    /// `sog_knots`.
    pub fn from_course(cog_deg: f64, sog_knots: f64) -> Self {
        let speed = sog_knots * KNOTS_TO_MPS;
        let theta = cog_deg.to_radians();
        Self {
            east: speed * theta.sin(),
            north: speed * theta.cos(),
        }
    }

    /// Squared speed, `|v|²`.
    pub fn norm_sq(self) -> f64 {
        self.east * self.east + self.north * self.north
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Projection
// ────────────────────────────────────────────────────────────────────────────

/// Wrap a longitude into `[-180, 180)`.  In-range values pass through
/// untouched.
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped >= 180.0 { -180.0 } else { wrapped }
}

/// Offset of `to` as seen from `from`, in the tangent plane at `from`.
pub fn offset(from: GeoPoint, to: GeoPoint) -> Offset {
    let lat = from.latitude.to_radians();
    Offset {
        east: wrap_longitude(to.longitude - from.longitude).to_radians()
            * EARTH_RADIUS_M
            * lat.cos(),
        north: (to.latitude - from.latitude).to_radians() * EARTH_RADIUS_M,
    }
}

/// Planar distance in metres between `a` and `b`.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    offset(a, b).norm()
}

/// Move `from` by `metres` along `cog_deg`.  Inverse of [`offset`] for small
/// steps.
///
/// Latitude is clamped to `[-90, 90]` and longitude wrapped into
/// `[-180, 180)`.  At a pole the longitude is kept as is.
pub fn displace(from: GeoPoint, cog_deg: f64, metres: f64) -> GeoPoint {
    let theta = cog_deg.to_radians();
    let dlat = metres * theta.cos() / EARTH_RADIUS_M;
    let latitude = (from.latitude + dlat.to_degrees()).clamp(-90.0, 90.0);

    let cos_lat = from.latitude.to_radians().cos();
    let longitude = if cos_lat.abs() < POLE_COS_EPSILON {
        from.longitude
    } else {
        let dlon = metres * theta.sin() / (EARTH_RADIUS_M * cos_lat);
        wrap_longitude(from.longitude + dlon.to_degrees())
    };
    GeoPoint::new(latitude, longitude)
}

// ────────────────────────────────────────────────────────────────────────────
// Circle intersection
// ────────────────────────────────────────────────────────────────────────────

/// Seconds until a point at `position` moving with constant `velocity` first
/// touches the circle of `radius_m` around `centre`.
///
/// With `d = centre − position` the trajectory meets the circle when
/// `A t² − B t + C = 0`, where `A = |v|²`, `B = 2 d·v` and `C = |d|² − r²`.
///
/// | Situation | Result |
/// |---|---|
/// | already inside (`|d| ≤ r`) | `Some(0.0)` |
/// | stationary (`A = 0`) | `None` |
/// | trajectory misses (discriminant < 0) | `None` |
/// | circle behind the vessel (both roots ≤ 0) | `None` |
/// | otherwise | smallest strictly positive root |
pub fn time_to_circle(
    position: GeoPoint,
    velocity: Velocity,
    centre: GeoPoint,
    radius_m: f64,
) -> Option<f64> {
    let d = offset(position, centre);
    let dist = d.norm();
    if dist <= radius_m {
        return Some(0.0);
    }

    let a = velocity.norm_sq();
    if a <= 0.0 {
        return None;
    }
    let b = 2.0 * (d.east * velocity.east + d.north * velocity.north);
    let c = dist * dist - radius_m * radius_m;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t1 = (b - root) / (2.0 * a);
    let t2 = (b + root) / (2.0 * a);

    [t1, t2]
        .into_iter()
        .filter(|t| *t > 0.0 && t.is_finite())
        .min_by(f64::total_cmp)
}
