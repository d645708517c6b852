//! `helm-nav` – vessel geometry and motion.
//!
//! Pure navigation maths for the vessel core; nothing here knows about
//! controllers, transports or the event loop.
//!
//! # Modules
//!
//! - [`geomath`] – local tangent-plane distance, velocity vectors and the
//!   constant-velocity circle-intersection solver [`time_to_circle`][geomath::time_to_circle].
//! - [`kinematics`] – [`VesselState`][kinematics::VesselState] and the
//!   [`KinematicsEngine`][kinematics::KinematicsEngine] that integrates it
//!   over a time step, including the bounded deceleration applied while
//!   holding.
//! - [`gates`] – [`GateRegistry`][gates::GateRegistry]: the vessel's safety
//!   gates with containment and earliest-intersection queries.

pub mod gates;
pub mod geomath;
pub mod kinematics;

pub use gates::{GateRegistry, SafetyGate};
pub use geomath::{Velocity, distance, time_to_circle};
pub use kinematics::{KinematicsEngine, NoiseModel, VesselIdentity, VesselSpec, VesselState};
