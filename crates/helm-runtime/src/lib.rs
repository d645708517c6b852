//! `helm-runtime` – The Vessel Loop
//!
//! Owns the running vessel: one actor task that holds all mutable state, fed
//! by a ticker and an inbound forwarder.
//!
//! # Modules
//!
//! - [`vessel_actor`] – [`VesselActor`]: integrates kinematics, watches the
//!   safety gates, drives the handover protocol and publishes telemetry.
//! - [`driver`] – [`VesselHandle`][driver::VesselHandle] and the helper tasks
//!   that feed the actor queue.
//! - [`telemetry`] – [`init_tracing`]: global `tracing` subscriber with
//!   optional OTLP span export.
//!
//! # Authority gating
//!
//! Every course or speed command **must** pass
//! [`AuthorityGuard::authorize_and_verify`] before it reaches the kinematics.
//! [`AuthorityGuard`] is re-exported here so callers wiring a runtime do not
//! need a direct dependency on `helm-kernel`.

pub mod driver;
pub mod telemetry;
pub mod vessel_actor;

pub use driver::{VesselHandle, spawn_inbound_forwarder, spawn_ticker};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use vessel_actor::{ActorEvent, VesselActor, VesselActorConfig};

pub use helm_kernel::AuthorityGuard;
