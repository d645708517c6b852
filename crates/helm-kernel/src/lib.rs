//! `helm-kernel` – Authority & Handover
//!
//! Decides *who* may steer the vessel and *when* that right changes hands.
//! Nothing here touches the transport; callers feed in commands and
//! acknowledgements and publish whatever events come back.
//!
//! # Modules
//!
//! - [`controller_registry`] – [`ControllerRegistry`]: the known remote
//!   operation centres and the single authority holder among them.
//! - [`authority_guard`] – [`AuthorityGuard`]: the interception point every
//!   inbound course/speed command passes before it may touch kinematics.
//!   Checks the sender holds authority, then sanity-checks the value.
//! - [`handover`] – [`HandoverCoordinator`]: the edge-triggered state machine
//!   that opens a handover session as a safety gate draws near and flips
//!   authority once both sides have acknowledged.

pub mod authority_guard;
pub mod controller_registry;
pub mod handover;

pub use authority_guard::{AuthorityGuard, VerifiedCommand};
pub use controller_registry::ControllerRegistry;
pub use handover::{
    AuthoritySession, HandoverConfig, HandoverCoordinator, HandoverEvent, HandoverPhase,
};
