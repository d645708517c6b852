//! The transport seam.
//!
//! The vessel core never speaks to a concrete pub/sub system.  It is handed
//! an `Arc<dyn Transport>` and publishes keyed payloads through it, and it
//! drains [`Transport::inbound`] for messages addressed to it.
//!
//! - [`BusTransport`][crate::bus_transport::BusTransport] – routes through
//!   the in-process [`EventBus`][crate::bus::EventBus].
//! - [`RecordingTransport`][crate::recording::RecordingTransport] – captures
//!   publications and lets callers inject inbound events; used by tests and
//!   headless runs.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use helm_types::{Event, EventPayload, HelmError};

/// Every pub/sub backend must implement this trait.
///
/// # Contract
///
/// * `publish` is synchronous and fire-and-forget.  It must not block on slow
///   consumers; backends drop or buffer instead.  An `Err` is informational,
///   the caller logs it and carries on.
/// * `inbound` returns a live stream of events addressed to the vessel, in
///   arrival order.  It ends when the backend shuts down.
#[async_trait]
pub trait Transport: Send + Sync {
    fn publish(&self, key: &str, payload: EventPayload) -> Result<(), HelmError>;

    async fn inbound(&self) -> BoxStream<'static, Event>;
}
