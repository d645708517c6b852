//! Plumbing around the [`VesselActor`][crate::VesselActor] queue.
//!
//! The actor owns the receiving end of one bounded `mpsc` queue.  Two helper
//! tasks feed it:
//!
//! - [`spawn_ticker`] – enqueues [`ActorEvent::Tick`] at a fixed rate, with
//!   `dt` measured from the previous tick.
//! - [`spawn_inbound_forwarder`] – drains [`Transport::inbound`] into
//!   [`ActorEvent::Inbound`].
//!
//! Neither task touches vessel state.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(actor: helm_runtime::VesselActor, transport: std::sync::Arc<dyn helm_middleware::Transport>) {
//! use std::sync::{Arc, atomic::AtomicBool};
//! use std::time::Duration;
//! use helm_runtime::driver;
//!
//! let shutdown = Arc::new(AtomicBool::new(false));
//! let (handle, rx) = driver::channel(driver::DEFAULT_QUEUE_CAPACITY);
//! driver::spawn_ticker(handle.clone(), Duration::from_millis(500), shutdown.clone());
//! driver::spawn_inbound_forwarder(transport, handle.clone());
//! let actor = tokio::spawn(actor.run(rx));
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use helm_middleware::Transport;
use helm_types::{Event, HelmError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::vessel_actor::ActorEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Sending half of the actor queue.  Cheap to clone.
#[derive(Clone, Debug)]
pub struct VesselHandle {
    tx: mpsc::Sender<ActorEvent>,
}

impl VesselHandle {
    pub async fn send(&self, event: ActorEvent) -> Result<(), HelmError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| HelmError::Channel("vessel actor has stopped".to_string()))
    }

    pub async fn tick(&self, dt: f64) -> Result<(), HelmError> {
        self.send(ActorEvent::Tick { dt }).await
    }

    pub async fn deliver(&self, event: Event) -> Result<(), HelmError> {
        self.send(ActorEvent::Inbound(event)).await
    }

    pub async fn shutdown(&self) -> Result<(), HelmError> {
        self.send(ActorEvent::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A fresh actor queue.
pub fn channel(capacity: usize) -> (VesselHandle, mpsc::Receiver<ActorEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (VesselHandle { tx }, rx)
}

/// Tick the actor every `period` until `shutdown` is set or the actor stops.
pub fn spawn_ticker(
    handle: VesselHandle,
    period: Duration,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; use it as the time origin.
        interval.tick().await;
        let mut last = Instant::now();
        loop {
            interval.tick().await;
            if shutdown.load(Ordering::Relaxed) {
                debug!("ticker: shutdown requested");
                break;
            }
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;
            if handle.tick(dt).await.is_err() {
                break;
            }
        }
        info!("ticker stopped");
    })
}

/// Forward every inbound transport event to the actor.
pub fn spawn_inbound_forwarder(transport: Arc<dyn Transport>, handle: VesselHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut inbound = transport.inbound().await;
        while let Some(event) = inbound.next().await {
            if handle.deliver(event).await.is_err() {
                break;
            }
        }
        info!("inbound forwarder stopped");
    })
}
