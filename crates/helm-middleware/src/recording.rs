//! In-process recording transport for tests and headless runs.
//!
//! [`RecordingTransport`] keeps every publication in memory and exposes an
//! injection handle for inbound events, so the full vessel loop can run
//! without a bus or a network.
//!
//! # Example
//!
//! ```rust
//! use helm_middleware::{RecordingTransport, Transport};
//! use helm_types::EventPayload;
//!
//! let t = RecordingTransport::new();
//! t.publish("rise/@v0/MASS_0/handover/state", EventPayload::Text("HANDOVER_COMPLETED".into()))
//!     .unwrap();
//! assert_eq!(t.texts_on("rise/@v0/MASS_0/handover/state"), vec!["HANDOVER_COMPLETED"]);
//! ```

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use helm_types::{Event, EventPayload, HelmError};
use tokio::sync::mpsc;

use crate::adapter::Transport;

pub struct RecordingTransport {
    published: Mutex<Vec<Event>>,
    inject_tx: mpsc::UnboundedSender<Event>,
    inject_rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        Self {
            published: Mutex::new(Vec::new()),
            inject_tx,
            inject_rx: Mutex::new(Some(inject_rx)),
        }
    }

    /// Queue an inbound event for the stream returned by
    /// [`Transport::inbound`].
    pub fn inject(&self, key: &str, payload: EventPayload) -> Result<(), HelmError> {
        self.inject_tx
            .send(Event::new(key, payload))
            .map_err(|e| HelmError::Channel(format!("inbound stream dropped: {e}")))
    }

    /// Everything published so far, oldest first.
    pub fn published(&self) -> Vec<Event> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Payloads published on exactly `key`.
    pub fn published_on(&self, key: &str) -> Vec<EventPayload> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.source == key)
            .map(|e| e.payload.clone())
            .collect()
    }

    /// Plain-text payloads published on `key`.
    pub fn texts_on(&self, key: &str) -> Vec<String> {
        self.published_on(key)
            .into_iter()
            .filter_map(|p| match p {
                EventPayload::Text(s) => Some(s),
                EventPayload::Encoded(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn publish(&self, key: &str, payload: EventPayload) -> Result<(), HelmError> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Event::new(key, payload));
        Ok(())
    }

    /// The first call takes the injection queue; later calls get an empty
    /// stream.
    async fn inbound(&self) -> BoxStream<'static, Event> {
        let rx = self
            .inject_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match rx {
            Some(mut rx) => Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))),
            None => Box::pin(stream::empty()),
        }
    }
}
