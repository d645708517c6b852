//! Headless, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  A slow subscriber loses the *oldest* buffered events and is
//! told so with `RecvError::Lagged`.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Telemetry`] | Per-tick vessel telemetry and operator advisory text |
//! | [`Topic::Handover`] | Handover requests, completions and expiries |
//! | [`Topic::Inbound`] | Commands, acknowledgements, hold requests and gate edits addressed to a vessel |

use futures_util::stream::{self, BoxStream};
use helm_types::{Event, HelmError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Outbound vessel telemetry.
    Telemetry,
    /// Outbound handover protocol traffic.
    Handover,
    /// Everything sent *to* the vessel.
    Inbound,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    telemetry: broadcast::Sender<Event>,
    handover: broadcast::Sender<Event>,
    inbound: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus.  `capacity` is applied to every topic independently
    /// and must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (telemetry, _) = broadcast::channel(capacity);
        let (handover, _) = broadcast::channel(capacity);
        let (inbound, _) = broadcast::channel(capacity);
        Self {
            telemetry,
            handover,
            inbound,
        }
    }

    /// Publish `event` to the given [`Topic`].
    ///
    /// Returns the number of subscribers handed the event, or
    /// [`HelmError::Channel`] when nobody is listening on the topic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, HelmError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| HelmError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Subscribe to a single [`Topic`].
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Subscribe to `topic`, keeping only events whose key starts with
    /// `prefix`.
    pub fn subscribe_prefix(&self, topic: Topic, prefix: impl Into<String>) -> KeySubscriber {
        KeySubscriber {
            prefix: prefix.into(),
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Telemetry => &self.telemetry,
            Topic::Handover => &self.handover,
            Topic::Inbound => &self.inbound,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// * `Err(RecvError::Lagged(n))` – `n` events were dropped; the caller
    ///   may keep receiving.
    /// * `Err(RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Turn the receiver into a stream that logs and skips lag and ends when
    /// the bus closes.
    pub fn into_stream(self) -> BoxStream<'static, Event> {
        Box::pin(stream::unfold(self, |mut rx| async move {
            loop {
                match rx.receiver.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(topic = ?rx.topic, lagged_by = n, "topic receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// Key-prefix subscriber
// ---------------------------------------------------------------------------

/// Delivers only events whose `source` key starts with a prefix.
pub struct KeySubscriber {
    prefix: String,
    receiver: broadcast::Receiver<Event>,
}

impl KeySubscriber {
    /// Wait for the next matching event.  `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.source.starts_with(&self.prefix) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(prefix = %self.prefix, lagged_by = n, "KeySubscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
