//! [`BusTransport`] – [`Transport`] over the in-process [`EventBus`].
//!
//! Handover traffic goes to [`Topic::Handover`], everything else the vessel
//! publishes to [`Topic::Telemetry`].  Inbound events are read from
//! [`Topic::Inbound`].

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use helm_types::{Event, EventPayload, HelmError};
use tracing::debug;

use crate::adapter::Transport;
use crate::bus::{EventBus, Topic};
use crate::keys::KeySpace;

#[derive(Clone, Debug)]
pub struct BusTransport {
    bus: EventBus,
    handover_prefix: String,
}

impl BusTransport {
    pub fn new(bus: EventBus, keys: &KeySpace) -> Self {
        Self {
            bus,
            handover_prefix: format!("{}handover/", keys.outbound_prefix()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn topic_for(&self, key: &str) -> Topic {
        if key.starts_with(&self.handover_prefix) {
            Topic::Handover
        } else {
            Topic::Telemetry
        }
    }
}

#[async_trait]
impl Transport for BusTransport {
    /// Nobody listening is not a failure: the event is simply dropped.
    fn publish(&self, key: &str, payload: EventPayload) -> Result<(), HelmError> {
        let topic = self.topic_for(key);
        match self.bus.publish_to(topic, Event::new(key, payload)) {
            Ok(_) => Ok(()),
            Err(HelmError::Channel(_)) => {
                debug!(key, ?topic, "no subscribers; event dropped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn inbound(&self) -> BoxStream<'static, Event> {
        self.bus.subscribe_to(Topic::Inbound).into_stream()
    }
}
