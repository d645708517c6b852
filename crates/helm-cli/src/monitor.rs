//! Terminal monitor – keeps the latest outbound vessel state for `/status`.
//!
//! Subscribes to the vessel's keys on the telemetry and handover lanes of the
//! [`EventBus`] and folds every event into a [`Snapshot`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use helm_middleware::codec;
use helm_middleware::keys::subject;
use helm_middleware::{EventBus, KeySpace, Topic};
use helm_types::{Event, EventPayload, TelemetryValue};
use tokio::task::JoinHandle;
use tracing::debug;

/// Most recent value seen on each outbound key of one vessel.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Decoded telemetry, keyed by subject.
    pub telemetry: BTreeMap<String, TelemetryValue>,
    pub remote_status: Option<String>,
    pub remote_time: Option<String>,
    /// Latest handover request, completion or expiry line.
    pub last_handover: Option<String>,
}

impl Snapshot {
    pub fn get(&self, subject: &str) -> Option<&TelemetryValue> {
        self.telemetry.get(subject)
    }
}

/// Shared view of the vessel as seen on the bus.  Cheap to clone.
#[derive(Clone)]
pub struct Monitor {
    keys: KeySpace,
    snapshot: Arc<Mutex<Snapshot>>,
}

impl Monitor {
    pub fn new(keys: KeySpace) -> Self {
        Self {
            keys,
            snapshot: Arc::new(Mutex::new(Snapshot::default())),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fold one outbound event into the snapshot.  Events for other vessels
    /// and undecodable payloads are skipped.
    pub fn apply(&self, event: &Event) {
        let key = event.source.as_str();
        if !key.starts_with(&self.keys.outbound_prefix()) {
            return;
        }
        let mut snap = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);

        if key == self.keys.handover_request() || key == self.keys.handover_state() {
            if let Ok(line) = codec::text(key, &event.payload) {
                snap.last_handover = Some(line);
            }
            return;
        }

        match self.keys.subject_of(key) {
            Some(subject::REMOTE_STATUS) => {
                snap.remote_status = codec::text(key, &event.payload).ok();
                // remote_time is only published while a gate lies ahead.
                snap.remote_time = None;
            }
            Some(subject::REMOTE_TIME) => {
                snap.remote_time = codec::text(key, &event.payload).ok();
            }
            Some(subj) => {
                let EventPayload::Encoded(bytes) = &event.payload else {
                    debug!(key, "monitor: plain-text telemetry ignored");
                    return;
                };
                match codec::decode_telemetry(subj, bytes) {
                    Ok(stamped) => {
                        snap.telemetry.insert(subj.to_string(), stamped.value);
                    }
                    Err(e) => debug!(key, error = %e, "monitor: undecodable telemetry"),
                }
            }
            None => {}
        }
    }

    /// Follow this vessel's keys on the telemetry and handover lanes until
    /// the bus is dropped.
    pub fn spawn(&self, bus: &EventBus) -> JoinHandle<()> {
        let prefix = self.keys.outbound_prefix();
        let mut telemetry = bus.subscribe_prefix(Topic::Telemetry, prefix.clone());
        let mut handover = bus.subscribe_prefix(Topic::Handover, prefix);
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    ev = telemetry.recv() => ev,
                    ev = handover.recv() => ev,
                };
                let Some(event) = event else { break };
                monitor.apply(&event);
            }
            debug!("monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_types::{GeoPoint, NavStatus, Timestamped};

    fn encoded(keys: &KeySpace, value: TelemetryValue) -> Event {
        let key = keys.telemetry(&value);
        let bytes = codec::encode_telemetry(&Timestamped::now(value)).unwrap();
        Event::new(key, EventPayload::Encoded(bytes))
    }

    #[test]
    fn telemetry_is_decoded_by_subject() {
        let keys = KeySpace::default();
        let monitor = Monitor::new(keys.clone());
        monitor.apply(&encoded(&keys, TelemetryValue::CourseOverGround(90.0)));
        monitor.apply(&encoded(&keys, TelemetryValue::NavStatus(NavStatus::Holding)));
        monitor.apply(&encoded(
            &keys,
            TelemetryValue::LocationFix(GeoPoint::new(30.0, -40.0)),
        ));

        let snap = monitor.snapshot();
        assert_eq!(
            snap.get(subject::COURSE_OVER_GROUND),
            Some(&TelemetryValue::CourseOverGround(90.0))
        );
        assert_eq!(
            snap.get(subject::NAV_STATUS),
            Some(&TelemetryValue::NavStatus(NavStatus::Holding))
        );
        assert_eq!(snap.telemetry.len(), 3);
    }

    #[test]
    fn remote_time_clears_with_each_status() {
        let keys = KeySpace::default();
        let monitor = Monitor::new(keys.clone());
        monitor.apply(&Event::new(
            keys.remote_status(),
            EventPayload::Text("Time to gate 1: 42.0s".into()),
        ));
        monitor.apply(&Event::new(keys.remote_time(), EventPayload::Text("42.0".into())));
        assert_eq!(monitor.snapshot().remote_time.as_deref(), Some("42.0"));

        monitor.apply(&Event::new(
            keys.remote_status(),
            EventPayload::Text("Normal. No gates on path".into()),
        ));
        let snap = monitor.snapshot();
        assert_eq!(snap.remote_status.as_deref(), Some("Normal. No gates on path"));
        assert_eq!(snap.remote_time, None);
    }

    #[test]
    fn only_the_latest_handover_line_is_kept() {
        let keys = KeySpace::default();
        let monitor = Monitor::new(keys.clone());
        monitor.apply(&Event::new(
            keys.handover_request(),
            EventPayload::Text("READY_FOR_HANDOVER gate_id=1 time_to_gate=10.0 current_roc=ROC_1".into()),
        ));
        monitor.apply(&Event::new(
            keys.handover_state(),
            EventPayload::Text("HANDOVER_COMPLETED new_priority=ROC_2 gate=1".into()),
        ));
        assert_eq!(
            monitor.snapshot().last_handover.as_deref(),
            Some("HANDOVER_COMPLETED new_priority=ROC_2 gate=1")
        );
    }

    #[test]
    fn other_vessels_and_bad_payloads_are_ignored() {
        let keys = KeySpace::default();
        let monitor = Monitor::new(keys.clone());
        let other = KeySpace::new("rise/@v0", "MASS_9");
        monitor.apply(&encoded(&other, TelemetryValue::SpeedOverGround(3.0)));
        monitor.apply(&Event::new(
            keys.pubsub(subject::SPEED_OVER_GROUND, "gnss/0"),
            EventPayload::Encoded(b"not json".to_vec()),
        ));
        assert!(monitor.snapshot().telemetry.is_empty());
    }

    #[tokio::test]
    async fn spawned_monitor_follows_the_bus() {
        let bus = EventBus::default();
        let keys = KeySpace::default();
        let monitor = Monitor::new(keys.clone());
        let task = monitor.spawn(&bus);

        bus.publish_to(Topic::Telemetry, encoded(&keys, TelemetryValue::SpeedOverGround(7.5)))
            .unwrap();
        bus.publish_to(
            Topic::Handover,
            Event::new(
                keys.handover_state(),
                EventPayload::Text("HANDOVER_EXPIRED gate=1 elapsed=60.0".into()),
            ),
        )
        .unwrap();

        while monitor.snapshot().last_handover.is_none()
            || monitor.snapshot().get(subject::SPEED_OVER_GROUND).is_none()
        {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            monitor.snapshot().get(subject::SPEED_OVER_GROUND),
            Some(&TelemetryValue::SpeedOverGround(7.5))
        );
        task.abort();
    }
}
