//! Property tests: only the authority holder can steer the vessel.
//!
//! Arbitrary course and speed commands, including NaN, negative and huge
//! values, are pushed through the actor's inbound path from controllers that
//! do not hold authority.  Course and speed must come out bit-identical.

use std::sync::Arc;

use helm_middleware::RecordingTransport;
use helm_middleware::codec;
use helm_nav::{SafetyGate, VesselSpec};
use helm_runtime::{VesselActor, VesselActorConfig};
use helm_types::{CommandKind, ControllerId, Event, EventPayload, GateId, GeoPoint, Timestamped};
use proptest::prelude::*;

fn roc(s: &str) -> ControllerId {
    ControllerId::parse(s).unwrap()
}

fn actor() -> VesselActor {
    let spec = VesselSpec {
        position: GeoPoint::new(30.0, -40.0),
        cog_deg: 45.0,
        sog_knots: 15.0,
        ..VesselSpec::default()
    };
    let mut config = VesselActorConfig::new(spec, roc("ROC_1"));
    config
        .gates
        .push(SafetyGate::new(GateId(1), GeoPoint::new(30.001, -39.999), 100.0));
    VesselActor::new(config, Arc::new(RecordingTransport::new())).unwrap()
}

fn command(actor: &VesselActor, sender: &str, kind: CommandKind, value: f64) -> Event {
    let bytes = codec::encode(&Timestamped::now(value)).unwrap();
    Event::new(actor.keys().command(sender, kind), EventPayload::Encoded(bytes))
}

fn kind() -> impl Strategy<Value = CommandKind> {
    prop_oneof![Just(CommandKind::Cog), Just(CommandKind::Sog)]
}

fn value() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>(),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        -1.0e6f64..1.0e6,
        Just(-1.0),
        Just(1.0e300),
    ]
}

fn non_holder() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,10}".prop_filter("must not be the holder", |id| id != "ROC_1")
}

fn course_and_speed_bits(actor: &VesselActor) -> (u64, u64) {
    (
        actor.vessel().cog_deg().to_bits(),
        actor.vessel().sog_knots().to_bits(),
    )
}

proptest! {
    #[test]
    fn non_holder_commands_never_move_the_helm(
        commands in proptest::collection::vec((non_holder(), kind(), value()), 1..40),
    ) {
        let mut actor = actor();
        let before = course_and_speed_bits(&actor);
        for (sender, kind, value) in &commands {
            let event = command(&actor, sender, *kind, *value);
            actor.handle_inbound(&event);
            prop_assert_eq!(course_and_speed_bits(&actor), before);
        }
        prop_assert!(actor.controllers().is_holder(&roc("ROC_1")));
    }

    #[test]
    fn former_holder_cannot_steer_after_handover(
        commands in proptest::collection::vec((kind(), value()), 1..40),
    ) {
        let mut actor = actor();
        actor.tick(1.0);
        prop_assert!(actor.session().is_active());
        let relinquish = actor.keys().relinquish();
        let takeover = actor.keys().takeover();
        actor.handle_inbound(&Event::new(relinquish, EventPayload::Text("ROC_1".into())));
        actor.handle_inbound(&Event::new(takeover, EventPayload::Text("ROC_2".into())));
        prop_assert!(actor.controllers().is_holder(&roc("ROC_2")));

        let before = course_and_speed_bits(&actor);
        for (kind, value) in &commands {
            let event = command(&actor, "ROC_1", *kind, *value);
            actor.handle_inbound(&event);
            prop_assert_eq!(course_and_speed_bits(&actor), before);
        }
    }
}
