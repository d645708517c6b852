//! [`VesselActor`] – the single writer of all vessel state.
//!
//! Everything that can change the vessel arrives as an [`ActorEvent`] on one
//! ordered queue and is processed to completion before the next one.  Each
//! tick:
//!
//! 1. **Integrate** – [`KinematicsEngine::step`] advances position and speed.
//! 2. **Contain** – if the vessel is inside an active gate it is put on hold.
//! 3. **Expire** – the open handover session's clock advances; an optional
//!    timeout closes it.
//! 4. **Predict** – [`GateRegistry::nearest_approach`] finds the earliest gate.
//! 5. **Coordinate** – [`HandoverCoordinator::on_approach`] may open a session
//!    and broadcast the one-shot request.
//! 6. **Publish** – telemetry and the operator advisory text.
//!
//! Inbound messages go through [`codec::decode_inbound`]; course and speed
//! commands then pass [`AuthorityGuard::authorize_and_verify`], and handover
//! acknowledgements go straight to the coordinator.  Rejections are logged and
//! dropped; nothing here is fatal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use helm_middleware::RecordingTransport;
//! use helm_nav::{SafetyGate, VesselSpec};
//! use helm_runtime::{VesselActor, VesselActorConfig};
//! use helm_types::{ControllerId, GateId, GeoPoint};
//!
//! let transport = Arc::new(RecordingTransport::new());
//! let config = VesselActorConfig::new(VesselSpec::default(), "ROC_1".parse::<ControllerId>().unwrap());
//! let mut actor = VesselActor::new(config, transport.clone()).unwrap();
//! actor.add_gate(SafetyGate::new(GateId(1), GeoPoint::new(30.01, -40.0), 100.0));
//! actor.tick(1.0);
//! assert!(actor.session().is_active());
//! ```

use std::sync::Arc;

use helm_kernel::authority_guard::DEFAULT_MAX_SOG_KNOTS;
use helm_kernel::{
    AuthorityGuard, AuthoritySession, ControllerRegistry, HandoverConfig, HandoverCoordinator,
    HandoverEvent, VerifiedCommand,
};
use helm_middleware::codec::{self, InboundMessage};
use helm_middleware::{KeySpace, Transport};
use helm_nav::{GateRegistry, KinematicsEngine, NoiseModel, SafetyGate, VesselSpec, VesselState};
use helm_types::{
    CommandKind, ControllerId, Event, EventPayload, GateId, HelmError, NavCommand, NavStatus,
    TelemetryValue, Timestamped,
};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`VesselActor`].
#[derive(Debug, Clone)]
pub struct VesselActorConfig {
    pub vessel: VesselSpec,
    /// Controller holding authority at start-up.
    pub initial_controller: ControllerId,
    pub keys: KeySpace,
    pub handover: HandoverConfig,
    pub max_sog_knots: f64,
    /// `None` runs the kinematics deterministically.
    pub noise: Option<NoiseModel>,
    /// RNG seed for the noise model; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Gates registered before the first tick.
    pub gates: Vec<SafetyGate>,
}

impl VesselActorConfig {
    pub fn new(vessel: VesselSpec, initial_controller: ControllerId) -> Self {
        Self {
            keys: KeySpace::new(helm_middleware::keys::DEFAULT_KEY_BASE, vessel.name.clone()),
            vessel,
            initial_controller,
            handover: HandoverConfig::default(),
            max_sog_knots: DEFAULT_MAX_SOG_KNOTS,
            noise: None,
            seed: None,
            gates: Vec::new(),
        }
    }

    /// Check the tunables the actor cannot run sensibly without: a finite,
    /// positive ETA threshold, handover timeout and speed limit.
    pub fn validate(&self) -> Result<(), HelmError> {
        positive("eta_threshold_secs", self.handover.eta_threshold_secs)?;
        if let Some(timeout) = self.handover.timeout_secs {
            positive("handover_timeout_secs", timeout)?;
        }
        positive("max_sog_knots", self.max_sog_knots)
    }
}

fn positive(name: &str, value: f64) -> Result<(), HelmError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(HelmError::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Work items for the actor's queue.
#[derive(Debug, Clone)]
pub enum ActorEvent {
    /// Advance simulated time by `dt` seconds.
    Tick { dt: f64 },
    /// A message received from the transport.
    Inbound(Event),
    /// Drain stops after this event.
    Shutdown,
}

// ─────────────────────────────────────────────────────────────────────────────
// VesselActor
// ─────────────────────────────────────────────────────────────────────────────

pub struct VesselActor {
    keys: KeySpace,
    vessel: VesselState,
    engine: KinematicsEngine,
    gates: GateRegistry,
    controllers: ControllerRegistry,
    guard: AuthorityGuard,
    handover: HandoverCoordinator,
    transport: Arc<dyn Transport>,
    last_approach: Option<(GateId, f64)>,
}

impl VesselActor {
    /// Build the actor.  Fails with [`HelmError::InvalidConfig`] when
    /// [`VesselActorConfig::validate`] or the noise model rejects `config`.
    pub fn new(config: VesselActorConfig, transport: Arc<dyn Transport>) -> Result<Self, HelmError> {
        config.validate()?;
        let engine = match config.noise {
            Some(noise) => KinematicsEngine::with_noise(noise, config.seed)?,
            None => KinematicsEngine::new(),
        };
        let mut actor = Self {
            keys: config.keys,
            vessel: VesselState::new(config.vessel),
            engine,
            gates: GateRegistry::new(),
            controllers: ControllerRegistry::new(config.initial_controller),
            guard: AuthorityGuard::new(config.max_sog_knots),
            handover: HandoverCoordinator::new(config.handover),
            transport,
            last_approach: None,
        };
        for gate in config.gates {
            actor.add_gate(gate);
        }
        Ok(actor)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn vessel(&self) -> &VesselState {
        &self.vessel
    }

    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    pub fn session(&self) -> &AuthoritySession {
        self.handover.session()
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Nearest approach computed on the most recent tick.
    pub fn last_approach(&self) -> Option<(GateId, f64)> {
        self.last_approach
    }

    pub fn add_gate(&mut self, gate: SafetyGate) -> GateId {
        self.gates.add(gate)
    }

    // -------------------------------------------------------------------------
    // Event loop
    // -------------------------------------------------------------------------

    /// Drain `rx` until it closes or a [`ActorEvent::Shutdown`] arrives, then
    /// hand the actor back for inspection.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ActorEvent>) -> Self {
        info!(vessel = %self.keys.vessel(), holder = %self.controllers.holder(), "vessel actor started");
        while let Some(event) = rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        info!(vessel = %self.keys.vessel(), "vessel actor stopped");
        self
    }

    /// Process one event.  Returns `false` on shutdown.
    pub fn handle(&mut self, event: ActorEvent) -> bool {
        match event {
            ActorEvent::Tick { dt } => self.tick(dt),
            ActorEvent::Inbound(event) => self.handle_inbound(&event),
            ActorEvent::Shutdown => return false,
        }
        true
    }

    pub fn tick(&mut self, dt: f64) {
        self.engine.step(&mut self.vessel, dt);

        let position = self.vessel.position();
        if self.gates.is_inside_any(position) && self.vessel.nav_status() != NavStatus::Holding {
            info!(lat = position.latitude, lon = position.longitude, "inside safety gate; holding");
            self.vessel.set_nav_status(NavStatus::Holding);
        }

        let expired = self.handover.advance(dt);
        if let Some(event) = &expired {
            self.publish_handover(event);
        }

        let approach = self.gates.nearest_approach(position, self.vessel.velocity());
        self.last_approach = approach;
        if expired.is_none()
            && let Some(event) = self.handover.on_approach(approach, self.controllers.holder())
        {
            self.publish_handover(&event);
        }

        self.publish_telemetry();
    }

    #[instrument(skip(self, event), fields(key = %event.source))]
    pub fn handle_inbound(&mut self, event: &Event) {
        let message = match codec::decode_inbound(&self.keys, event) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("not addressed to this vessel; ignored");
                return;
            }
            Err(e) => {
                warn!(error = %e, "inbound message dropped");
                return;
            }
        };

        match message {
            InboundMessage::Command(command) => {
                if let Err(e) = self.apply_command(&command) {
                    warn!(error = %e, controller = %command.controller_id, kind = %command.kind, "command rejected");
                }
            }
            InboundMessage::Relinquish(id) => {
                let result = self
                    .handover
                    .relinquish(&id, &mut self.controllers, &mut self.gates);
                self.finish_ack("relinquish", &id, result);
            }
            InboundMessage::Takeover(id) => {
                let result = self
                    .handover
                    .takeover(&id, &mut self.controllers, &mut self.gates);
                self.finish_ack("takeover", &id, result);
            }
            InboundMessage::Hold(request) => {
                let status = request.nav_status();
                if self.vessel.nav_status() != status {
                    info!(state = request.as_str(), %status, "hold state changed");
                }
                self.vessel.set_nav_status(status);
            }
            InboundMessage::DefineGate(def) => match SafetyGate::from_definition(&def) {
                Ok(gate) => {
                    self.add_gate(gate);
                }
                Err(e) => warn!(error = %e, "gate definition rejected"),
            },
            InboundMessage::ClearGate(id) => {
                self.gates.deactivate(id);
            }
        }
    }

    fn apply_command(&mut self, command: &NavCommand) -> Result<(), HelmError> {
        let verified = self
            .guard
            .authorize_and_verify(command, &self.controllers)?;
        match verified {
            VerifiedCommand::Course(cog) => {
                debug!(cog, "course set");
                self.vessel.set_cog(cog);
            }
            VerifiedCommand::Speed(_) if self.vessel.nav_status() == NavStatus::Holding => {
                debug!(kind = %CommandKind::Sog, "speed command ignored while holding");
            }
            VerifiedCommand::Speed(sog) => {
                debug!(sog, "speed set");
                self.vessel.set_sog(sog);
            }
        }
        Ok(())
    }

    fn finish_ack(
        &self,
        ack: &str,
        id: &ControllerId,
        result: Result<Option<HandoverEvent>, HelmError>,
    ) {
        match result {
            Ok(Some(event)) => self.publish_handover(&event),
            Ok(None) => info!(ack, controller = %id, "handover acknowledgement recorded"),
            Err(e) => warn!(ack, controller = %id, error = %e, "handover acknowledgement rejected"),
        }
    }

    // -------------------------------------------------------------------------
    // Publication
    // -------------------------------------------------------------------------

    fn publish(&self, key: &str, payload: EventPayload) {
        if let Err(e) = self.transport.publish(key, payload) {
            warn!(key, error = %e, "publish failed");
        }
    }

    fn publish_handover(&self, event: &HandoverEvent) {
        let key = match event {
            HandoverEvent::Requested { .. } => self.keys.handover_request(),
            HandoverEvent::Completed { .. } | HandoverEvent::Expired { .. } => {
                self.keys.handover_state()
            }
        };
        self.publish(&key, EventPayload::Text(event.to_string()));
    }

    /// Current telemetry fields, in publication order.
    pub fn telemetry(&self) -> Vec<TelemetryValue> {
        let identity = self.vessel.identity();
        vec![
            TelemetryValue::LocationFix(self.vessel.position()),
            TelemetryValue::CourseOverGround(self.vessel.cog_deg()),
            TelemetryValue::SpeedOverGround(self.vessel.sog_knots()),
            TelemetryValue::Name(identity.name().to_string()),
            TelemetryValue::Mmsi(identity.mmsi()),
            TelemetryValue::Imo(identity.imo()),
            TelemetryValue::NavStatus(self.vessel.nav_status()),
            TelemetryValue::RocStatus(self.controllers.statuses()),
        ]
    }

    /// Operator advisory text and, when a gate lies ahead, its ETA.
    pub fn remote_status(&self) -> (String, Option<String>) {
        match self.last_approach {
            None => ("Normal. No gates on path".to_string(), None),
            Some((gate, eta)) if eta <= 0.0 => (format!("Inside safety gate {gate}"), None),
            Some((gate, eta)) => (
                format!("Time to gate {gate}: {eta:.1}s"),
                Some(format!("{eta:.1}")),
            ),
        }
    }

    fn publish_telemetry(&self) {
        for value in self.telemetry() {
            let key = self.keys.telemetry(&value);
            match codec::encode_telemetry(&Timestamped::now(value)) {
                Ok(bytes) => self.publish(&key, EventPayload::Encoded(bytes)),
                Err(e) => warn!(key, error = %e, "telemetry encode failed"),
            }
        }

        let (status, time) = self.remote_status();
        self.publish(&self.keys.remote_status(), EventPayload::Text(status));
        if let Some(time) = time {
            self.publish(&self.keys.remote_time(), EventPayload::Text(time));
        }
    }
}
