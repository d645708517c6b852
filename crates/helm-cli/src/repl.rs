//! REPL – Read-Eval-Print Loop for the Helm operator console.
//!
//! Every slash-command that talks to the vessel is turned into the same
//! inbound message a remote operations centre would send, and published on
//! the bus's inbound lane:
//!
//!   /cog <roc> <deg>                  – course command from `<roc>`
//!   /sog <roc> <knots>                – speed command from `<roc>`
//!   /relinquish <roc>                 – handover acknowledgement (outgoing)
//!   /takeover <roc>                   – handover acknowledgement (incoming)
//!   /go | /no-go                      – release / hold the vessel
//!   /gate <id> <lat> <lon> <radius_m> – define a safety gate
//!   /clear <id>                       – deactivate a safety gate
//!   /status                           – latest telemetry from the monitor
//!   /help                             – show this list
//!   /quit | /exit                     – gracefully exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use helm_middleware::codec;
use helm_middleware::keys::subject;
use helm_middleware::{EventBus, KeySpace, Topic};
use helm_types::{
    CommandKind, ControllerId, Event, EventPayload, GateDefinition, GateId, HoldRequest,
    TelemetryValue, Timestamped,
};

use crate::monitor::Monitor;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Course { roc: ControllerId, deg: f64 },
    Speed { roc: ControllerId, knots: f64 },
    Relinquish(ControllerId),
    Takeover(ControllerId),
    Hold(HoldRequest),
    DefineGate(GateDefinition),
    ClearGate(GateId),
    Status,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one input line.  The error is a user-facing message.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        let parsed = match (cmd, args.as_slice()) {
            ("/cog", [roc, deg]) => ReplCommand::Course {
                roc: parse_roc(roc)?,
                deg: parse_number(deg, "course")?,
            },
            ("/sog", [roc, knots]) => ReplCommand::Speed {
                roc: parse_roc(roc)?,
                knots: parse_number(knots, "speed")?,
            },
            ("/relinquish", [roc]) => ReplCommand::Relinquish(parse_roc(roc)?),
            ("/takeover", [roc]) => ReplCommand::Takeover(parse_roc(roc)?),
            ("/go", []) => ReplCommand::Hold(HoldRequest::Go),
            ("/no-go", []) => ReplCommand::Hold(HoldRequest::NoGo),
            ("/gate", [id, lat, lon, radius]) => ReplCommand::DefineGate(GateDefinition {
                id: parse_gate_id(id)?,
                latitude: parse_number(lat, "latitude")?,
                longitude: parse_number(lon, "longitude")?,
                radius_m: parse_number(radius, "radius")?,
            }),
            ("/clear", [id]) => ReplCommand::ClearGate(parse_gate_id(id)?),
            ("/status", []) => ReplCommand::Status,
            ("/help", []) => ReplCommand::Help,
            ("/quit" | "/exit", []) => ReplCommand::Quit,
            (
                "/cog" | "/sog" | "/relinquish" | "/takeover" | "/go" | "/no-go" | "/gate"
                | "/clear" | "/status" | "/help" | "/quit" | "/exit",
                _,
            ) => return Err(format!("wrong arguments for {cmd}; see /help")),
            (other, _) => return Err(format!("unknown command '{other}'")),
        };
        Ok(parsed)
    }

    /// The inbound event this command sends to the vessel, or `None` for
    /// purely local commands.
    pub fn to_event(&self, keys: &KeySpace) -> Result<Option<Event>, String> {
        let event = match self {
            ReplCommand::Course { roc, deg } => command_event(keys, roc, CommandKind::Cog, *deg)?,
            ReplCommand::Speed { roc, knots } => {
                command_event(keys, roc, CommandKind::Sog, *knots)?
            }
            ReplCommand::Relinquish(roc) => Event::new(
                keys.relinquish(),
                EventPayload::Text(roc.as_str().to_string()),
            ),
            ReplCommand::Takeover(roc) => {
                Event::new(keys.takeover(), EventPayload::Text(roc.as_str().to_string()))
            }
            ReplCommand::Hold(req) => Event::new(
                keys.hold_state(),
                EventPayload::Text(req.as_str().to_string()),
            ),
            ReplCommand::DefineGate(def) => {
                let bytes = codec::encode(&Timestamped::now(def.clone())).map_err(|e| e.to_string())?;
                Event::new(keys.define_gate(), EventPayload::Encoded(bytes))
            }
            ReplCommand::ClearGate(id) => {
                Event::new(keys.clear_gate(), EventPayload::Text(id.to_string()))
            }
            ReplCommand::Status | ReplCommand::Help | ReplCommand::Quit => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn command_event(
    keys: &KeySpace,
    roc: &ControllerId,
    kind: CommandKind,
    value: f64,
) -> Result<Event, String> {
    let bytes = codec::encode(&Timestamped::now(value)).map_err(|e| e.to_string())?;
    Ok(Event::new(
        keys.command(roc.as_str(), kind),
        EventPayload::Encoded(bytes),
    ))
}

fn parse_roc(s: &str) -> Result<ControllerId, String> {
    ControllerId::parse(s).map_err(|e| e.to_string())
}

fn parse_number(s: &str, what: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{what} must be a number, got '{s}'"))
}

fn parse_gate_id(s: &str) -> Result<GateId, String> {
    s.parse::<GateId>().map_err(|e| e.to_string())
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, bus: EventBus, keys: KeySpace, monitor: Monitor) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", format!("helm:{}>", keys.vessel()).bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let cmd = match ReplCommand::parse(input) {
            Ok(cmd) => cmd,
            Err(e) => {
                println!(
                    "{} {}. Type {} for available commands.",
                    "Error:".red(),
                    e.yellow(),
                    "/help".bold()
                );
                continue;
            }
        };

        match cmd {
            ReplCommand::Help => cmd_help(),
            ReplCommand::Status => cmd_status(&monitor),
            ReplCommand::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            other => send(&bus, &keys, &other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn send(bus: &EventBus, keys: &KeySpace, cmd: &ReplCommand) {
    let event = match cmd.to_event(keys) {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(e) => {
            println!("{}: {}", "Encode error".red(), e);
            return;
        }
    };
    let key = event.source.clone();
    match bus.publish_to(Topic::Inbound, event) {
        Ok(_) => println!("  {} {}", "→".green(), key.dimmed()),
        Err(e) => println!("{}: {}", "Not delivered".red(), e),
    }
}

fn cmd_help() {
    println!();
    println!("{}", "Helm Commands".bold().underline());
    println!("  {}  – course command", "/cog <roc> <deg>".bold().cyan());
    println!("  {}  – speed command", "/sog <roc> <knots>".bold().cyan());
    println!("  {}  – give up authority at a gate", "/relinquish <roc>".bold().cyan());
    println!("  {}  – accept authority at a gate", "/takeover <roc>".bold().cyan());
    println!("  {}  – release / hold the vessel", "/go  /no-go".bold().cyan());
    println!("  {}  – define a safety gate", "/gate <id> <lat> <lon> <radius_m>".bold().cyan());
    println!("  {}  – deactivate a safety gate", "/clear <id>".bold().cyan());
    println!("  {}  – latest vessel telemetry", "/status".bold().cyan());
    println!("  {}  – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_status(monitor: &Monitor) {
    let snap = monitor.snapshot();
    println!("{}", "Vessel Status".bold().underline());
    if snap.telemetry.is_empty() {
        println!("  {}", "no telemetry received yet".dimmed());
    }

    if let Some(TelemetryValue::Name(name)) = snap.get(subject::NAME) {
        println!("  Name        : {}", name.bold());
    }
    if let Some(TelemetryValue::LocationFix(p)) = snap.get(subject::LOCATION_FIX) {
        println!("  Position    : {:.6}, {:.6}", p.latitude, p.longitude);
    }
    if let Some(TelemetryValue::CourseOverGround(cog)) = snap.get(subject::COURSE_OVER_GROUND) {
        println!("  COG         : {cog:.1}°");
    }
    if let Some(TelemetryValue::SpeedOverGround(sog)) = snap.get(subject::SPEED_OVER_GROUND) {
        println!("  SOG         : {sog:.2} kn");
    }
    if let Some(TelemetryValue::NavStatus(status)) = snap.get(subject::NAV_STATUS) {
        println!("  Nav status  : {}", status.to_string().yellow());
    }
    if let Some(TelemetryValue::RocStatus(rocs)) = snap.get(subject::ROC_STATUS) {
        for roc in rocs {
            let marker = if roc.is_authorized { "▶".green() } else { " ".normal() };
            println!("  ROC         : {} {}", marker, roc.id.as_str().bold());
        }
    }
    if let Some(status) = &snap.remote_status {
        match &snap.remote_time {
            Some(t) => println!("  Advisory    : {} ({} s)", status, t),
            None => println!("  Advisory    : {}", status),
        }
    }
    if let Some(last) = &snap.last_handover {
        println!("  Handover    : {}", last.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_middleware::InboundMessage;
    use helm_middleware::decode_inbound;

    fn roc(s: &str) -> ControllerId {
        ControllerId::parse(s).unwrap()
    }

    #[test]
    fn parses_vessel_commands() {
        assert_eq!(
            ReplCommand::parse("/cog ROC_1 90").unwrap(),
            ReplCommand::Course { roc: roc("ROC_1"), deg: 90.0 }
        );
        assert_eq!(
            ReplCommand::parse("  /sog ROC_2   12.5 ").unwrap(),
            ReplCommand::Speed { roc: roc("ROC_2"), knots: 12.5 }
        );
        assert_eq!(
            ReplCommand::parse("/takeover ROC_2").unwrap(),
            ReplCommand::Takeover(roc("ROC_2"))
        );
        assert_eq!(ReplCommand::parse("/no-go").unwrap(), ReplCommand::Hold(HoldRequest::NoGo));
        assert_eq!(ReplCommand::parse("/exit").unwrap(), ReplCommand::Quit);
        assert_eq!(
            ReplCommand::parse("/gate 4 30.01 -40 150").unwrap(),
            ReplCommand::DefineGate(GateDefinition {
                id: GateId(4),
                latitude: 30.01,
                longitude: -40.0,
                radius_m: 150.0,
            })
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(ReplCommand::parse("/cog ROC_1").unwrap_err().contains("wrong arguments"));
        assert!(ReplCommand::parse("/sog ROC_1 fast").unwrap_err().contains("speed"));
        assert!(ReplCommand::parse("/cog ROC_1 NaN").is_err());
        assert!(ReplCommand::parse("/clear seven").is_err());
        assert!(ReplCommand::parse("/start").unwrap_err().contains("unknown command"));
        assert!(ReplCommand::parse("").is_err());
    }

    #[test]
    fn local_commands_send_nothing() {
        let keys = KeySpace::default();
        for cmd in [ReplCommand::Status, ReplCommand::Help, ReplCommand::Quit] {
            assert!(cmd.to_event(&keys).unwrap().is_none());
        }
    }

    // Whatever the console sends must decode exactly as the vessel reads it.
    #[test]
    fn events_decode_as_inbound_messages() {
        let keys = KeySpace::default();
        let decode = |line: &str| {
            let event = ReplCommand::parse(line).unwrap().to_event(&keys).unwrap().unwrap();
            decode_inbound(&keys, &event).unwrap().unwrap()
        };

        match decode("/cog ROC_1 270") {
            InboundMessage::Command(cmd) => {
                assert_eq!(cmd.controller_id, roc("ROC_1"));
                assert_eq!(cmd.kind, CommandKind::Cog);
                assert_eq!(cmd.value, 270.0);
            }
            other => panic!("expected a command, got {other:?}"),
        }
        assert_eq!(decode("/relinquish ROC_1"), InboundMessage::Relinquish(roc("ROC_1")));
        assert_eq!(decode("/go"), InboundMessage::Hold(HoldRequest::Go));
        assert_eq!(decode("/clear 2"), InboundMessage::ClearGate(GateId(2)));
        assert!(matches!(
            decode("/gate 2 30 -40 50"),
            InboundMessage::DefineGate(GateDefinition { id: GateId(2), .. })
        ));
    }

    #[tokio::test]
    async fn send_publishes_on_inbound_lane() {
        let bus = EventBus::default();
        let keys = KeySpace::default();
        let mut rx = bus.subscribe_to(Topic::Inbound);
        send(&bus, &keys, &ReplCommand::Takeover(roc("ROC_2")));
        let event = rx.recv().await.expect("published");
        assert_eq!(event.source, keys.takeover());
    }
}
