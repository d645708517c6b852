//! `helm` – Helm operator console
//!
//! Runs one simulated vessel in-process and drops the operator into a
//! slash-command REPL.  It:
//!
//! 1. Loads `~/.helm/config.toml`, writing the defaults on first run.
//! 2. Starts the vessel actor, its ticker and inbound forwarder, and a
//!    telemetry monitor on a Tokio runtime, all joined by one [`EventBus`].
//! 3. Runs the **interactive REPL** on the main thread; operator commands
//!    reach the vessel exactly as remote operations centre messages would.
//! 4. Intercepts **Ctrl-C** to stop the ticker and leave the REPL.

mod config;
mod monitor;
mod repl;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use helm_middleware::{BusTransport, EventBus, Transport};
use helm_runtime::{VesselActor, driver};

fn main() -> ExitCode {
    let _tracing = helm_runtime::init_tracing("helm");

    print_banner();

    let cfg = load_or_create_config();
    let actor_config = match cfg.to_actor_config() {
        Ok(c) => c,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let tick_period = match cfg.tick_period() {
        Ok(p) => p,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start the Tokio runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };
    // Lets the driver helpers `tokio::spawn` from this thread.
    let _enter = runtime.enter();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if shutdown_clone.swap(true, Ordering::SeqCst) {
            // Second Ctrl-C: the REPL is stuck on a read; leave now.
            std::process::exit(130);
        }
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping the vessel (press Enter to leave) …"
                .yellow()
                .bold()
        );
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Vessel ────────────────────────────────────────────────────────────
    let keys = actor_config.keys.clone();
    let bus = EventBus::new(cfg.bus_capacity);
    let transport: Arc<dyn Transport> = Arc::new(BusTransport::new(bus.clone(), &keys));

    let monitor = monitor::Monitor::new(keys.clone());
    let monitor_task = monitor.spawn(&bus);

    let actor = match VesselActor::new(actor_config, transport.clone()) {
        Ok(actor) => actor,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let (handle, rx) = driver::channel(driver::DEFAULT_QUEUE_CAPACITY);
    let actor_task = runtime.spawn(actor.run(rx));
    let forwarder = driver::spawn_inbound_forwarder(transport, handle.clone());
    let ticker = driver::spawn_ticker(handle.clone(), tick_period, shutdown.clone());

    info!(vessel = keys.vessel(), tick_hz = cfg.tick_hz, "vessel started");
    println!(
        "  Vessel {} under command of {} ({} Hz).",
        keys.vessel().bold(),
        cfg.initial_controller.trim().bold(),
        cfg.tick_hz
    );
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(shutdown.clone(), bus, keys, monitor);
    shutdown.store(true, Ordering::SeqCst);

    // ── Teardown ──────────────────────────────────────────────────────────
    runtime.block_on(async {
        if let Err(e) = handle.shutdown().await {
            warn!(error = %e, "vessel actor already stopped");
        }
        match tokio::time::timeout(Duration::from_secs(2), actor_task).await {
            Ok(Ok(actor)) => info!(
                holder = %actor.controllers().holder(),
                "vessel actor stopped"
            ),
            Ok(Err(e)) => warn!(error = %e, "vessel actor task failed"),
            Err(_) => warn!("vessel actor did not stop in time"),
        }
    });
    ticker.abort();
    forwarder.abort();
    monitor_task.abort();
    println!("{}", "  ✓ Exiting Helm.".green());
    ExitCode::SUCCESS
}

fn load_or_create_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __ __    __   "#.bold().cyan());
    println!("{}", r#"  / // /__ / /_ _ "#.bold().cyan());
    println!("{}", r#" / _  / -_) /  ' \"#.bold().cyan());
    println!("{}", r#"/_//_/\__/_/_/_/_/"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Helm".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Remote vessel authority console");
    println!();
}
