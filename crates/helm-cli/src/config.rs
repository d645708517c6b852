//! Configuration Vault – reads/writes `~/.helm/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use helm_kernel::HandoverConfig;
use helm_middleware::KeySpace;
use helm_nav::{NoiseModel, SafetyGate, VesselSpec};
use helm_runtime::VesselActorConfig;
use helm_types::{ControllerId, GateDefinition, GeoPoint};

/// Persisted operator configuration stored in `~/.helm/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Vessel name; also the vessel segment of every key expression.
    #[serde(default = "default_vessel_name")]
    pub vessel_name: String,

    #[serde(default = "default_mmsi")]
    pub mmsi: u32,

    #[serde(default = "default_imo")]
    pub imo: u32,

    /// Start position, decimal degrees.
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    #[serde(default)]
    pub cog_deg: f64,

    #[serde(default = "default_sog_knots")]
    pub sog_knots: f64,

    /// Gross tonnage; sets the deceleration rate while holding.
    #[serde(default = "default_tonnage")]
    pub tonnage: f64,

    #[serde(default = "default_length_m")]
    pub length_m: f64,

    /// Remote operations centre holding authority at start-up.
    #[serde(default = "default_controller")]
    pub initial_controller: String,

    /// Simulation ticks per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,

    #[serde(default = "default_key_base")]
    pub key_base: String,

    #[serde(default = "default_eta_threshold_secs")]
    pub eta_threshold_secs: f64,

    /// Unset means an open handover waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover_timeout_secs: Option<f64>,

    #[serde(default = "default_max_sog_knots")]
    pub max_sog_knots: f64,

    /// Gaussian course/speed noise on the kinematics.
    #[serde(default = "default_noise")]
    pub noise: bool,

    /// Per-lane capacity of the in-process event bus.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Safety gates registered before the first tick.
    #[serde(default)]
    pub gates: Vec<GateDefinition>,
}

fn default_vessel_name() -> String {
    helm_middleware::keys::DEFAULT_VESSEL.to_string()
}
fn default_mmsi() -> u32 {
    VesselSpec::default().mmsi
}
fn default_imo() -> u32 {
    VesselSpec::default().imo
}
fn default_latitude() -> f64 {
    VesselSpec::default().position.latitude
}
fn default_longitude() -> f64 {
    VesselSpec::default().position.longitude
}
fn default_sog_knots() -> f64 {
    VesselSpec::default().sog_knots
}
fn default_tonnage() -> f64 {
    VesselSpec::default().tonnage
}
fn default_length_m() -> f64 {
    VesselSpec::default().length_m
}
fn default_controller() -> String {
    "ROC_1".to_string()
}
fn default_tick_hz() -> f64 {
    1.0
}
fn default_key_base() -> String {
    helm_middleware::keys::DEFAULT_KEY_BASE.to_string()
}
fn default_eta_threshold_secs() -> f64 {
    helm_kernel::handover::DEFAULT_ETA_THRESHOLD_SECS
}
fn default_max_sog_knots() -> f64 {
    helm_kernel::authority_guard::DEFAULT_MAX_SOG_KNOTS
}
fn default_noise() -> bool {
    true
}
fn default_bus_capacity() -> usize {
    helm_middleware::bus::DEFAULT_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vessel_name: default_vessel_name(),
            mmsi: default_mmsi(),
            imo: default_imo(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            cog_deg: 0.0,
            sog_knots: default_sog_knots(),
            tonnage: default_tonnage(),
            length_m: default_length_m(),
            initial_controller: default_controller(),
            tick_hz: default_tick_hz(),
            key_base: default_key_base(),
            eta_threshold_secs: default_eta_threshold_secs(),
            handover_timeout_secs: None,
            max_sog_knots: default_max_sog_knots(),
            noise: default_noise(),
            bus_capacity: default_bus_capacity(),
            gates: Vec::new(),
        }
    }
}

impl Config {
    pub fn keys(&self) -> KeySpace {
        KeySpace::new(self.key_base.clone(), self.vessel_name.clone())
    }

    /// Wall-clock period between ticks.
    pub fn tick_period(&self) -> Result<Duration, String> {
        if !self.tick_hz.is_finite() || self.tick_hz <= 0.0 {
            return Err(format!("tick_hz must be positive, got {}", self.tick_hz));
        }
        Duration::try_from_secs_f64(1.0 / self.tick_hz)
            .map_err(|e| format!("Invalid tick_hz {}: {}", self.tick_hz, e))
    }

    /// Build the vessel actor configuration, validating the controller id,
    /// every configured gate and the handover and speed limits.
    pub fn to_actor_config(&self) -> Result<VesselActorConfig, String> {
        let controller = ControllerId::parse(&self.initial_controller)
            .map_err(|e| format!("Invalid initial_controller: {}", e))?;
        let spec = VesselSpec {
            name: self.vessel_name.clone(),
            mmsi: self.mmsi,
            imo: self.imo,
            position: GeoPoint::new(self.latitude, self.longitude),
            cog_deg: self.cog_deg,
            sog_knots: self.sog_knots,
            tonnage: self.tonnage,
            length_m: self.length_m,
        };
        let gates = self
            .gates
            .iter()
            .map(SafetyGate::from_definition)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Invalid gate in config: {}", e))?;

        let mut actor = VesselActorConfig::new(spec, controller);
        actor.keys = self.keys();
        actor.handover = HandoverConfig {
            eta_threshold_secs: self.eta_threshold_secs,
            timeout_secs: self.handover_timeout_secs,
        };
        actor.max_sog_knots = self.max_sog_knots;
        actor.noise = self.noise.then(NoiseModel::default);
        actor.gates = gates;
        actor
            .validate()
            .map_err(|e| format!("Invalid vessel settings: {}", e))?;
        Ok(actor)
    }
}

/// Return the path to `~/.helm/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".helm").join("config.toml")
}

/// Load the config from disk and apply `HELM_*` overrides.  Returns `None`
/// if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| format!("Failed to parse config: {}", e))
}

/// Apply `HELM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HELM_VESSEL` | `vessel_name` |
/// | `HELM_CONTROLLER` | `initial_controller` |
/// | `HELM_TICK_HZ` | `tick_hz` |
/// | `HELM_HANDOVER_TIMEOUT_SECS` | `handover_timeout_secs` (`off` clears it) |
/// | `HELM_NOISE` | `noise` (`true`/`false`/`1`/`0`) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("HELM_VESSEL")
        && !v.trim().is_empty()
    {
        cfg.vessel_name = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("HELM_CONTROLLER") {
        cfg.initial_controller = v;
    }
    if let Ok(v) = std::env::var("HELM_TICK_HZ")
        && let Ok(hz) = v.parse::<f64>()
        && hz.is_finite()
        && hz > 0.0
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("HELM_HANDOVER_TIMEOUT_SECS") {
        if v.trim().eq_ignore_ascii_case("off") {
            cfg.handover_timeout_secs = None;
        } else if let Ok(secs) = v.trim().parse::<f64>()
            && secs.is_finite()
            && secs > 0.0
        {
            cfg.handover_timeout_secs = Some(secs);
        }
    }
    if let Ok(v) = std::env::var("HELM_NOISE") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" => cfg.noise = true,
            "0" | "false" | "off" => cfg.noise = false,
            _ => {}
        }
    }
}

/// Save the config to disk, creating `~/.helm/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
