#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the DWP polling daemon.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The device tree (`Device` → `LineConfig` → `MachineConfig`) mirrors the
//!   plant configuration storage; lines are normalized to uppercase and must
//!   be globally unique across devices.
use serde::{Deserialize, Serialize};

/// Polling loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingCfg {
    /// Tick interval of the main loop in seconds.
    pub tick_interval_secs: u64,
    /// Per-machine register read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Field-bus unit id used for every request.
    pub unit_id: u8,
    /// Log a statistics summary every N ticks (0 disables).
    pub stats_interval_ticks: u64,
    /// Re-read the active device list every N ticks.
    pub config_refresh_ticks: u64,
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            read_timeout_secs: 2,
            unit_id: 1,
            stats_interval_ticks: 100,
            config_refresh_ticks: 10_000,
        }
    }
}

/// Cycle detection thresholds. Different machine families run different
/// profiles; nothing in here is a code constant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorCfg {
    /// A cycle starts once either channel reaches this value.
    pub start_threshold: i32,
    /// Both channels at or below this value counts as an end reading.
    pub end_threshold: i32,
    /// Consecutive end readings required before the cycle actually ends.
    pub consecutive_ends_required: u32,
    /// Cycles shorter than this are not ended by the debounce rule.
    pub min_cycle_duration_ms: u64,
    /// Below this many captured samples a finished cycle is a SHORT_CYCLE.
    pub min_samples: usize,
    /// Hard cap on buffered samples; exceeding it force-emits an OVERFLOW.
    pub max_buffer_len: usize,
    /// Failsafe: active cycles older than this are silently discarded.
    pub cycle_timeout_secs: u64,
    /// Synthetic zero samples appended for a smooth waveform tail.
    pub trailing_zeros_to_keep: usize,
    /// Output rate of the time-based waveform resampler.
    pub resample_rate_hz: u32,
    /// Centered moving-average window applied to resampled waveforms.
    /// 0 or 1 disables smoothing.
    pub smoothing_window: usize,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            start_threshold: 5,
            end_threshold: 5,
            consecutive_ends_required: 5,
            min_cycle_duration_ms: 200,
            min_samples: 3,
            max_buffer_len: 100,
            cycle_timeout_secs: 100,
            trailing_zeros_to_keep: 3,
            resample_rate_hz: 1,
            smoothing_window: 0,
        }
    }
}

/// Quality classification bands (peak pressure units).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityCfg {
    pub good_min: i32,
    pub good_max: i32,
    pub good_extended_min: i32,
    pub good_extended_max: i32,
    pub marginal_min: i32,
    pub marginal_max: i32,
    /// Both peaks strictly below this reads as a dead/detached sensor.
    pub sensor_low_below: i32,
    /// Either peak strictly above this reads as dangerous overpressure.
    pub pressure_high_above: i32,
}

impl Default for QualityCfg {
    fn default() -> Self {
        Self {
            good_min: 30,
            good_max: 45,
            good_extended_min: 25,
            good_extended_max: 55,
            marginal_min: 15,
            marginal_max: 70,
            sensor_low_below: 10,
            pressure_high_above: 80,
        }
    }
}

/// Memory janitor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceCfg {
    /// Prune detector state and counter cache every N ticks.
    pub cleanup_interval_ticks: u64,
}

impl Default for MaintenanceCfg {
    fn default() -> Self {
        Self {
            cleanup_interval_ticks: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// One press machine: four input-register addresses, two per position.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MachineConfig {
    /// Machine name, e.g. "mc1". The numeric suffix is the machine number.
    pub name: String,
    pub addr_th_l: u16,
    pub addr_th_r: u16,
    pub addr_side_l: u16,
    pub addr_side_r: u16,
}

impl MachineConfig {
    /// Numeric machine id parsed from the name ("mc3" → 3, unparsable → 0).
    pub fn machine_number(&self) -> u16 {
        self.name
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0)
    }
}

/// One production line on a device, with its ordered machines.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LineConfig {
    pub line: String,
    #[serde(default)]
    pub machines: Vec<MachineConfig>,
}

impl LineConfig {
    /// Normalized line identifier (trimmed, uppercased).
    pub fn line_id(&self) -> String {
        self.line.trim().to_uppercase()
    }
}

/// One field-bus device (PLC) and the line tree it exposes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    /// Network address, e.g. "10.0.1.20:503".
    pub address: String,
    #[serde(default)]
    pub lines: Vec<LineConfig>,
}

impl Device {
    /// Normalized line ids managed by this device.
    pub fn line_ids(&self) -> Vec<String> {
        self.lines.iter().map(LineConfig::line_id).collect()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub polling: PollingCfg,
    #[serde(default)]
    pub detector: DetectorCfg,
    #[serde(default)]
    pub quality: QualityCfg,
    #[serde(default)]
    pub maintenance: MaintenanceCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub devices: Vec<Device>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Validate detector/quality parameters and the device tree.
    /// Returns the first problem found.
    pub fn validate(&self) -> eyre::Result<()> {
        let d = &self.detector;
        if d.consecutive_ends_required == 0 {
            eyre::bail!("detector.consecutive_ends_required must be >= 1");
        }
        if d.min_samples == 0 {
            eyre::bail!("detector.min_samples must be >= 1");
        }
        if d.max_buffer_len < d.min_samples {
            eyre::bail!("detector.max_buffer_len must be >= min_samples");
        }
        if d.cycle_timeout_secs == 0 {
            eyre::bail!("detector.cycle_timeout_secs must be >= 1");
        }
        if d.resample_rate_hz == 0 {
            eyre::bail!("detector.resample_rate_hz must be >= 1");
        }
        if d.end_threshold > d.start_threshold {
            eyre::bail!("detector.end_threshold must not exceed start_threshold");
        }

        let q = &self.quality;
        for (name, lo, hi) in [
            ("good", q.good_min, q.good_max),
            ("good_extended", q.good_extended_min, q.good_extended_max),
            ("marginal", q.marginal_min, q.marginal_max),
        ] {
            if lo > hi {
                eyre::bail!("quality.{name} band is inverted ({lo} > {hi})");
            }
        }

        if self.polling.tick_interval_secs == 0 {
            eyre::bail!("polling.tick_interval_secs must be >= 1");
        }
        if self.polling.read_timeout_secs == 0 {
            eyre::bail!("polling.read_timeout_secs must be >= 1");
        }

        validate_devices(&self.devices)
    }
}

/// Device-tree validation: unique lines (globally), unique machine names and
/// numbers per line. Machine numbers index all per-position cycle state, so
/// two machines sharing a number on one line would silently merge into a
/// single capture buffer.
pub fn validate_devices(devices: &[Device]) -> eyre::Result<()> {
    let mut seen_lines: Vec<(String, &str)> = Vec::new();
    for device in devices {
        if device.name.trim().is_empty() {
            eyre::bail!("device with empty name");
        }
        if device.address.trim().is_empty() {
            eyre::bail!("device '{}' has no address", device.name);
        }
        for line in &device.lines {
            let id = line.line_id();
            if id.is_empty() {
                eyre::bail!("device '{}' has a line with an empty id", device.name);
            }
            if let Some((_, owner)) = seen_lines.iter().find(|(l, _)| *l == id) {
                eyre::bail!("line '{id}' is already used by device '{owner}'");
            }
            seen_lines.push((id.clone(), device.name.as_str()));
            let mut seen_machines: Vec<(&str, u16)> = Vec::new();
            for machine in &line.machines {
                if machine.name.trim().is_empty() {
                    eyre::bail!(
                        "line '{id}' on device '{}' has a machine with an empty name",
                        device.name
                    );
                }
                if seen_machines.iter().any(|(n, _)| *n == machine.name) {
                    eyre::bail!("line '{id}' has duplicate machine '{}'", machine.name);
                }
                let number = machine.machine_number();
                if let Some((other, _)) = seen_machines.iter().find(|(_, num)| *num == number) {
                    eyre::bail!(
                        "machines '{other}' and '{}' on line '{id}' share machine number {number}",
                        machine.name
                    );
                }
                seen_machines.push((machine.name.as_str(), number));
            }
        }
    }
    Ok(())
}
