//! Host identity, uptime and load average for the header lines.

use super::read_file;
use crate::error::{MonitorError, Result};
use std::path::Path;

/// Where Linux exposes batteries and AC adapters.
pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Snapshot of the platform header data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformInfo {
    /// Host name.
    pub hostname: String,
    /// Kernel name (e.g. `Linux`).
    pub sysname: String,
    /// Kernel release.
    pub release: String,
    /// Seconds since boot.
    pub uptime_secs: u64,
    /// 1, 5 and 15 minute load averages.
    pub load: [f64; 3],
    /// Battery state, `None` on machines without one.
    pub power_supply: Option<PowerSupply>,
}

impl PlatformInfo {
    /// Uptime split into (days, hours, minutes).
    #[must_use]
    pub fn uptime_parts(&self) -> (u64, u64, u64) {
        let days = self.uptime_secs / 86_400;
        let rest = self.uptime_secs % 86_400;
        (days, rest / 3600, (rest % 3600) / 60)
    }
}

/// Battery charging state as reported by sysfs `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryState {
    /// Charging.
    Charging,
    /// Running on battery.
    Discharging,
    /// Fully charged.
    Full,
    /// Plugged in, not charging.
    NotCharging,
    /// Anything else.
    #[default]
    Unknown,
}

impl BatteryState {
    fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "charging" => Self::Charging,
            "discharging" => Self::Discharging,
            "full" => Self::Full,
            "not charging" => Self::NotCharging,
            _ => Self::Unknown,
        }
    }
}

/// Power source and primary battery charge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSupply {
    /// Whether an AC adapter is online.
    pub on_ac: bool,
    /// Charge of the first battery, in percent.
    pub charge_pct: f64,
    /// Charging state of the first battery.
    pub state: BatteryState,
    /// Estimated seconds until empty while discharging, when the kernel
    /// reports enough to compute it.
    pub seconds_remaining: Option<u64>,
}

impl PowerSupply {
    /// Name of the providing power source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        if self.on_ac {
            "AC Power"
        } else {
            "Battery Power"
        }
    }

    /// Hours left on battery, when known.
    #[must_use]
    pub fn hours_remaining(&self) -> Option<f64> {
        self.seconds_remaining.map(|secs| secs as f64 / 3600.0)
    }
}

/// Reads batteries and adapters under `root` (normally
/// [`POWER_SUPPLY_ROOT`]). Returns `None` when no battery is present.
#[must_use]
pub fn read_power_supply(root: &Path) -> Option<PowerSupply> {
    let read = |dir: &Path, name: &str| {
        std::fs::read_to_string(dir.join(name)).ok().map(|s| s.trim().to_string())
    };
    let number = |dir: &Path, name: &str| read(dir, name).and_then(|s| s.parse::<u64>().ok());

    let mut entries: Vec<_> =
        std::fs::read_dir(root).ok()?.filter_map(|e| e.ok().map(|e| e.path())).collect();
    entries.sort();

    let mut on_ac = false;
    let mut battery = None;
    for dir in &entries {
        match read(dir, "type").as_deref() {
            Some("Mains" | "USB") => on_ac |= number(dir, "online") == Some(1),
            Some("Battery") if battery.is_none() => battery = Some(dir),
            _ => {}
        }
    }
    let dir = battery?;

    let state = read(dir, "status").map_or(BatteryState::Unknown, |s| BatteryState::parse(&s));
    let charge_pct = number(dir, "capacity").unwrap_or(0).min(100) as f64;
    // energy in µWh over power in µW, or charge in µAh over current in µA
    let left = number(dir, "energy_now").zip(number(dir, "power_now"));
    let left = left.or_else(|| number(dir, "charge_now").zip(number(dir, "current_now")));
    let seconds_remaining = match (state, left) {
        (BatteryState::Discharging, Some((stored, rate))) if rate > 0 => {
            Some(stored.saturating_mul(3600) / rate)
        }
        _ => None,
    };

    Some(PowerSupply {
        on_ac: on_ac || state != BatteryState::Discharging,
        charge_pct,
        state,
        seconds_remaining,
    })
}

/// Backend producing one [`PlatformInfo`] per call.
pub trait PlatformSource {
    /// Reads the current platform data.
    fn read(&mut self) -> Result<PlatformInfo>;
}

/// Parses `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Result<[f64; 3]> {
    let mut values = content.split_whitespace().map(str::parse::<f64>);
    let mut load = [0.0; 3];
    for slot in &mut load {
        *slot = values
            .next()
            .and_then(std::result::Result::ok)
            .ok_or_else(|| MonitorError::collection("platform", "malformed /proc/loadavg"))?;
    }
    Ok(load)
}

/// Parses `/proc/uptime` into whole seconds.
pub fn parse_uptime(content: &str) -> Result<u64> {
    content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .ok_or_else(|| MonitorError::collection("platform", "malformed /proc/uptime"))
}

/// Linux backend reading `/proc/sys/kernel`, `/proc/uptime`, `/proc/loadavg`.
#[derive(Debug, Default)]
pub struct ProcPlatformSource;

impl PlatformSource for ProcPlatformSource {
    fn read(&mut self) -> Result<PlatformInfo> {
        let kernel = |name: &str| {
            read_file("platform", format!("/proc/sys/kernel/{name}")).map(|s| s.trim().to_string())
        };
        Ok(PlatformInfo {
            hostname: kernel("hostname")?,
            sysname: kernel("ostype")?,
            release: kernel("osrelease")?,
            uptime_secs: parse_uptime(&read_file("platform", "/proc/uptime")?)?,
            load: parse_loadavg(&read_file("platform", "/proc/loadavg")?)?,
            power_supply: read_power_supply(Path::new(POWER_SUPPLY_ROOT)),
        })
    }
}

/// A source returning fixed data; the uptime advances one second per read.
#[derive(Debug, Clone)]
pub struct StaticPlatformSource {
    info: PlatformInfo,
}

impl StaticPlatformSource {
    /// Creates a source replaying `info`.
    #[must_use]
    pub fn new(info: PlatformInfo) -> Self {
        Self { info }
    }
}

impl PlatformSource for StaticPlatformSource {
    fn read(&mut self) -> Result<PlatformInfo> {
        let info = self.info.clone();
        self.info.uptime_secs += 1;
        Ok(info)
    }
}

/// Keeps the latest platform data, retaining it across failed reads.
pub struct PlatformCollector {
    source: Box<dyn PlatformSource>,
    info: PlatformInfo,
}

impl PlatformCollector {
    /// Creates a collector over `source`.
    #[must_use]
    pub fn new(source: Box<dyn PlatformSource>) -> Self {
        Self {
            source,
            info: PlatformInfo::default(),
        }
    }

    /// Creates a collector reading `/proc`.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(ProcPlatformSource))
    }

    /// Reads once. Returns `false` if the backend failed.
    pub fn update(&mut self) -> bool {
        match self.source.read() {
            Ok(info) => {
                self.info = info;
                true
            }
            Err(e) => {
                tracing::warn!(
                    collector = "platform",
                    error = %e,
                    "read failed, keeping previous values"
                );
                false
            }
        }
    }

    /// Latest platform data.
    pub fn info(&self) -> &PlatformInfo {
        &self.info
    }
}

impl std::fmt::Debug for PlatformCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCollector").field("info", &self.info).finish_non_exhaustive()
    }
}
