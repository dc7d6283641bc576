//! Network interface collector.
//!
//! Byte and packet counters come from `/proc/net/dev`; link flags and speed
//! from `/sys/class/net/<iface>/{flags,speed}`.

use super::{field_u64, read_file};
use crate::error::{MonitorError, Result};
use crate::sampler::{counter_delta, BoxedSource, DeltaRecord, DeltaSampler, SnapshotSource};

/// Interface is administratively up.
pub const IFF_UP: u32 = 0x1;
/// Interface is a loopback device.
pub const IFF_LOOPBACK: u32 = 0x8;

/// Counters and link state for one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStats {
    /// Interface flags (`IFF_*`).
    pub flags: u32,
    /// Link speed in Mbit/s, 0 when unknown.
    pub speed_mbps: u64,
    /// Bytes received.
    pub bytes_in: u64,
    /// Bytes sent.
    pub bytes_out: u64,
    /// Packets received.
    pub packets_in: u64,
    /// Packets sent.
    pub packets_out: u64,
}

impl NetStats {
    /// Whether the interface is up.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.flags & IFF_UP != 0
    }

    /// Whether the interface is a loopback device.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        self.flags & IFF_LOOPBACK != 0
    }
}

impl DeltaRecord for NetStats {
    fn delta(&self, older: &Self) -> Self {
        Self {
            // link state, not counters
            flags: self.flags,
            speed_mbps: self.speed_mbps,
            bytes_in: counter_delta(self.bytes_in, older.bytes_in),
            bytes_out: counter_delta(self.bytes_out, older.bytes_out),
            packets_in: counter_delta(self.packets_in, older.packets_in),
            packets_out: counter_delta(self.packets_out, older.packets_out),
        }
    }
}

/// Parses `/proc/net/dev` counters. Flags and speed are left at zero.
pub fn parse_net_dev(content: &str) -> Result<Vec<(String, NetStats)>> {
    let mut interfaces = Vec::new();
    for line in content.lines().skip(2).filter(|l| !l.trim().is_empty()) {
        let Some((name, counters)) = line.split_once(':') else {
            return Err(MonitorError::collection("network", format!("malformed line: {line}")));
        };
        let fields: Vec<&str> = counters.split_whitespace().collect();
        interfaces.push((
            name.trim().to_string(),
            NetStats {
                bytes_in: field_u64(&fields, 0),
                packets_in: field_u64(&fields, 1),
                bytes_out: field_u64(&fields, 8),
                packets_out: field_u64(&fields, 9),
                ..NetStats::default()
            },
        ));
    }
    Ok(interfaces)
}

/// Parses a sysfs flags value such as `0x1003`.
pub fn parse_flags(raw: &str) -> u32 {
    let raw = raw.trim();
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    u32::from_str_radix(hex, 16).unwrap_or(0)
}

/// Linux backend reading `/proc/net/dev` and `/sys/class/net`.
#[derive(Debug, Default)]
pub struct ProcNetDevSource;

impl SnapshotSource for ProcNetDevSource {
    type Key = String;
    type Record = NetStats;

    fn id(&self) -> &'static str {
        "network"
    }

    fn read(&mut self) -> Result<Vec<(String, NetStats)>> {
        let mut interfaces = parse_net_dev(&read_file("network", "/proc/net/dev")?)?;
        for (name, stats) in &mut interfaces {
            let sys = format!("/sys/class/net/{name}");
            stats.flags =
                std::fs::read_to_string(format!("{sys}/flags")).map_or(0, |s| parse_flags(&s));
            // speed reads fail with EINVAL on links that are down
            stats.speed_mbps = std::fs::read_to_string(format!("{sys}/speed"))
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map_or(0, |v| v.max(0) as u64);
        }
        Ok(interfaces)
    }
}

/// Per-interface traffic sampler.
#[derive(Debug)]
pub struct NetworkCollector {
    sampler: DeltaSampler<String, NetStats>,
}

impl NetworkCollector {
    /// Creates a collector over `source`.
    #[must_use]
    pub fn new(source: BoxedSource<String, NetStats>) -> Self {
        Self {
            sampler: DeltaSampler::new(source),
        }
    }

    /// Creates a collector reading `/proc/net/dev`.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(ProcNetDevSource))
    }

    /// Samples once. Returns `false` if the backend failed.
    pub fn update(&mut self) -> bool {
        self.sampler.update()
    }

    /// Interfaces worth displaying: seen in the latest read, up, not
    /// loopback, and with received traffic. Yields `(name, delta, current)`.
    pub fn active_interfaces(&self) -> impl Iterator<Item = (&str, NetStats, NetStats)> + '_ {
        self.sampler.live_keys().filter_map(move |name| {
            let current = *self.sampler.current_of(name)?;
            let idle = current.packets_in == 0;
            if name == "lo" || current.is_loopback() || !current.is_up() || idle {
                return None;
            }
            let delta = self.sampler.delta_of(name).copied().unwrap_or_default();
            Some((name.as_str(), delta, current))
        })
    }

    /// The underlying sampler.
    pub fn sampler(&self) -> &DeltaSampler<String, NetStats> {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ScriptedSource;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     789    0    0    0     0          0         0   123456     789    0    0    0     0       0          0
  eth0: 9876543    6543    0    0    0     0          0        12  1234567     3210    0    0    0     0       0          0
";

    fn iface(flags: u32, bytes_in: u64, packets_in: u64) -> NetStats {
        NetStats {
            flags,
            bytes_in,
            packets_in,
            ..NetStats::default()
        }
    }

    #[test]
    fn test_parse_net_dev() {
        let ifaces = parse_net_dev(NET_DEV).unwrap();
        assert_eq!(ifaces.len(), 2);
        assert_eq!(ifaces[1].0, "eth0");
        assert_eq!(ifaces[1].1.bytes_in, 9_876_543);
        assert_eq!(ifaces[1].1.packets_in, 6543);
        assert_eq!(ifaces[1].1.bytes_out, 1_234_567);
        assert_eq!(ifaces[1].1.packets_out, 3210);
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_flags("0x1003\n"), 0x1003);
        assert_eq!(parse_flags("garbage"), 0);
        assert!(iface(parse_flags("0x1003"), 0, 0).is_up());
    }

    #[test]
    fn test_counter_wraparound_is_clamped() {
        let source = ScriptedSource::new("network")
            .frame(vec![("eth0".to_string(), iface(IFF_UP, 5_000, 50))])
            .frame(vec![("eth0".to_string(), iface(IFF_UP, 100, 60))]);
        let mut net = NetworkCollector::new(Box::new(source));
        net.update();
        net.update();

        let (_, delta, _) = net.active_interfaces().next().unwrap();
        assert_eq!(delta.bytes_in, 0);
        assert_eq!(delta.packets_in, 10);
    }

    #[test]
    fn test_active_interfaces_filter() {
        let source = ScriptedSource::new("network").frame(vec![
            ("down0".to_string(), iface(0, 10, 10)),
            ("eth0".to_string(), iface(IFF_UP, 10, 10)),
            ("idle0".to_string(), iface(IFF_UP, 0, 0)),
            ("lo".to_string(), iface(IFF_UP | IFF_LOOPBACK, 10, 10)),
        ]);
        let mut net = NetworkCollector::new(Box::new(source));
        net.update();

        let names: Vec<&str> = net.active_interfaces().map(|(n, _, _)| n).collect();
        assert_eq!(names, vec!["eth0"]);
    }

    #[test]
    fn test_vanished_interface_is_hidden() {
        let source = ScriptedSource::new("network")
            .frame(vec![
                ("eth0".to_string(), iface(IFF_UP, 10, 10)),
                ("wlan0".to_string(), iface(IFF_UP, 10, 10)),
            ])
            .frame(vec![("eth0".to_string(), iface(IFF_UP, 20, 20))]);
        let mut net = NetworkCollector::new(Box::new(source));
        net.update();
        net.update();

        let names: Vec<&str> = net.active_interfaces().map(|(n, _, _)| n).collect();
        assert_eq!(names, vec!["eth0"]);
        assert!(net.sampler().current().contains_key("wlan0"));
    }
}
