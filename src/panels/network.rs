//! Network traffic section.

use super::{per_second, thousands, truncate};
use crate::collectors::NetworkCollector;
use crate::console::{Console, TerminalBackend};
use std::time::Duration;

/// Draws one row per active interface. Condensed shows the header only.
pub fn draw<B: TerminalBackend>(
    console: &mut Console<B>,
    network: &NetworkCollector,
    interval: Duration,
    condensed: bool,
) -> u16 {
    console.inverse_line(&format!(
        "  {:<10} {:>13} {:>13} {:>13} {:>13} {:>13} {:>13}",
        "[N]ETWORK", "Read (B/s)", "Write (B/s)", "RX Packets", "TX Packets", "Total RX", "Total TX"
    ));
    if condensed {
        return 1;
    }

    let mut lines = 1;
    for (name, delta, current) in network.active_interfaces() {
        console.println(&format!(
            "  {:<10} {:>13} {:>13} {:>13} {:>13} {:>13} {:>13}",
            truncate(name, 10),
            thousands(per_second(delta.bytes_in, interval)),
            thousands(per_second(delta.bytes_out, interval)),
            thousands(delta.packets_in),
            thousands(delta.packets_out),
            thousands(current.bytes_in),
            thousands(current.bytes_out),
        ));
        lines += 1;
    }
    lines
}
