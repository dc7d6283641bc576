//! Disk activity section.

use super::{per_second, thousands, truncate};
use crate::collectors::DiskCollector;
use crate::console::{Console, TerminalBackend};
use std::time::Duration;

/// Draws one row per block device. Condensed shows the header only.
pub fn draw<B: TerminalBackend>(
    console: &mut Console<B>,
    disk: &DiskCollector,
    interval: Duration,
    condensed: bool,
) -> u16 {
    console.inverse_line(&format!(
        "  {:<10} {:>10} {:>10} {:>13} {:>13} {:>15} {:>15}",
        "[D]ISK", "Reads/s", "Writes/s", "Read B/s", "Write B/s", "Total Read", "Total Written"
    ));
    if condensed {
        return 1;
    }

    let mut lines = 1;
    for (name, delta, current) in disk.devices() {
        console.println(&format!(
            "  {:<10} {:>10} {:>10} {:>13} {:>13} {:>15} {:>15}",
            truncate(name, 10),
            thousands(per_second(delta.reads, interval)),
            thousands(per_second(delta.writes, interval)),
            thousands(per_second(delta.bytes_read, interval)),
            thousands(per_second(delta.bytes_written, interval)),
            thousands(current.bytes_read),
            thousands(current.bytes_written),
        ));
        lines += 1;
    }
    lines
}
