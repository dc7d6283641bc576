//! Section renderers.
//!
//! Each section draws through the [`Console`](crate::console::Console) from
//! the current cursor row downward and returns the number of lines it
//! emitted. Sections never position themselves; the dashboard decides
//! where they go and whether a spacer follows.

pub mod cpu;
pub mod disk;
pub mod header;
pub mod help;
pub mod memory;
pub mod network;
pub mod process;

use std::time::Duration;

/// Interior width of every gauge.
pub const GAUGE_WIDTH: u16 = 20;

/// Gauge fill character.
pub const GAUGE_FILL: char = '■';

const MIB: u64 = 1024 * 1024;

/// Formats `n` with `,` thousands separators.
#[must_use]
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Scales a counter delta accumulated over `interval` to a per-second rate.
///
/// A zero interval yields the delta unscaled.
#[must_use]
pub fn per_second(delta: u64, interval: Duration) -> u64 {
    let nanos = interval.as_nanos();
    if nanos == 0 {
        return delta;
    }
    u64::try_from(u128::from(delta) * 1_000_000_000 / nanos).unwrap_or(u64::MAX)
}

/// Truncates to at most `max` characters.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
