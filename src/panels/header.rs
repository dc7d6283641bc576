//! Platform header: identity banner, uptime and load average.

use super::{GAUGE_FILL, GAUGE_WIDTH};
use crate::collectors::{BatteryState, PlatformInfo, PowerSupply};
use crate::console::{Console, TerminalBackend};

/// Local date and time for the banner.
#[must_use]
pub fn clock() -> String {
    chrono::Local::now().format("%c").to_string()
}

/// Builds the banner text, with `clock` right-aligned when it fits.
#[must_use]
pub fn banner(info: &PlatformInfo, refresh_ms: u64, clock: &str, width: u16) -> String {
    let left = format!("cctop/{refresh_ms} [{}/{} {}]", info.hostname, info.sysname, info.release);
    let used = left.chars().count() + clock.chars().count();
    let width = usize::from(width);
    if used < width {
        format!("{left}{}{clock}", " ".repeat(width - used))
    } else {
        left
    }
}

/// Draws the header: banner, uptime and load, then power on machines with a
/// battery. Returns the line count.
pub fn draw<B: TerminalBackend>(
    console: &mut Console<B>,
    info: &PlatformInfo,
    refresh_ms: u64,
    clock: &str,
) -> u16 {
    let text = banner(info, refresh_ms, clock, console.width());
    console.inverse_line(&text);

    let (days, hours, minutes) = info.uptime_parts();
    console.mode_bold(true);
    console.print("Uptime: ");
    console.mode_bold(false);
    console.print(&format!("{days} days {hours}:{minutes:02}  "));
    console.mode_bold(true);
    console.print("Load Average: ");
    console.mode_bold(false);
    console.print(&format!("{:5.2} {:5.2} {:5.2}", info.load[0], info.load[1], info.load[2]));
    console.newline();

    match &info.power_supply {
        Some(power) => {
            draw_power(console, power);
            3
        }
        None => 2,
    }
}

fn draw_power<B: TerminalBackend>(console: &mut Console<B>, power: &PowerSupply) {
    console.mode_bold(true);
    console.print("Power Source: ");
    console.mode_bold(false);
    console.print(&format!("{} ", power.source_name()));
    console.mode_bold(true);
    console.print("Battery: ");
    console.mode_bold(false);
    console.print(&format!("{:.0}% ", power.charge_pct));
    console.gauge(GAUGE_WIDTH, power.charge_pct, GAUGE_FILL);
    match power.hours_remaining() {
        Some(hours) => console.print(&format!(" {hours:.1} hours remaining")),
        None if power.state == BatteryState::Discharging => {
            console.print(" Calculating time remaining");
        }
        None => {}
    }
    console.newline();
}
