//! Process table section.

use super::truncate;
use crate::collectors::{NameCache, ProcessTable};
use crate::console::{Console, TerminalBackend};

/// Lines kept free below the table: the process count and the status footer.
const RESERVED_BELOW: u16 = 2;

/// Draws the busiest processes in the rows left on screen.
///
/// Condensed shows a single row. The dashboard's own process is bold.
pub fn draw<B: TerminalBackend>(
    console: &mut Console<B>,
    table: &ProcessTable,
    names: &mut NameCache,
    condensed: bool,
) -> u16 {
    console.inverse_line(&format!(
        " {:>6} {:>6} {:<16} {:<12} {}",
        "[P]ID", "CPU%", "USER", "GROUP", "NAME"
    ));

    let budget = console.height().saturating_sub(console.row()).saturating_sub(RESERVED_BELOW);
    let limit = if condensed { budget.min(1) } else { budget };

    let mut lines = 1;
    for record in table.view(usize::from(limit)) {
        let sample = &record.sample;
        let user = truncate(names.user(sample.uid), 16);
        let group = truncate(names.group(sample.gid), 12);
        let own = sample.pid == table.own_pid();
        if own {
            console.mode_bold(true);
        }
        console.println(&format!(
            " {:>6} {:>6.1} {user:<16} {group:<12} {}",
            sample.pid, record.cpu_percent, sample.name
        ));
        if own {
            console.mode_bold(false);
        }
        lines += 1;
    }

    console.println(&format!("  {} processes", table.len()));
    lines + 1
}
