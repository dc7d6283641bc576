//! CPU section: aggregate row, per-core rows, gauges and sparklines.

use super::{GAUGE_FILL, GAUGE_WIDTH};
use crate::collectors::cpu::{CpuCollector, CpuTicks, AGGREGATE_NAME};
use crate::console::{Color, Console, Style, TerminalBackend};
use crate::ring_buffer::RingBuffer;

/// Sparkline glyphs, one per utilization level.
pub const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Style of a sparkline glyph at `level`: cool colors for idle, hot for busy.
#[must_use]
pub fn spark_style(level: u8) -> Style {
    let (fg, bold) = match level {
        0 => (Color::Yellow, false),
        1 | 2 => (Color::Cyan, false),
        3 => (Color::Blue, true),
        4 => (Color::Magenta, false),
        5 => (Color::Magenta, true),
        6 => (Color::Red, false),
        _ => (Color::Red, true),
    };
    Style {
        fg,
        bold,
        ..Style::default()
    }
}

/// Column header text.
#[must_use]
pub fn heading() -> String {
    format!(
        "  {:<6} {:>7} {:>7} {:>7} {:>7} {:>7} {:<22} {}",
        "[C]PUS", "Use%", "User%", "System%", "Nice%", "Idle%", "Gauge", "History"
    )
}

/// Draws the CPU section. Condensed shows only the aggregate row.
pub fn draw<B: TerminalBackend>(
    console: &mut Console<B>,
    cpu: &CpuCollector,
    condensed: bool,
) -> u16 {
    console.inverse_line(&heading());
    let slots = cpu.history_size();
    row(console, AGGREGATE_NAME, cpu.aggregate_delta(), Some(cpu.aggregate_history()), slots);
    let mut lines = 2;

    if !condensed {
        for core in cpu.cores() {
            let name = format!("{AGGREGATE_NAME}{core}");
            row(console, &name, cpu.core_delta(core), cpu.core_history(core), slots);
            lines += 1;
        }
    }
    lines
}

fn row<B: TerminalBackend>(
    console: &mut Console<B>,
    name: &str,
    ticks: CpuTicks,
    history: Option<&RingBuffer<u8>>,
    slots: usize,
) {
    let pct = ticks.percentages();
    console.print(&format!(
        "  {name:<6} {:>6.1}% {:>6.1}% {:>6.1}% {:>6.1}% {:>6.1}% ",
        pct.used, pct.user, pct.system, pct.nice, pct.idle
    ));
    console.gauge(GAUGE_WIDTH, pct.used, GAUGE_FILL);
    console.print(" ");
    sparkline(console, history, slots);
    console.newline();
}

/// Draws `slots` sparkline cells, blanks first for slots not yet filled.
pub fn sparkline<B: TerminalBackend>(
    console: &mut Console<B>,
    history: Option<&RingBuffer<u8>>,
    slots: usize,
) {
    let filled = history.map_or(0, RingBuffer::len).min(slots);
    if filled < slots {
        console.print(&" ".repeat(slots - filled));
    }
    let Some(history) = history else { return };

    let saved = console.style();
    for &level in history.iter().skip(history.len() - filled) {
        let glyph = SPARK_GLYPHS[usize::from(level).min(SPARK_GLYPHS.len() - 1)];
        console.set_style(spark_style(level));
        console.print(glyph.encode_utf8(&mut [0; 4]));
    }
    console.set_style(saved);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RecordingBackend;
    use crate::sampler::ScriptedSource;

    fn ticks(user: u64, system: u64, nice: u64, idle: u64) -> CpuTicks {
        CpuTicks {
            user,
            system,
            nice,
            idle,
        }
    }

    fn collector() -> CpuCollector {
        let script = ScriptedSource::new("cpu")
            .frame(vec![(0, ticks(0, 0, 0, 0)), (1, ticks(0, 0, 0, 0))])
            .frame(vec![(0, ticks(100, 0, 0, 0)), (1, ticks(0, 0, 0, 100))]);
        let mut cpu = CpuCollector::new(Box::new(script), 4);
        cpu.update();
        cpu.update();
        cpu
    }

    #[test]
    fn test_spark_styles() {
        assert_eq!(spark_style(0).fg, Color::Yellow);
        assert!(spark_style(3).bold);
        assert_eq!(spark_style(3).fg, Color::Blue);
        let bold_red = Style {
            fg: Color::Red,
            bold: true,
            ..Style::default()
        };
        assert_eq!(spark_style(7), bold_red);
    }

    #[test]
    fn test_draw_full_and_condensed() {
        let cpu = collector();
        let mut console = Console::new(RecordingBackend::new(100, 10));
        assert_eq!(draw(&mut console, &cpu, false), 4);
        let lines = console.backend().lines();
        assert!(lines[0].starts_with("  [C]PUS"));
        assert!(lines[1].starts_with("  CPU      50.0%   50.0%"));
        assert!(lines[2].starts_with("  CPU0    100.0%  100.0%"));
        assert!(lines[3].starts_with("  CPU1      0.0%    0.0%"));

        let mut console = Console::new(RecordingBackend::new(100, 10));
        assert_eq!(draw(&mut console, &cpu, true), 2);
    }

    #[test]
    fn test_row_gauge_and_sparkline() {
        let cpu = collector();
        let mut console = Console::new(RecordingBackend::new(100, 10));
        draw(&mut console, &cpu, false);
        let lines = console.backend().lines();

        // CPU0 at 100%: full gauge and one top-level glyph after three blanks
        assert!(lines[2].contains(&format!("[{}]    █", "■".repeat(20))));
        // the aggregate at 50% sits at level 4
        assert!(lines[1].ends_with('▅'));
        assert_eq!(console.style(), Style::default());
    }

    #[test]
    fn test_heading_columns_line_up() {
        let cpu = collector();
        let mut console = Console::new(RecordingBackend::new(100, 10));
        draw(&mut console, &cpu, true);
        let lines = console.backend().lines();
        let gauge_col = lines[0].find("Gauge").unwrap();
        assert_eq!(lines[1].chars().nth(gauge_col), Some('['));
    }
}
