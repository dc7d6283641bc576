//! Memory and virtual memory sections.

use super::{thousands, GAUGE_FILL, GAUGE_WIDTH, MIB};
use crate::collectors::MemoryCollector;
use crate::console::{Console, TerminalBackend};

/// Draws the memory section. Condensed drops the swap row.
pub fn draw<B: TerminalBackend>(
    console: &mut Console<B>,
    memory: &MemoryCollector,
    condensed: bool,
) -> u16 {
    console.inverse_line(&format!(
        "  {:<12} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "[M]EMORY", "Total", "Used", "Free", "Wired", "Cached"
    ));

    let cur = memory.current();
    let mib = |pages: u64| thousands(memory.pages_to_mib(pages));
    console.print(&format!(
        "  {:<12} {:>9} {:>9} {:>9} {:>9} {:>9} ",
        "Real",
        mib(cur.total_pages),
        thousands(memory.used_bytes() / MIB),
        mib(cur.free_pages),
        mib(cur.wired_pages),
        mib(cur.cached_pages),
    ));
    console.gauge(GAUGE_WIDTH, memory.used_percent(), GAUGE_FILL);
    console.newline();

    if condensed {
        return 2;
    }
    console.println(&format!(
        "  {:<12} {:>9} {:>9} {:>9}",
        "Swap",
        thousands(cur.swap_total / MIB),
        thousands(cur.swap_used / MIB),
        thousands(cur.swap_free / MIB),
    ));
    3
}

/// Draws the paging/swapping section. Condensed shows the header only.
pub fn draw_virtual<B: TerminalBackend>(
    console: &mut Console<B>,
    memory: &MemoryCollector,
    condensed: bool,
) -> u16 {
    console.inverse_line(&format!(
        "  {:<16} {:>19} {:>22}",
        "[V]IRTUAL MEMORY", "  IN Current OUT  ", "  IN Aggregate OUT "
    ));
    if condensed {
        return 1;
    }

    let (cur, delta) = (memory.current(), memory.delta());
    for (label, d_in, d_out, c_in, c_out) in [
        ("Page", delta.pageins, delta.pageouts, cur.pageins, cur.pageouts),
        ("Swap", delta.swapins, delta.swapouts, cur.swapins, cur.swapouts),
    ] {
        console.println(&format!(
            "  {label:<12} {:>9}   {:>9} {:>9}     {:>9}",
            thousands(d_in),
            thousands(d_out),
            thousands(c_in),
            thousands(c_out),
        ));
    }
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::MemoryStats;
    use crate::console::RecordingBackend;
    use crate::sampler::ScriptedSource;

    fn stats(pageins: u64) -> MemoryStats {
        MemoryStats {
            total_pages: 4096,
            free_pages: 1024,
            cached_pages: 1024,
            wired_pages: 256,
            pageins,
            pageouts: 10,
            swap_total: 2048 * MIB,
            swap_used: 512 * MIB,
            swap_free: 1536 * MIB,
            ..MemoryStats::default()
        }
    }

    fn collector() -> MemoryCollector {
        let script = ScriptedSource::new("memory")
            .frame(vec![((), stats(100))])
            .frame(vec![((), stats(1300))]);
        // 1 MiB pages keep the arithmetic readable
        let mut memory = MemoryCollector::new(Box::new(script), MIB);
        memory.update();
        memory.update();
        memory
    }

    #[test]
    fn test_memory_rows() {
        let memory = collector();
        let mut console = Console::new(RecordingBackend::new(100, 10));
        assert_eq!(draw(&mut console, &memory, false), 3);
        let lines = console.backend().lines();

        assert!(lines[0].starts_with("  [M]EMORY"));
        let row: Vec<&str> = lines[1].split_whitespace().take(6).collect();
        assert_eq!(row, ["Real", "4,096", "3,072", "1,024", "256", "1,024"]);
        // (3072 - 1024) / 4096 = 50%
        assert!(lines[1].ends_with(&format!("[{}{}]", "■".repeat(10), " ".repeat(10))));
        assert_eq!(lines[2], "  Swap             2,048       512     1,536");
    }

    #[test]
    fn test_memory_condensed() {
        let memory = collector();
        let mut console = Console::new(RecordingBackend::new(100, 10));
        assert_eq!(draw(&mut console, &memory, true), 2);
        assert!(!console.backend().contains("Swap"));
    }

    #[test]
    fn test_virtual_memory_rows() {
        let memory = collector();
        let mut console = Console::new(RecordingBackend::new(100, 10));
        assert_eq!(draw_virtual(&mut console, &memory, false), 3);
        let lines = console.backend().lines();
        assert!(lines[0].contains("IN Current OUT"));
        assert_eq!(lines[1], "  Page             1,200           0     1,300            10");

        let mut console = Console::new(RecordingBackend::new(100, 10));
        assert_eq!(draw_virtual(&mut console, &memory, true), 1);
    }
}
