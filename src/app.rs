//! Dashboard controller.
//!
//! One cycle: check signals, re-measure the terminal, update every
//! collector, render the sections top to bottom, flush, then wait for a key
//! for up to one refresh interval. The key wait is the only pacing; there is
//! no separate timer.
//!
//! Everything the loop touches is owned here and passed down explicitly.

use crate::collectors::{
    page_size, CpuCollector, CpuTicks, DiskCollector, DiskStats, MemoryCollector, MemoryStats,
    NameCache, NameLookup, NetStats, NetworkCollector, PlatformCollector, PlatformSource,
    ProcDiskstatsSource, ProcMeminfoSource, ProcNetDevSource, ProcPlatformSource, ProcStatSource,
    ProcessSource, ProcessTable, ProcfsProcessSource, SystemNames,
};
use crate::config::Config;
use crate::console::{Console, TerminalBackend};
use crate::error::Result;
use crate::input::{Action, Options, Section};
use crate::logging::CycleTimer;
use crate::panels;
use crate::sampler::BoxedSource;
use crate::signals::{ExitReason, SignalFlags};
use std::fmt;
use std::time::Duration;

/// Display state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Terminal below the minimum size; only the resize prompt is shown.
    Undersized,
    /// Normal dashboard.
    Rendering,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// Stop, for the given reason.
    Quit(ExitReason),
}

/// Collector backends, injected so tests can script them.
pub struct Sources {
    /// Host identity, uptime, load.
    pub platform: Box<dyn PlatformSource>,
    /// Per-core ticks.
    pub cpu: BoxedSource<usize, CpuTicks>,
    /// Memory and paging counters.
    pub memory: BoxedSource<(), MemoryStats>,
    /// Page size for the memory counters, in bytes.
    pub page_size: u64,
    /// Block device counters.
    pub disk: BoxedSource<String, DiskStats>,
    /// Interface counters.
    pub network: BoxedSource<String, NetStats>,
    /// Process list.
    pub processes: Box<dyn ProcessSource>,
    /// Uid/gid name lookup.
    pub names: Box<dyn NameLookup>,
}

impl Sources {
    /// The Linux `/proc` and `/sys` backends.
    #[must_use]
    pub fn system() -> Self {
        Self {
            platform: Box::new(ProcPlatformSource),
            cpu: Box::new(ProcStatSource),
            memory: Box::new(ProcMeminfoSource::new()),
            page_size: page_size(),
            disk: Box::new(ProcDiskstatsSource),
            network: Box::new(ProcNetDevSource),
            processes: Box::new(ProcfsProcessSource::new()),
            names: Box::new(SystemNames),
        }
    }
}

impl fmt::Debug for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sources")
            .field("cpu", &self.cpu.id())
            .field("memory", &self.memory.id())
            .field("disk", &self.disk.id())
            .field("network", &self.network.id())
            .field("processes", &self.processes.id())
            .finish_non_exhaustive()
    }
}

/// The dashboard: console, collectors and display options.
pub struct Dashboard<B: TerminalBackend> {
    console: Console<B>,
    config: Config,
    options: Options,
    signals: SignalFlags,

    platform: PlatformCollector,
    cpu: CpuCollector,
    memory: MemoryCollector,
    disk: DiskCollector,
    network: NetworkCollector,
    processes: ProcessTable,
    names: NameCache,

    mode: Mode,
    required_lines: Option<u16>,
    last_lines: u16,
    needs_clear: bool,
    cycles: u64,
    last_render: Duration,
    clock: fn() -> String,
}

impl<B: TerminalBackend> Dashboard<B> {
    /// Builds a dashboard drawing on `console`.
    pub fn new(
        console: Console<B>,
        config: Config,
        sources: Sources,
        signals: SignalFlags,
    ) -> Self {
        let history = config.global.history_size;
        Self {
            console,
            options: Options::from_config(&config.condense),
            signals,
            platform: PlatformCollector::new(sources.platform),
            cpu: CpuCollector::new(sources.cpu, history),
            memory: MemoryCollector::new(sources.memory, sources.page_size),
            disk: DiskCollector::new(sources.disk),
            network: NetworkCollector::new(sources.network),
            processes: ProcessTable::new(sources.processes),
            names: NameCache::new(sources.names),
            config,
            mode: Mode::Rendering,
            required_lines: None,
            last_lines: 0,
            needs_clear: true,
            cycles: 0,
            last_render: Duration::ZERO,
            clock: panels::header::clock,
        }
    }

    /// Replaces the banner clock (tests pin it).
    pub fn set_clock(&mut self, clock: fn() -> String) {
        self.clock = clock;
    }

    // ========================================================================
    // Loop
    // ========================================================================

    /// Takes over the terminal: raw input, hidden cursor, blank screen.
    pub fn start(&mut self) {
        tracing::info!(
            width = self.console.width(),
            height = self.console.height(),
            backend = self.console.backend().name(),
            "dashboard starting"
        );
        self.console.raw(true);
        self.console.show_cursor(false);
        self.console.clear_screen(false);
    }

    /// Runs cycles until quit or a shutdown signal, then restores the
    /// terminal.
    pub fn run(&mut self) -> Result<ExitReason> {
        self.start();
        let result = self.run_cycles();
        self.console.restore();
        if let Ok(reason) = &result {
            tracing::info!(?reason, cycles = self.cycles, "dashboard stopped");
        }
        result
    }

    fn run_cycles(&mut self) -> Result<ExitReason> {
        loop {
            if let Flow::Quit(reason) = self.cycle()? {
                return Ok(reason);
            }
        }
    }

    /// Draws a single frame with real rates and restores the terminal.
    ///
    /// Collectors are sampled once, then again one refresh interval later,
    /// so the frame shows an actual interval rather than first-sighting zeros.
    pub fn run_once(&mut self) -> Result<()> {
        self.update_collectors();
        std::thread::sleep(self.config.refresh_interval());
        self.console.measure();
        self.render();
        let result = self.console.flush();
        self.console.restore();
        result
    }

    /// One cycle: render, flush, wait for a key and apply it.
    pub fn cycle(&mut self) -> Result<Flow> {
        if let Some(reason) = self.signals.exit_reason() {
            return Ok(Flow::Quit(reason));
        }
        self.cycles += 1;
        let timer = CycleTimer::start(self.cycles, self.config.refresh_interval());

        if self.signals.take_resize() {
            tracing::debug!("resize signal");
        }
        self.console.measure();
        self.render();
        self.console.flush()?;
        self.last_render = timer.finish();

        Ok(self.wait_for_key())
    }

    fn wait_for_key(&mut self) -> Flow {
        let timeout = self.config.refresh_interval();
        let key = self.console.read_key(timeout, self.signals.shutdown_flag());
        if let Some(reason) = self.signals.exit_reason() {
            return Flow::Quit(reason);
        }
        let Some(key) = key else { return Flow::Continue };

        match self.options.handle_key(key) {
            Action::Quit => Flow::Quit(ExitReason::Quit),
            Action::Redraw => {
                tracing::debug!(key = ?key, options = ?self.options, "options changed");
                self.needs_clear = true;
                Flow::Continue
            }
            Action::None => Flow::Continue,
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn undersized(&self) -> bool {
        let layout = &self.config.layout;
        self.console.width() < layout.min_width || self.console.height() < layout.min_height
    }

    fn enter(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::info!(
                from = ?self.mode,
                to = ?mode,
                width = self.console.width(),
                height = self.console.height(),
                "display mode changed"
            );
            self.mode = mode;
            self.needs_clear = true;
        }
    }

    /// Whether every section is condensed and spacers are dropped.
    pub fn condense_all_active(&self) -> bool {
        self.options.condense_all || self.console.height() < self.config.layout.condense_all_below
    }

    /// Whether `section` is drawn condensed at the current height.
    pub fn section_condensed(&self, section: Section) -> bool {
        let height = self.console.height();
        self.condense_all_active()
            || self.options.condensed(section)
            || (section == Section::Cpu && height < self.config.layout.condense_cpu_below)
    }

    fn update_collectors(&mut self) {
        self.platform.update();
        self.cpu.update();
        self.memory.update();
        self.disk.update();
        self.network.update();
        self.processes.update(self.cpu.interval_ticks());
    }

    fn render(&mut self) {
        if self.undersized() {
            self.enter(Mode::Undersized);
            self.render_resize_prompt();
            return;
        }
        self.enter(Mode::Rendering);
        self.update_collectors();

        if self.needs_clear {
            self.console.clear_screen(false);
            self.needs_clear = false;
        }
        self.console.move_to(0, 0);

        let clock = (self.clock)();
        let refresh_ms = self.config.global.refresh_ms;
        let mut lines =
            panels::header::draw(&mut self.console, self.platform.info(), refresh_ms, &clock);
        self.console.newline();
        lines += 1;

        if !self.options.show_help {
            for section in Section::ALL {
                lines += self.draw_section(section);
                if section != Section::Processes && self.wants_spacer(lines) {
                    self.console.newline();
                    lines += 1;
                }
            }
        }
        let required = *self.required_lines.get_or_insert(lines);

        if self.options.show_help {
            panels::help::draw(&mut self.console, &self.options);
            self.console.move_to(panels::help::WINDOW_ROW + panels::help::WINDOW_HEIGHT, 0);
        }

        let (width, height) = (self.console.width(), self.console.height());
        self.console.println(&format!("{lines}/{required} lines {width}x{height}"));
        self.console.clear_screen(true);
        self.last_lines = lines;
    }

    fn wants_spacer(&self, lines: u16) -> bool {
        !self.condense_all_active() && self.required_lines.is_some_and(|required| lines < required)
    }

    fn draw_section(&mut self, section: Section) -> u16 {
        let condensed = self.section_condensed(section);
        let fallback = self.config.refresh_interval();
        let console = &mut self.console;
        match section {
            Section::Cpu => panels::cpu::draw(console, &self.cpu, condensed),
            Section::Memory => panels::memory::draw(console, &self.memory, condensed),
            Section::VirtualMemory => {
                panels::memory::draw_virtual(console, &self.memory, condensed)
            }
            Section::Disk => {
                let interval = self.disk.sampler().interval().unwrap_or(fallback);
                panels::disk::draw(console, &self.disk, interval, condensed)
            }
            Section::Network => {
                let interval = self.network.sampler().interval().unwrap_or(fallback);
                panels::network::draw(console, &self.network, interval, condensed)
            }
            Section::Processes => {
                panels::process::draw(console, &self.processes, &mut self.names, condensed)
            }
        }
    }

    fn render_resize_prompt(&mut self) {
        if self.needs_clear {
            self.console.clear_screen(false);
            self.needs_clear = false;
        }
        let layout = &self.config.layout;
        let prompt = format!(
            "Window is {}x{} and needs to be at least {}x{}",
            self.console.width(),
            self.console.height(),
            layout.min_width,
            layout.min_height
        );
        self.console.move_to(0, 0);
        self.console.println(&prompt);
        self.console.clear_screen(true);
        self.last_lines = 1;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current display mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The console.
    pub fn console(&self) -> &Console<B> {
        &self.console
    }

    /// The console, mutably.
    pub fn console_mut(&mut self) -> &mut Console<B> {
        &mut self.console
    }

    /// Display options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Line count of the first full render, once known.
    pub fn required_lines(&self) -> Option<u16> {
        self.required_lines
    }

    /// Lines emitted by the most recent render.
    pub fn last_lines(&self) -> u16 {
        self.last_lines
    }

    /// Cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Time spent sampling, rendering and flushing in the latest cycle,
    /// excluding the key wait.
    pub fn last_render(&self) -> Duration {
        self.last_render
    }

    /// The CPU collector.
    pub fn cpu(&self) -> &CpuCollector {
        &self.cpu
    }

    /// The disk collector.
    pub fn disk(&self) -> &DiskCollector {
        &self.disk
    }

    /// The network collector.
    pub fn network(&self) -> &NetworkCollector {
        &self.network
    }

    /// The process table.
    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// The process table, mutably.
    pub fn processes_mut(&mut self) -> &mut ProcessTable {
        &mut self.processes
    }
}

impl<B: TerminalBackend> fmt::Debug for Dashboard<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("backend", &self.console.backend().name())
            .field("mode", &self.mode)
            .field("options", &self.options)
            .field("required_lines", &self.required_lines)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{
        PlatformInfo, ProcessSample, ScriptedProcessSource, StaticPlatformSource,
    };
    use crate::console::{Call, RecordingBackend};
    use crate::sampler::ScriptedSource;

    struct NoNames;

    impl NameLookup for NoNames {
        fn user(&self, _uid: u32) -> Option<String> {
            None
        }

        fn group(&self, _gid: u32) -> Option<String> {
            None
        }
    }

    fn sources() -> Sources {
        let cpu = |n: u64| CpuTicks {
            user: n,
            system: 0,
            nice: 0,
            idle: 3 * n,
        };
        let memory = MemoryStats {
            total_pages: 1000,
            free_pages: 500,
            ..MemoryStats::default()
        };
        let init = ProcessSample {
            pid: 1,
            name: "init".into(),
            ..ProcessSample::default()
        };
        Sources {
            platform: Box::new(StaticPlatformSource::new(PlatformInfo {
                hostname: "host".into(),
                sysname: "Linux".into(),
                release: "6.1".into(),
                uptime_secs: 60,
                load: [0.1, 0.2, 0.3],
                power_supply: None,
            })),
            cpu: Box::new(
                ScriptedSource::new("cpu")
                    .frame(vec![(0, cpu(0))])
                    .frame(vec![(0, cpu(100))]),
            ),
            memory: Box::new(ScriptedSource::new("memory").frame(vec![((), memory)])),
            page_size: 4096,
            disk: Box::new(
                ScriptedSource::new("disk").frame(vec![("sda".to_string(), DiskStats::default())]),
            ),
            network: Box::new(ScriptedSource::new("network").frame(Vec::new())),
            processes: Box::new(ScriptedProcessSource::new().frame(vec![init])),
            names: Box::new(NoNames),
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.global.refresh_ms = 100;
        config
    }

    fn dashboard(width: u16, height: u16) -> Dashboard<RecordingBackend> {
        let console = Console::new(RecordingBackend::new(width, height));
        let mut dashboard = Dashboard::new(console, config(), sources(), SignalFlags::detached());
        dashboard.set_clock(|| "CLOCK".to_string());
        dashboard
    }

    #[test]
    fn test_first_cycle_renders_every_section() {
        let mut d = dashboard(100, 60);
        d.console_mut().backend_mut().push_key('z');
        assert_eq!(d.cycle().unwrap(), Flow::Continue);

        let b = d.console().backend();
        let headers = [
            "cctop/100",
            "[C]PUS",
            "[M]EMORY",
            "[V]IRTUAL MEMORY",
            "[D]ISK",
            "[N]ETWORK",
            "[P]ID",
        ];
        for header in headers {
            assert!(b.contains(header), "missing {header}");
        }
        assert!(b.contains("  1 processes"));
        assert_eq!(d.mode(), Mode::Rendering);
        assert_eq!(d.required_lines(), Some(d.last_lines()));
    }

    #[test]
    fn test_quit_key() {
        let mut d = dashboard(100, 60);
        d.console_mut().backend_mut().push_key('Q');
        assert_eq!(d.cycle().unwrap(), Flow::Quit(ExitReason::Quit));
    }

    #[test]
    fn test_small_height_condenses_cpu_first() {
        let d = dashboard(100, 40);
        assert!(d.section_condensed(Section::Cpu));
        assert!(!d.section_condensed(Section::Memory));
        assert!(!d.condense_all_active());

        let d = dashboard(100, 30);
        assert!(d.section_condensed(Section::Memory));
        assert!(d.condense_all_active());
    }

    #[test]
    fn test_undersized_shows_prompt_only() {
        let mut d = dashboard(80, 20);
        d.cycle().unwrap();
        assert_eq!(d.mode(), Mode::Undersized);
        let b = d.console().backend();
        assert_eq!(b.lines()[0], "Window is 80x20 and needs to be at least 99x24");
        assert!(!b.contains("[C]PUS"));
    }

    #[test]
    fn test_help_replaces_sections() {
        let mut d = dashboard(100, 60);
        d.console_mut().backend_mut().push_key('h');
        d.cycle().unwrap();
        d.cycle().unwrap();

        let b = d.console().backend();
        assert!(b.contains("cctop/100"));
        assert!(b.contains("[HELP]"));
        assert!(!b.contains("[C]PUS"));
    }

    #[test]
    fn test_run_restores_once_on_interrupt() {
        let signals = SignalFlags::detached();
        let console = Console::new(RecordingBackend::new(100, 60));
        let mut d = Dashboard::new(console, config(), sources(), signals.clone());
        d.console_mut().backend_mut().push_key('q');
        signals.raise_interrupt();

        assert_eq!(d.run().unwrap(), ExitReason::Interrupted);
        let b = d.console().backend();
        assert_eq!(b.count(Call::CursorVisible(true)), 1);
        assert_eq!(b.count(Call::RawMode(false)), 1);
    }
}
