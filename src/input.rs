//! Display options and key dispatch.

use crate::config::CondenseConfig;

/// A metric section of the dashboard, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Per-core CPU usage.
    Cpu,
    /// Real memory and swap.
    Memory,
    /// Paging and swapping rates.
    VirtualMemory,
    /// Block device I/O.
    Disk,
    /// Network interfaces.
    Network,
    /// Process table.
    Processes,
}

impl Section {
    /// All sections in render order.
    pub const ALL: [Self; 6] =
        [Self::Cpu, Self::Memory, Self::VirtualMemory, Self::Disk, Self::Network, Self::Processes];

    /// The key that toggles this section.
    #[must_use]
    pub fn key(self) -> char {
        match self {
            Self::Cpu => 'c',
            Self::Memory => 'm',
            Self::VirtualMemory => 'v',
            Self::Disk => 'd',
            Self::Network => 'n',
            Self::Processes => 'p',
        }
    }

    /// Section for a (lowercase) key.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

/// What the dashboard should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Key not bound.
    None,
    /// Clear the screen and draw the next frame from scratch.
    Redraw,
    /// Leave the dashboard.
    Quit,
}

const CTRL_C: char = '\u{3}';
const CTRL_D: char = '\u{4}';
const CTRL_L: char = '\u{c}';

/// User-controlled display state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Options {
    cpu: bool,
    memory: bool,
    virtual_memory: bool,
    disk: bool,
    network: bool,
    processes: bool,
    /// Condense every section and drop spacer lines.
    pub condense_all: bool,
    /// Help window replaces the metric sections.
    pub show_help: bool,
}

impl Options {
    /// Options with nothing condensed and help hidden.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial toggles from the configuration file.
    #[must_use]
    pub fn from_config(config: &CondenseConfig) -> Self {
        Self {
            cpu: config.cpu,
            memory: config.memory,
            virtual_memory: config.virtual_memory,
            disk: config.disk,
            network: config.network,
            processes: config.processes,
            condense_all: config.all,
            show_help: false,
        }
    }

    /// The user's toggle for `section` (not counting condense-all or height).
    #[must_use]
    pub fn condensed(&self, section: Section) -> bool {
        match section {
            Section::Cpu => self.cpu,
            Section::Memory => self.memory,
            Section::VirtualMemory => self.virtual_memory,
            Section::Disk => self.disk,
            Section::Network => self.network,
            Section::Processes => self.processes,
        }
    }

    fn toggle(&mut self, section: Section) {
        let flag = match section {
            Section::Cpu => &mut self.cpu,
            Section::Memory => &mut self.memory,
            Section::VirtualMemory => &mut self.virtual_memory,
            Section::Disk => &mut self.disk,
            Section::Network => &mut self.network,
            Section::Processes => &mut self.processes,
        };
        *flag = !*flag;
    }

    /// Applies one key. Letters are case-insensitive.
    pub fn handle_key(&mut self, key: char) -> Action {
        let key = key.to_ascii_lowercase();
        if let Some(section) = Section::from_key(key) {
            self.toggle(section);
            self.show_help = false;
            return Action::Redraw;
        }
        match key {
            'x' => {
                self.condense_all = !self.condense_all;
                self.show_help = false;
                Action::Redraw
            }
            'h' | '?' => {
                self.show_help = !self.show_help;
                Action::Redraw
            }
            CTRL_L => {
                self.show_help = false;
                Action::Redraw
            }
            'q' | CTRL_C | CTRL_D => Action::Quit,
            _ => Action::None,
        }
    }
}
