//! Key binding legend shown in place of the metric sections.

use crate::console::{Console, TerminalBackend};
use crate::input::{Options, Section};

/// Top row of the help window.
pub const WINDOW_ROW: u16 = 5;
/// Left column of the help window.
pub const WINDOW_COL: u16 = 3;
/// Height of the help window.
pub const WINDOW_HEIGHT: u16 = 14;

const MARGIN: u16 = 2;
const PADDING: u16 = 2;

fn flag(on: bool) -> &'static str {
    if on {
        "[ TRUE ]"
    } else {
        "[ FALSE ]"
    }
}

fn describe(section: Section) -> &'static str {
    match section {
        Section::Cpu => "toggles condensed CPU display",
        Section::Memory => "toggles condensed Memory display",
        Section::VirtualMemory => "toggles condensed Virtual Memory display",
        Section::Disk => "toggles condensed Disk Activity display",
        Section::Network => "toggles condensed Network display",
        Section::Processes => "toggles condensed Process List display",
    }
}

/// Draws the help window with the current toggle states.
pub fn draw<B: TerminalBackend>(console: &mut Console<B>, options: &Options) {
    let width = console.width().saturating_sub(MARGIN * 2);
    console.window(WINDOW_ROW, WINDOW_COL, width, WINDOW_HEIGHT, Some("HELP"));

    let col = WINDOW_COL + PADDING;
    let mut row = WINDOW_ROW + PADDING;
    let mut line = |console: &mut Console<B>, text: &str| {
        console.move_to(row, col);
        console.print(text);
        row += 1;
    };

    for section in Section::ALL {
        let key = section.key().to_ascii_uppercase();
        let state = flag(options.condensed(section));
        line(console, &format!("{key} {:<48} {state}", describe(section)));
    }
    let state = flag(options.condense_all);
    line(console, &format!("X {:<48} {state}", "toggles remove blank lines"));
    line(console, "");
    line(console, "H toggles this Help Window");
    line(console, "");
    line(console, "Q, ^D, or ^C to quit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RecordingBackend;

    #[test]
    fn test_help_window_layout() {
        let mut options = Options::new();
        options.handle_key('d');
        let mut console = Console::new(RecordingBackend::new(100, 30));
        draw(&mut console, &options);
        let lines = console.backend().lines();

        assert!(lines[5].starts_with("   ╔═[HELP]═"));
        assert!(lines[5].ends_with('╗'));
        assert_eq!(lines[5].chars().count(), 99);
        assert!(lines[7].contains("C toggles condensed CPU display"));
        assert!(lines[7].contains("[ FALSE ]"));
        assert!(lines[10].contains("D toggles condensed Disk Activity display"));
        assert!(lines[10].contains("[ TRUE ]"));
        assert!(lines[13].contains("X toggles remove blank lines"));
        assert!(lines[15].contains("H toggles this Help Window"));
        assert!(lines[17].contains("Q, ^D, or ^C to quit"));
        assert!(lines[18].starts_with("   ╚"));
    }
}
