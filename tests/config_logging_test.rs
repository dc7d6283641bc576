//! Configuration files driving the dashboard, and the file-backed log.

#![allow(clippy::unwrap_used)]

use cctop::app::{Dashboard, Mode, Sources};
use cctop::collectors::{
    CpuTicks, MemoryStats, PlatformInfo, ScriptedProcessSource, StaticPlatformSource, SystemNames,
};
use cctop::config::Config;
use cctop::console::{Console, RecordingBackend};
use cctop::input::Section;
use cctop::sampler::ScriptedSource;
use cctop::signals::SignalFlags;
use cctop::{logging, MonitorError};
use std::io::Write;

fn sources() -> Sources {
    Sources {
        platform: Box::new(StaticPlatformSource::new(PlatformInfo::default())),
        cpu: Box::new(ScriptedSource::new("cpu").frame(vec![(0, CpuTicks::default())])),
        memory: Box::new(ScriptedSource::new("memory").frame(vec![((), MemoryStats::default())])),
        page_size: 4096,
        disk: Box::new(ScriptedSource::new("disk").failure()),
        network: Box::new(ScriptedSource::new("network").failure()),
        processes: Box::new(ScriptedProcessSource::new()),
        names: Box::new(SystemNames),
    }
}

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_sets_toggles_and_thresholds() {
    let file = write_config(
        "\
global:
  refresh_ms: 100
layout:
  min_width: 60
  min_height: 10
  condense_cpu_below: 12
  condense_all_below: 11
condense:
  memory: true
",
    );
    let config = Config::load(file.path()).unwrap();

    let console = Console::new(RecordingBackend::new(70, 30));
    let mut d = Dashboard::new(console, config, sources(), SignalFlags::detached());
    d.cycle().unwrap();

    assert_eq!(d.mode(), Mode::Rendering);
    assert!(d.section_condensed(Section::Memory));
    assert!(!d.section_condensed(Section::Cpu));
    assert!(!d.condense_all_active());
}

#[test]
fn test_config_min_size_controls_undersized() {
    let file = write_config(
        "\
global:
  refresh_ms: 100
layout:
  min_width: 120
  min_height: 30
",
    );
    let config = Config::load(file.path()).unwrap();

    let console = Console::new(RecordingBackend::new(110, 50));
    let mut d = Dashboard::new(console, config, sources(), SignalFlags::detached());
    d.cycle().unwrap();

    assert_eq!(d.mode(), Mode::Undersized);
    assert!(d.console().backend().contains("needs to be at least 120x30"));
}

#[test]
fn test_failing_collectors_do_not_stop_rendering() {
    let mut config = Config::default();
    config.global.refresh_ms = 100;
    let console = Console::new(RecordingBackend::new(100, 40));
    let mut d = Dashboard::new(console, config, sources(), SignalFlags::detached());
    d.cycle().unwrap();
    d.cycle().unwrap();

    let b = d.console().backend();
    assert!(b.contains("[D]ISK"));
    assert!(b.contains("[N]ETWORK"));
    assert!(b.contains("  0 processes"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    assert!(matches!(Config::load(&path), Err(MonitorError::ConfigNotFound(_))));
    assert_eq!(Config::load_or_default(&path).global.refresh_ms, 1000);
}

#[test]
fn test_log_records_go_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("cctop.log");
    logging::init(logging::parse_level("debug").unwrap(), &path).unwrap();

    tracing::warn!(collector = "disk", "read failed, keeping previous values");
    tracing::trace!("filtered out");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("logging initialized"));
    assert!(contents.contains("read failed, keeping previous values"));
    assert!(!contents.contains("filtered out"));
    assert!(!contents.contains('\u{1b}'));

    // only one global subscriber per process
    let again = logging::init(tracing::Level::INFO, &path);
    assert!(matches!(again, Err(MonitorError::LoggingInit(_))));
}
