//! Console logger for simulated runs.
//!
//! Prints in the kernel serial console format (`[ INFO] message`, coloured
//! per level) to stderr. The level comes from `KSIM_LOG` and defaults to
//! `warn`.

use std::env;
use std::str::FromStr;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Console;

fn tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRACE",
        Level::Debug => "DEBUG",
        Level::Info => " INFO",
        Level::Warn => " WARN",
        Level::Error => "ERROR",
    }
}

fn color(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[90m", // Gray
        Level::Debug => "\x1b[36m", // Cyan
        Level::Info => "\x1b[32m",  // Green
        Level::Warn => "\x1b[33m",  // Yellow
        Level::Error => "\x1b[31m", // Red
    }
}

impl Log for Console {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let level = record.level();
            eprintln!("{}[{}]\x1b[0m {}", color(level), tag(level), record.args());
        }
    }

    fn flush(&self) {}
}

static CONSOLE: Console = Console;

/// Parses a `KSIM_LOG` value. Unknown values fall back to `warn`.
pub fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Installs the console logger. Later calls do nothing, and so does the
/// first one if some other logger is already installed.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if log::set_logger(&CONSOLE).is_ok() {
            log::set_max_level(parse_level(env::var("KSIM_LOG").ok().as_deref()));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level(Some("trace")), LevelFilter::Trace);
        assert_eq!(parse_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(parse_level(Some(" off ")), LevelFilter::Off);
    }

    #[test]
    fn missing_or_unknown_level_is_warn() {
        assert_eq!(parse_level(None), LevelFilter::Warn);
        assert_eq!(parse_level(Some("loud")), LevelFilter::Warn);
    }

    #[test]
    fn tags_line_up() {
        for level in [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error] {
            assert_eq!(tag(level).len(), 5);
        }
    }
}
