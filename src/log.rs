// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use std::fs::File;

use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};

/// Environment variable selecting the trace destination
pub const TRACE_ENV_VAR: &str = "P11ATTR_TRACE";
/// Environment variable selecting the trace level
pub const TRACE_LEVEL_ENV_VAR: &str = "P11ATTR_TRACE_LEVEL";

/// Maps a level name to a filter, unknown names select Trace
fn parse_level(l: &str) -> LevelFilter {
    match l {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Trace,
    }
}

/// Returns the level selected by P11ATTR_TRACE_LEVEL, LevelFilter::Error
/// when the variable is not set
pub fn trace_level() -> LevelFilter {
    match std::env::var(TRACE_LEVEL_ENV_VAR) {
        Err(_) => LevelFilter::Error,
        Ok(l) => parse_level(l.as_str()),
    }
}

/// Initializes a simple logger for tracing purposes based on the values of
/// the environment variable P11ATTR_TRACE:
/// - stdout -> logs to standard output
/// - file -> any other value is interpreted as a file name to log into
/// - NOT PRESENT -> No tracing is initialized
///
/// If the logger initialization encounters an error, (for example the log
/// file can't be opened, or a logger is already installed) no tracing is
/// available and no error is reported.
///
/// The level comes from P11ATTR_TRACE_LEVEL, see [trace_level].
pub fn log_init() {
    let level = trace_level();
    match std::env::var(TRACE_ENV_VAR) {
        Err(_) => return,
        Ok(t) => match t.as_str() {
            "stdout" => {
                let _ = SimpleLogger::init(level, Config::default());
            }
            file_name => {
                let file = match File::create(file_name) {
                    Ok(w) => w,
                    Err(_) => return,
                };
                let _ = WriteLogger::init(level, Config::default(), file);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("warn"), LevelFilter::Warn);
        assert_eq!(parse_level("bogus"), LevelFilter::Trace);
    }

    #[test]
    #[serial]
    fn level_from_env() {
        std::env::remove_var(TRACE_LEVEL_ENV_VAR);
        assert_eq!(trace_level(), LevelFilter::Error);
        std::env::set_var(TRACE_LEVEL_ENV_VAR, "debug");
        assert_eq!(trace_level(), LevelFilter::Debug);
        std::env::remove_var(TRACE_LEVEL_ENV_VAR);
    }

    #[test]
    #[serial]
    fn init_without_destination() {
        std::env::remove_var(TRACE_ENV_VAR);
        log_init();
    }
}
