// src/logging.rs
// Timestamped console logging for the bingo client.
// Debug lines are only printed once verbose output is switched on.

use chrono::Local;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Print debug lines too (`verbose = true` in conf/client.conf or `--verbose`)
pub fn set_verbose(enabled: bool) {
    let level = if enabled { LogLevel::Debug } else { LogLevel::Info };
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

fn enabled(level: LogLevel) -> bool {
    level as u8 >= MIN_LEVEL.load(Ordering::Relaxed)
}

/// "YYYY-MM-DD HH:MM:SS - LEVEL - message"
fn format_line(level: LogLevel, message: &str) -> String {
    format!("{} - {level} - {message}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

pub fn log_message(level: LogLevel, message: &str) {
    if enabled(level) {
        println!("{}", format_line(level, message));
    }
}

pub fn log_debug(message: &str) {
    log_message(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_message(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_message(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_message(LogLevel::Error, message);
}

/// Errors that must not be lost under a redrawn screen
pub fn log_error_stderr(message: &str) {
    eprintln!("{}", format_line(LogLevel::Error, message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let line = format_line(LogLevel::Warning, "audio declined");
        assert!(line.ends_with(" - WARNING - audio declined"));
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(line.find(" - "), Some(19));
    }

    #[test]
    fn test_levels() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(enabled(LogLevel::Error));
        assert_eq!(LogLevel::Info.to_string(), "INFO");
    }
}
