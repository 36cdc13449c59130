//! ## Features
//!
//! - Standard logging levels (info, warn, error, debug, success, verbose)
//! - Multi-line message support with consistent prefixes
//! - Banner announcements for startup and shutdown
//! - All console output goes to stderr
//! - `journal` feature: JSONL journals for service logs and experiment events
//!
//! ## Usage
//!
//! Functions: `info()`, `warn()`, `error()`, `debug()`, `success()`, `verbose()`, `announce()`
//!
//! Macros take `format!` arguments: `bentley::info!("indexed {} passages", count);`

use colored::*;

#[cfg(feature = "journal")]
pub mod journal;

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn log_prefixed(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

pub fn verbose(message: &str) {
  log_prefixed(Color::Cyan, "verb", message);
}

/// Info level logging - general information
pub fn info(message: &str) {
  log_prefixed(Color::Blue, "info", message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  log_prefixed(Color::Yellow, "warn", message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  log_prefixed(Color::Red, "error", message);
}

/// Debug level logging - detailed diagnostic information
pub fn debug(message: &str) {
  log_prefixed(Color::Magenta, "debug", message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  log_prefixed(Color::Green, "sccs", message);
}

/// Banner announcement for lifecycle events (startup, shutdown)
pub fn announce(message: &str) {
  let banner = banner_line(50, '-');
  log(&banner.blue().bold().to_string());
  log(&message.blue().bold().to_string());
  log(&banner.blue().bold().to_string());
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    $crate::debug(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! announce {
  ($($arg:tt)*) => {
    $crate::announce(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_banner_line_repeats_character() {
    assert_eq!(banner_line(5, '='), "=====");
    assert_eq!(banner_line(0, '-'), "");
  }

  #[test]
  fn test_prefix_pads_to_fixed_width() {
    colored::control::set_override(false);
    assert_eq!(format_prefix(Color::Blue, "info"), "[info] ");
    assert_eq!(format_prefix(Color::Red, "error"), "[error]");
    colored::control::unset_override();
  }
}
