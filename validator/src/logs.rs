//! Progress logging for mining and validation runs.
//!
//! Lines go to stderr; stdout is reserved for command output. Quiet mode
//! drops the info and success lines and keeps warnings and errors.

use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Success => "✓ ",
            Self::Warning => "⚠️  ",
            Self::Error => "❌ ",
        }
    }

    /// Whether the level is still printed in quiet mode.
    pub fn is_problem(self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

/// Silence info and success lines for the rest of the process.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// One log line; `depth` nests sheet and rule steps under a run.
pub fn format_line(level: LogLevel, message: &str, depth: usize) -> String {
    format!("{}{}{}", "   ".repeat(depth + 1), level.marker(), message)
}

fn emit(level: LogLevel, message: &str, depth: usize) {
    if is_quiet() && !level.is_problem() {
        return;
    }
    eprintln!("{}", format_line(level, message, depth));
}

pub fn log_info(msg: impl AsRef<str>) {
    emit(LogLevel::Info, msg.as_ref(), 0);
}

pub fn log_success(msg: impl AsRef<str>) {
    emit(LogLevel::Success, msg.as_ref(), 0);
}

pub fn log_warning(msg: impl AsRef<str>) {
    emit(LogLevel::Warning, msg.as_ref(), 0);
}

pub fn log_error(msg: impl AsRef<str>) {
    emit(LogLevel::Error, msg.as_ref(), 0);
}

pub fn log_info_indent(msg: impl AsRef<str>, depth: usize) {
    emit(LogLevel::Info, msg.as_ref(), depth);
}

pub fn log_warning_indent(msg: impl AsRef<str>, depth: usize) {
    emit(LogLevel::Warning, msg.as_ref(), depth);
}
