//! Logger module
//!
//! Provides logging utilities for the function host including:
//! - Server lifecycle logging
//! - Access logging in several formats
//! - Function invocation logging
//! - Error and warning logging, optionally to files

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::LogLevel;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = config
        .logging
        .level
        .parse::<LogLevel>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write(level: LogLevel, message: &str) {
    if let Some(w) = writer::get() {
        w.write(level, message);
    } else if level <= LogLevel::Warn {
        eprintln!("{message}");
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, upstream: &str) {
    write(LogLevel::Info, "======================================");
    write(LogLevel::Info, "Function host started");
    write(LogLevel::Info, &format!("Listening on: http://{addr}"));
    write(
        LogLevel::Info,
        &format!(
            "Function '{}' mounted on {} (compose: {:?})",
            config.function.name, config.function.route, config.function.compose
        ),
    );
    write(LogLevel::Info, &format!("Upstream: GET {upstream}"));
    write(LogLevel::Info, &format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write(LogLevel::Info, &format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write(LogLevel::Info, &format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write(LogLevel::Info, &format!("Error log: {path}"));
    }
    write(LogLevel::Info, "======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write(LogLevel::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(
        LogLevel::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_info(message: &str) {
    write(LogLevel::Info, message);
}

pub fn log_debug(message: &str) {
    write(LogLevel::Debug, &format!("[DEBUG] {message}"));
}

pub fn log_error(message: &str) {
    write(LogLevel::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(LogLevel::Warn, &format!("[WARN] {message}"));
}

/// One line per function invocation
pub fn log_invocation(function: &str, id: u64, status: u16) {
    write(LogLevel::Info, &format_invocation(function, id, status));
}

/// Render the invocation line; any status below 500 is a handled outcome
pub fn format_invocation(function: &str, id: u64, status: u16) -> String {
    let outcome = if status < 500 { "Succeeded" } else { "Failed" };
    format!("[Function] Executed '{function}' ({outcome}, Id={id}, status={status})")
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_shutdown(active: usize) {
    write(
        LogLevel::Info,
        &format!("[Shutdown] Stopped accepting, {active} connection(s) in flight"),
    );
}
