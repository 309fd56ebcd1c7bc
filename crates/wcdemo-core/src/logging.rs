//! Diagnostic trace file.
//!
//! Errors never reach the rendered view, so a run can optionally keep a trace
//! of client events and state transitions next to the regular `log` output.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

/// Thread-safe handle to an append-only log file.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append `[timestamp] KIND: text` to the trace (no-op when disabled).
pub fn log_line(handle: &LogHandle, kind: &str, text: &str) {
    let Ok(mut guard) = handle.lock() else {
        return;
    };
    if let Some(file) = guard.as_mut() {
        let written = writeln!(file, "[{}] {}: {}", utc_timestamp(), kind, text)
            .and_then(|_| file.flush());
        if let Err(e) = written {
            log::debug!("Trace write failed: {}", e);
        }
    }
}

/// Append `value` as one line of JSON.
pub fn log_json<T: Serialize>(handle: &LogHandle, kind: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => log_line(handle, kind, &json),
        Err(e) => log::debug!("Cannot serialize {} trace entry: {}", kind, e),
    }
}

/// Open `{log_dir}/{name}.log` for appending. Without a directory, or if the
/// file cannot be opened, the handle is disabled.
pub fn open_log_file(log_dir: Option<&Path>, name: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        let path = dir.join(format!("{}.log", name));
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    Arc::new(Mutex::new(file))
}

/// A handle that discards everything.
pub fn disabled() -> LogHandle {
    Arc::new(Mutex::new(None))
}
