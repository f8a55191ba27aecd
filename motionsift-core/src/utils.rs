//! Utility functions for formatting and path handling.

use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::time::Duration;

/// Formats a duration as HH:MM:SS (e.g., 3725s -> "01:02:05").
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Extracts the file stem used to name the per-file output directory.
pub fn file_stem_safe(path: &Path) -> CoreResult<String> {
    Ok(path
        .file_stem()
        .ok_or_else(|| {
            CoreError::PathError(format!("Failed to get file stem for {}", path.display()))
        })?
        .to_string_lossy()
        .to_string())
}

/// Extracts the file name for log messages.
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
