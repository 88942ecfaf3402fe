//! crates/vidnotes_core/src/timecode.rs
//!
//! Formatting of playback positions for display.

/// Formats a playback position as `M:SS`, switching to `H:MM:SS` once the
/// floored value reaches a full hour. Negative and NaN inputs clamp to 0.
pub fn format_timestamp(total_seconds: f64) -> String {
    let safe = if total_seconds.is_finite() {
        total_seconds.max(0.0).floor() as u64
    } else {
        0
    };

    let h = safe / 3600;
    let m = (safe % 3600) / 60;
    let s = safe % 60;

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
