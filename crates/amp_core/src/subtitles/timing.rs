//! ASS time formatting.
//!
//! ASS uses centisecond precision (`H:MM:SS.CC`). Seconds are truncated,
//! not rounded, to centiseconds.

/// Guards against values like `1.15 * 100 = 114.999...`.
const CS_EPSILON: f64 = 1e-6;

/// Convert seconds to whole centiseconds, truncating. Negative and NaN
/// inputs become 0.
pub fn to_centiseconds(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 100.0 + CS_EPSILON).floor() as u64
}

/// Format seconds as an ASS timestamp (`H:MM:SS.CC`).
pub fn format_ass_time(seconds: f64) -> String {
    let cs = to_centiseconds(seconds);

    let centis = cs % 100;
    let total_secs = cs / 100;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, centis)
}
