//! Human-readable time formatting for timer displays
//!
//! Countdown and elapsed readouts use `M:SS` below one hour and `H:MM:SS`
//! from one hour on.

/// Seconds in one hour; switch point between the two display formats
const LONG_FORMAT_MIN: u64 = 3600;

/// Format whole seconds as a timer readout.
///
/// # Examples
///
/// ```
/// use wtp_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0), "0:00");
/// assert_eq!(format_clock(65), "1:05");
/// assert_eq!(format_clock(183), "3:03");
/// assert_eq!(format_clock(3661), "1:01:01");
/// ```
pub fn format_clock(seconds: u64) -> String {
    if seconds < LONG_FORMAT_MIN {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        let secs = seconds % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}
