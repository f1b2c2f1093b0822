/// Formats media seconds as `MM:SS`, or `H:MM:SS` past the first hour.
///
/// Negative and non-finite inputs render as zero. Fractions are truncated so
/// the label never runs ahead of the media clock.
///
/// # Example
/// ```
/// use player::format_timecode;
///
/// assert_eq!(format_timecode(75.9), "01:15");
/// assert_eq!(format_timecode(3_725.0), "1:02:05");
/// ```
pub fn format_timecode(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

fn whole_seconds(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    seconds.trunc() as u64
}

/// Replaces NaN and infinities with `fallback`.
pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
