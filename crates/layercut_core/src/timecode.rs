use crate::error::{CoreError, Result};
use std::fmt;
use std::str::FromStr;

/// Characters that cannot appear in an output file name.
const ILLEGAL_TITLE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

// ---------------------------------------------------------------------------
// TimeFormat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// `01:01:01.456`
    #[default]
    HoursColon,
    /// `61:01.456`, minutes are not wrapped into hours.
    MinutesColon,
    /// `01-01-01.456`, safe for file names.
    HoursDash,
    /// `61-01.456`
    MinutesDash,
    /// `3661.456`
    Seconds,
    /// `010101.456`
    HoursCompact,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::HoursColon => "hh:mm:ss.sss",
            TimeFormat::MinutesColon => "mm:ss.sss",
            TimeFormat::HoursDash => "hh-mm-ss.sss",
            TimeFormat::MinutesDash => "mm-ss.sss",
            TimeFormat::Seconds => "ss.sss",
            TimeFormat::HoursCompact => "hhmmss.sss",
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hh:mm:ss.sss" => Ok(TimeFormat::HoursColon),
            "mm:ss.sss" => Ok(TimeFormat::MinutesColon),
            "hh-mm-ss.sss" => Ok(TimeFormat::HoursDash),
            "mm-ss.sss" => Ok(TimeFormat::MinutesDash),
            "ss.sss" => Ok(TimeFormat::Seconds),
            "hhmmss.sss" => Ok(TimeFormat::HoursCompact),
            other => Err(CoreError::InvalidOperation(format!(
                "unknown time format: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting / parsing
// ---------------------------------------------------------------------------

/// Render `seconds` with millisecond precision.
pub fn format_time(seconds: f64, format: TimeFormat) -> String {
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let ms = total_ms % 1_000;
    let total_secs = total_ms / 1_000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;
    let sign = if seconds < 0.0 && total_ms > 0 { "-" } else { "" };

    let body = match format {
        TimeFormat::HoursColon => format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}"),
        TimeFormat::MinutesColon => format!("{total_mins:02}:{secs:02}.{ms:03}"),
        TimeFormat::HoursDash => format!("{hours:02}-{mins:02}-{secs:02}.{ms:03}"),
        TimeFormat::MinutesDash => format!("{total_mins:02}-{secs:02}.{ms:03}"),
        TimeFormat::Seconds => format!("{total_secs}.{ms:03}"),
        TimeFormat::HoursCompact => format!("{hours:02}{mins:02}{secs:02}.{ms:03}"),
    };
    format!("{sign}{body}")
}

/// Parse `hh:mm:ss.sss`, `mm:ss.sss` or plain seconds.
pub fn parse_time(input: &str) -> Result<f64> {
    let invalid = || CoreError::InvalidTime(input.to_string());
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();

    let seconds = match parts.as_slice() {
        [secs] => parse_seconds(secs).ok_or_else(invalid)?,
        [mins, secs] => {
            let m: u64 = mins.trim().parse().map_err(|_| invalid())?;
            let s = parse_seconds(secs).ok_or_else(invalid)?;
            m as f64 * 60.0 + s
        }
        [hours, mins, secs] => {
            let h: u64 = hours.trim().parse().map_err(|_| invalid())?;
            let m: u64 = mins.trim().parse().map_err(|_| invalid())?;
            let s = parse_seconds(secs).ok_or_else(invalid)?;
            h as f64 * 3600.0 + m as f64 * 60.0 + s
        }
        _ => return Err(invalid()),
    };
    Ok(seconds)
}

fn parse_seconds(s: &str) -> Option<f64> {
    let value: f64 = s.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Strip surrounding whitespace and characters that are illegal in file
/// names.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .filter(|c| !ILLEGAL_TITLE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
