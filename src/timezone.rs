//! App timezone handling
//!
//! Pipelines store an app's reporting timezone either as a UTC offset
//! (`+08:00`) or as an IANA name (`Asia/Shanghai`). Day boundaries in the
//! generated SQL and in the simulator are evaluated in that timezone.

use crate::error::{AttributionError, Result};
use chrono::{DateTime, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppTimezone {
    /// Fixed offset east of UTC, in minutes
    Offset(i32),
    Named(Tz),
}

fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:UTC|GMT)?([+-])(\d{1,2})(?::?(\d{2}))?$").expect("offset pattern is valid")
    })
}

impl AppTimezone {
    pub fn utc() -> Self {
        AppTimezone::Offset(0)
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("utc") || value == "Z" {
            return Ok(AppTimezone::utc());
        }

        if let Some(caps) = offset_pattern().captures(value) {
            let sign = if &caps[1] == "-" { -1 } else { 1 };
            let hours: i32 = caps[2]
                .parse()
                .map_err(|_| AttributionError::Validation(format!("Invalid timezone: {}", value)))?;
            let minutes: i32 = caps
                .get(3)
                .map(|m| m.as_str().parse().unwrap_or(60))
                .unwrap_or(0);
            if hours > 14 || minutes >= 60 {
                return Err(AttributionError::Validation(format!(
                    "Timezone offset out of range: {}",
                    value
                )));
            }
            return Ok(AppTimezone::Offset(sign * (hours * 60 + minutes)));
        }

        value
            .parse::<Tz>()
            .map(AppTimezone::Named)
            .map_err(|_| AttributionError::Validation(format!("Unknown timezone: {}", value)))
    }

    /// SQL expression converting a UTC timestamp expression to local time.
    pub fn local_time_sql(&self, utc_expr: &str) -> String {
        match self {
            AppTimezone::Offset(0) => utc_expr.to_string(),
            AppTimezone::Offset(minutes) => format!("DATEADD(MINUTE, {}, {})", minutes, utc_expr),
            AppTimezone::Named(tz) => format!("CONVERT_TIMEZONE('{}', {})", tz.name(), utc_expr),
        }
    }

    /// Local wall-clock time of a UTC instant.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            AppTimezone::Offset(minutes) => {
                instant.naive_utc() + chrono::Duration::minutes(i64::from(*minutes))
            }
            AppTimezone::Named(tz) => {
                let offset = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
                instant.naive_utc() + chrono::Duration::seconds(i64::from(offset.local_minus_utc()))
            }
        }
    }
}

impl fmt::Display for AppTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppTimezone::Offset(minutes) => {
                let sign = if *minutes < 0 { '-' } else { '+' };
                let abs = minutes.abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
            }
            AppTimezone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}
