//! Calendar conversions between broken-down dates and unix seconds

use chrono::{Datelike, NaiveDate, Utc};

/// Broken-down time with fractional minutes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CivilTime {
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub hour: f64,
    pub minute: f64,
}

const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Seconds since 1970-01-01 for a calendar date plus hours and minutes
///
/// Hours may fall outside 0..24 (time-zone shifts); they simply add up.
pub fn civil_to_unix(year: f64, month: f64, day: f64, hour: f64, minute: f64) -> Option<f64> {
    if [year, month, day, hour, minute].iter().any(|v| v.is_nan()) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?;
    let days = i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE;
    Some(days as f64 * 86400.0 + 3600.0 * hour + 60.0 * minute)
}

/// Inverse of [`civil_to_unix`] with hours in 0..24
pub fn unix_to_civil(t: f64) -> Option<CivilTime> {
    if !t.is_finite() {
        return None;
    }
    let days = (t / 86400.0).floor();
    let seconds = t - days * 86400.0;
    let date = NaiveDate::from_num_days_from_ce_opt((days as i64 + UNIX_EPOCH_DAYS_FROM_CE) as i32)?;

    let total_minutes = (seconds / 60.0 * 1.0e6).round() / 1.0e6;
    let hour = (total_minutes / 60.0).floor();
    Some(CivilTime {
        year: f64::from(date.year()),
        month: f64::from(date.month()),
        day: f64::from(date.day()),
        hour,
        minute: total_minutes - 60.0 * hour,
    })
}

/// Decimal year for a unix time, as used by reference field models
pub fn time_to_fyear(t: f64) -> f64 {
    let Some(civil) = unix_to_civil(t) else {
        return f64::NAN;
    };
    let year = civil.year;
    let start = civil_to_unix(year, 1.0, 1.0, 0.0, 0.0);
    let end = civil_to_unix(year + 1.0, 1.0, 1.0, 0.0, 0.0);
    match (start, end) {
        (Some(s), Some(e)) => year + (t - s) / (e - s),
        _ => f64::NAN,
    }
}

/// Timestamp used in history attributes
pub fn history_stamp() -> String {
    Utc::now().format("%a %b %e %H:%M:%S %Y").to_string()
}
