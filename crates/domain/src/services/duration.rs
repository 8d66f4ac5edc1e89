//! Bounded auto-revoke durations.
//!
//! The accepted grammar is a deliberately narrow ISO-8601 subset:
//! `P{days}D`, `PT{hours}H` or `P{days}DT{hours}H`, each component one or two
//! digits. Anything else, including three-digit components, is a format error.

use chrono::{DateTime, Days, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use shared::error::AppError;

lazy_static! {
    static ref DURATION_REGEX: Regex =
        Regex::new(r"^P(?:(\d{1,2})D)?(?:T(\d{1,2})H)?$").unwrap();
}

/// A parsed auto-revoke duration. Days dominate ordering; hours break ties
/// only at equal days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevokeDuration {
    days: u32,
    hours: u32,
}

impl RevokeDuration {
    /// Parses the bounded duration grammar. Rejects out-of-width components
    /// (`P100D`) as format errors rather than range errors.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let captures = DURATION_REGEX
            .captures(value)
            .ok_or_else(|| AppError::bad_request("Invalid Duration format"))?;

        let days = captures.get(1);
        let hours = captures.get(2);
        if days.is_none() && hours.is_none() {
            return Err(AppError::bad_request("Invalid Duration format"));
        }

        let parse_component = |m: Option<regex::Match<'_>>| -> Result<u32, AppError> {
            m.map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map_err(|_| AppError::bad_request("Invalid Duration format"))
                .map(|v| v.unwrap_or(0))
        };

        Ok(Self {
            days: parse_component(days)?,
            hours: parse_component(hours)?,
        })
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Instant at which the scheduled revoke fires: calendar days first, then
    /// hours. Saturates at the end of the calendar.
    pub fn fire_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_days(Days::new(u64::from(self.days)))
            .and_then(|t| t.checked_add_signed(Duration::hours(i64::from(self.hours))))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl std::fmt::Display for RevokeDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.days, self.hours) {
            (d, 0) => write!(f, "P{d}D"),
            (0, h) => write!(f, "PT{h}H"),
            (d, h) => write!(f, "P{d}DT{h}H"),
        }
    }
}

/// Parses `duration` and checks it against the flow's `max_duration`.
///
/// A duration is over the limit when it has more days than the maximum, or
/// the same days and more hours. Equal durations pass.
pub fn ensure_within_limit(duration: &str, max_duration: &str) -> Result<RevokeDuration, AppError> {
    let requested = RevokeDuration::parse(duration)?;
    let max = RevokeDuration::parse(max_duration)
        .map_err(|_| AppError::bad_request("Invalid maxDuration format"))?;

    let exceeds = requested.days > max.days
        || (requested.days == max.days && requested.hours > max.hours);
    if exceeds {
        return Err(AppError::bad_request("exceeds maxDuration limits"));
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_days_only() {
        let duration = RevokeDuration::parse("P5D").unwrap();
        assert_eq!((duration.days(), duration.hours()), (5, 0));
    }

    #[test]
    fn test_parse_hours_only() {
        let duration = RevokeDuration::parse("PT8H").unwrap();
        assert_eq!((duration.days(), duration.hours()), (0, 8));
    }

    #[test]
    fn test_parse_days_and_hours() {
        let duration = RevokeDuration::parse("P3DT12H").unwrap();
        assert_eq!((duration.days(), duration.hours()), (3, 12));
    }

    #[test]
    fn test_parse_two_digit_bounds() {
        assert!(RevokeDuration::parse("P99D").is_ok());
        assert!(RevokeDuration::parse("PT99H").is_ok());
        assert!(RevokeDuration::parse("P99DT99H").is_ok());
    }

    #[test]
    fn test_parse_rejects_three_digit_components() {
        // Width is part of the grammar; these are format errors.
        for input in ["P100D", "PT100H", "P100DT1H"] {
            let err = RevokeDuration::parse(input).unwrap_err();
            assert_eq!(err.system_message(), "Invalid Duration format");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_inputs() {
        for input in ["", "P", "PT", "10 days", "P5H", "T8H", "p5d", "P5DT", "P5D8H", "P-5D"] {
            assert!(
                RevokeDuration::parse(input).is_err(),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_limit_allows_smaller_and_equal() {
        assert!(ensure_within_limit("P5D", "P30D").is_ok());
        assert!(ensure_within_limit("P30D", "P30D").is_ok());
        assert!(ensure_within_limit("PT8H", "P1D").is_ok());
        assert!(ensure_within_limit("P1DT23H", "P2D").is_ok());
    }

    #[test]
    fn test_limit_days_dominate() {
        let err = ensure_within_limit("P2D", "P1DT23H").unwrap_err();
        assert_eq!(err.system_message(), "exceeds maxDuration limits");
        assert!(ensure_within_limit("P1DT23H", "P2D").is_ok());
    }

    #[test]
    fn test_limit_hours_tiebreak_at_equal_days() {
        let err = ensure_within_limit("P30DT1H", "P30D").unwrap_err();
        assert_eq!(err.system_message(), "exceeds maxDuration limits");
        assert!(ensure_within_limit("P30D", "P30DT1H").is_ok());
    }

    #[test]
    fn test_limit_spec_vectors() {
        assert!(ensure_within_limit("P15D", "P30D").is_ok());
        assert!(ensure_within_limit("P30D", "P30D").is_ok());
        assert!(ensure_within_limit("P31D", "P30D").is_err());
        assert!(ensure_within_limit("P30DT1H", "P30D").is_err());
    }

    #[test]
    fn test_limit_invalid_max_message() {
        let err = ensure_within_limit("P5D", "thirty days").unwrap_err();
        assert_eq!(err.system_message(), "Invalid maxDuration format");
    }

    #[test]
    fn test_limit_invalid_duration_message() {
        let err = ensure_within_limit("five days", "P30D").unwrap_err();
        assert_eq!(err.system_message(), "Invalid Duration format");
    }

    #[test]
    fn test_fire_time_days() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let fire = RevokeDuration::parse("P5D").unwrap().fire_time(now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2023, 1, 6, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_fire_time_hours() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let fire = RevokeDuration::parse("PT8H").unwrap().fire_time(now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2023, 1, 1, 20, 0, 0).unwrap());
    }

    #[test]
    fn test_fire_time_days_then_hours() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let fire = RevokeDuration::parse("P3DT12H").unwrap().fire_time(now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2023, 1, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_fire_time_crosses_month_boundary() {
        let now = Utc.with_ymd_and_hms(2023, 1, 30, 6, 0, 0).unwrap();
        let fire = RevokeDuration::parse("P5D").unwrap().fire_time(now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2023, 2, 4, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_display_round_trips() {
        for input in ["P5D", "PT8H", "P3DT12H"] {
            let duration = RevokeDuration::parse(input).unwrap();
            assert_eq!(duration.to_string(), input);
        }
    }
}
