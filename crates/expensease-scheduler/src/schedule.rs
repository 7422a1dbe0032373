//! Once-a-day trigger.

use std::str::FromStr;

use chrono::{DateTime, Days, NaiveTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid time of day '{0}', expected HH:MM")]
pub struct ScheduleError(pub String);

/// Fires once per day at a fixed UTC time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl Default for DailySchedule {
    /// 01:00 UTC.
    fn default() -> Self {
        Self {
            at: NaiveTime::from_hms_opt(1, 0, 0).unwrap_or_default(),
        }
    }
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// The first firing instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            today.checked_add_days(Days::new(1)).unwrap_or(DateTime::<Utc>::MAX_UTC)
        }
    }
}

impl FromStr for DailySchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| ScheduleError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_is_one_am() {
        assert_eq!(
            DailySchedule::default().at(),
            NaiveTime::from_hms_opt(1, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_hh_mm() {
        let s: DailySchedule = "06:30".parse().unwrap();
        assert_eq!(s.at(), NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert!("25:00".parse::<DailySchedule>().is_err());
        assert!("noon".parse::<DailySchedule>().is_err());
    }

    #[test]
    fn next_is_later_today_before_fire_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 30, 0).unwrap();
        assert_eq!(
            DailySchedule::default().next_after(now),
            Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_is_tomorrow_at_or_after_fire_time() {
        let at_fire = Utc.with_ymd_and_hms(2024, 1, 31, 1, 0, 0).unwrap();
        assert_eq!(
            DailySchedule::default().next_after(at_fire),
            Utc.with_ymd_and_hms(2024, 2, 1, 1, 0, 0).unwrap()
        );
        let evening = Utc.with_ymd_and_hms(2024, 12, 31, 22, 0, 0).unwrap();
        assert_eq!(
            DailySchedule::default().next_after(evening),
            Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap()
        );
    }
}
