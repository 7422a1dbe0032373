//! Recurrence frequencies and due-date advancement.
//!
//! Month and year increments keep the day-of-month and let it overflow into
//! the following month when the target month is shorter, so 31 January plus
//! one month lands on 2 or 3 March and 29 February plus one year lands on
//! 1 March. Time of day is preserved.

use std::fmt;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use tracing::warn;

/// Years added for a frequency nobody understands. Pushes the template far
/// enough out that it is never picked up again.
pub const UNRECOGNIZED_SKIP_YEARS: i32 = 100;

/// How often a recurring template produces an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Stored value that is not one of the known frequencies.
    Unrecognized(String),
}

impl Frequency {
    /// Parse a stored frequency string, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "quarterly" => Self::Quarterly,
            "yearly" => Self::Yearly,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => f.write_str("weekly"),
            Self::Monthly => f.write_str("monthly"),
            Self::Quarterly => f.write_str("quarterly"),
            Self::Yearly => f.write_str("yearly"),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Compute the next due date after `current` for the given frequency.
///
/// The result is always strictly later than `current`. An unrecognized
/// frequency is pushed [`UNRECOGNIZED_SKIP_YEARS`] into the future and logged.
pub fn advance_due_date(current: DateTime<Utc>, frequency: &Frequency) -> DateTime<Utc> {
    let next = match frequency {
        Frequency::Weekly => current.checked_add_days(Days::new(7)),
        Frequency::Monthly => add_months(current, 1),
        Frequency::Quarterly => add_months(current, 3),
        Frequency::Yearly => add_months(current, 12),
        Frequency::Unrecognized(raw) => {
            warn!(frequency = %raw, "unknown frequency, disabling future runs");
            add_months(current, UNRECOGNIZED_SKIP_YEARS * 12)
        }
    };
    // Only reachable at the very end of chrono's representable range.
    next.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Add calendar months, overflowing the day-of-month into the next month.
fn add_months(current: DateTime<Utc>, months: i32) -> Option<DateTime<Utc>> {
    let naive = current.naive_utc();
    let date = naive.date();

    let total = date.year().checked_mul(12)? + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let shifted = first.checked_add_days(Days::new(u64::from(date.day() - 1)))?;
    Some(shifted.and_time(naive.time()).and_utc())
}
