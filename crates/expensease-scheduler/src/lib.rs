//! Recurring-expense job: materialize due templates once per scheduled run.

mod materializer;
mod report;
mod schedule;

pub use materializer::{Materializer, RunError};
pub use report::{ReminderOutcome, RunReport, TemplateOutcome};
pub use schedule::{DailySchedule, ScheduleError};
