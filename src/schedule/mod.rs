//! When a rule applies: always, during focus sessions, or on a cron schedule.

pub mod cron;

pub use cron::{CronError, CronExpression};
use jiff::{Timestamp, tz::TimeZone};

use crate::rules::Schedule;

/// Schedule-level activity check. Enabled/disabled filtering is the
/// caller's concern; an unparseable persisted cron is never active.
pub fn is_active(schedule: &Schedule, now: Timestamp, has_active_session: bool, tz: &TimeZone) -> bool {
	match schedule {
		Schedule::Always => true,
		Schedule::FocusOnly => has_active_session,
		Schedule::Scheduled(cron) => cron.matches(now.to_zoned(tz.clone()).datetime()),
	}
}
