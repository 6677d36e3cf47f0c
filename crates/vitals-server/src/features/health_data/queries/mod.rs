//! Read-side queries over `health_data`
//!
//! Every query restricts rows to a trailing window of `days` days. Window bounds are compared
//! as RFC 3339 text, the form `start_date` is stored in.

pub mod series;
pub mod sleep;
pub mod summary;

use chrono::{Duration, SecondsFormat, Utc};

pub use series::{Aggregate, SeriesError, SeriesPoint, SeriesQuery};
pub use sleep::{SleepError, SleepQuery, SleepResponse};
pub use summary::{SummaryError, SummaryQuery, SummaryResponse};

/// Largest accepted window (about 100 years)
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Calendar day a measurement started on, in the offset it was recorded with
pub(crate) const DAY_EXPR: &str = "substr(start_date, 1, 10)";

pub const SLEEP_AWAKE: &str = "HKCategoryValueSleepAnalysisAwake";
pub const SLEEP_REM: &str = "HKCategoryValueSleepAnalysisAsleepREM";
pub const SLEEP_CORE: &str = "HKCategoryValueSleepAnalysisAsleepCore";
pub const SLEEP_DEEP: &str = "HKCategoryValueSleepAnalysisAsleepDeep";

/// Stages reported by the sleep chart
pub const SLEEP_STAGES: [&str; 4] = [SLEEP_AWAKE, SLEEP_REM, SLEEP_CORE, SLEEP_DEEP];

/// Stages counted as time asleep
pub const ASLEEP_STAGES: [&str; 3] = [SLEEP_DEEP, SLEEP_CORE, SLEEP_REM];

pub(crate) fn window_is_valid(days: i64) -> bool {
    (0..=MAX_WINDOW_DAYS).contains(&days)
}

/// Earliest `start_date` inside a window of `days` days ending now
pub(crate) fn window_start(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, false)
}
