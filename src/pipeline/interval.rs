use chrono::NaiveDateTime;
use serde::Serialize;

use crate::constants::{HOURS_UNIT, INTERVAL_ERROR_LABEL, MINUTES_UNIT};

/// Elapsed time between a before/after pair.
///
/// `minutes` is only set when both timestamps exist and are in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalResult {
    pub minutes: Option<i64>,
    pub label: String,
}

impl IntervalResult {
    fn unknown() -> Self {
        Self { minutes: None, label: String::new() }
    }

    fn inverted() -> Self {
        Self { minutes: None, label: INTERVAL_ERROR_LABEL.to_string() }
    }

    pub fn is_inverted(&self) -> bool {
        self.minutes.is_none() && self.label == INTERVAL_ERROR_LABEL
    }
}

/// Whole minutes from `before` to `after`, floored (119 seconds is 1 minute)
pub fn compute_interval(before: Option<NaiveDateTime>, after: Option<NaiveDateTime>) -> IntervalResult {
    let (Some(before), Some(after)) = (before, after) else {
        return IntervalResult::unknown();
    };
    let minutes = (after - before).num_seconds().div_euclid(60);
    if minutes < 0 {
        return IntervalResult::inverted();
    }
    IntervalResult { minutes: Some(minutes), label: format_interval(minutes) }
}

/// "45 мин", "2 ч" or "1 ч 25 мин"
pub fn format_interval(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{} {}", minutes, MINUTES_UNIT);
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{} {}", hours, HOURS_UNIT)
    } else {
        format!("{} {} {} {}", hours, HOURS_UNIT, rest, MINUTES_UNIT)
    }
}
