//! Cron rules and the backfill evaluator.
//!
//! Rules use the standard 5-field syntax (`minute hour day-of-month month
//! day-of-week`). They are translated to the 7-field format of the `cron`
//! crate, which adds a seconds and a year field and numbers weekdays 1-7
//! starting on Sunday.

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;

/// Errors produced while parsing a recurrence rule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Expected 5 cron fields, found {0}")]
    FieldCount(usize),

    #[error("Invalid day-of-week value: {0}")]
    DayOfWeek(String),

    #[error("Invalid cron expression '{expression}': {message}")]
    Parse { expression: String, message: String },
}

/// A parsed recurrence rule with minute resolution.
#[derive(Debug, Clone)]
pub struct JobSchedule {
    expression: String,
    /// One schedule, or two when both day fields are restricted
    /// (standard cron fires when either day field matches).
    schedules: Vec<Schedule>,
}

impl JobSchedule {
    /// Parse a standard 5-field cron expression.
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };
        let weekdays = normalize_day_of_week(day_of_week)?;

        let variants = if is_unrestricted(day_of_month) || is_unrestricted(day_of_week) {
            vec![format!(
                "0 {minute} {hour} {day_of_month} {month} {weekdays} *"
            )]
        } else {
            vec![
                format!("0 {minute} {hour} {day_of_month} {month} * *"),
                format!("0 {minute} {hour} * {month} {weekdays} *"),
            ]
        };

        let schedules = variants
            .iter()
            .map(|variant| {
                Schedule::from_str(variant).map_err(|e| ScheduleError::Parse {
                    expression: expression.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression: fields.join(" "),
            schedules,
        })
    }

    /// The rule as written, with whitespace normalized.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First occurrence strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(after).next())
            .min()
    }

    /// Every occurrence in `(last, upper]`, oldest first.
    ///
    /// Starting from `last`, the next occurrence strictly after the cursor is
    /// taken until one falls after `upper`. Missed occurrences between two
    /// scheduler ticks are therefore all returned (backfill).
    pub fn due_instants(&self, last: DateTime<Utc>, upper: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut due = Vec::new();
        let mut cursor = last;
        while let Some(next) = self.next_after(&cursor) {
            if next > upper {
                break;
            }
            due.push(next);
            cursor = next;
        }
        due
    }
}

impl FromStr for JobSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobSchedule::parse(s)
    }
}

fn is_unrestricted(field: &str) -> bool {
    field.starts_with('*') || field.starts_with('?')
}

/// Rewrite numeric weekdays (0-7, Sunday = 0 or 7) into the 1-7 numbering
/// of the `cron` crate. Named days pass through unchanged.
fn normalize_day_of_week(field: &str) -> Result<String, ScheduleError> {
    if matches!(field, "*" | "?") {
        return Ok(field.to_string());
    }

    let mut names = Vec::new();
    let mut days = BTreeSet::new();

    for item in field.split(',') {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            names.push(item.to_string());
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step
                    .parse()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| ScheduleError::DayOfWeek(item.to_string()))?;
                (range, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((from, to)) = range.split_once('-') {
            (day_number(from, item)?, day_number(to, item)?)
        } else {
            let day = day_number(range, item)?;
            (day, if step.is_some() { 6 } else { day })
        };
        if start > end {
            return Err(ScheduleError::DayOfWeek(item.to_string()));
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days.insert(day % 7 + 1);
        }
    }

    let mut parts: Vec<String> = days.iter().map(|d| d.to_string()).collect();
    parts.extend(names);
    Ok(parts.join(","))
}

fn day_number(value: &str, item: &str) -> Result<u32, ScheduleError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|day| *day <= 7)
        .ok_or_else(|| ScheduleError::DayOfWeek(item.to_string()))
}
