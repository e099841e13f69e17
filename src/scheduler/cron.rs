// src/scheduler/cron.rs
//! Five-field cron expressions evaluated in a fixed IANA timezone.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    #[error("invalid cron expression '{expr}': {reason}")]
    Invalid { expr: String, reason: String },
    #[error("cron expression '{0}' has no matching time within 8 years")]
    NoMatch(String),
}

/// Parsed "min hour dom month dow" schedule.
///
/// Supported tokens per field:
/// - `*` all values
/// - `*/N` and `A-B/N` steps
/// - `A-B` inclusive range
/// - `A,B,C` list
///
/// Day-of-week is 0-6 from Sunday (7 is accepted as Sunday). When both
/// day fields are restricted a time matches if either one does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    min: u32,
    max: u32,
    allowed: Vec<bool>,
    restricted: bool,
}

impl Field {
    fn new(min: u32, max: u32) -> Self {
        let size = (max - min + 1) as usize;
        Self {
            min,
            max,
            allowed: vec![false; size],
            restricted: true,
        }
    }

    fn set(&mut self, v: u32) -> Result<(), String> {
        if v < self.min || v > self.max {
            return Err(format!(
                "value {v} out of range {}..={}",
                self.min, self.max
            ));
        }
        self.allowed[(v - self.min) as usize] = true;
        Ok(())
    }

    fn matches(&self, v: u32) -> bool {
        v >= self.min && v <= self.max && self.allowed[(v - self.min) as usize]
    }
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let invalid = |reason: String| CronError::Invalid {
            expr: expr.to_string(),
            reason,
        };
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(invalid(
                "expected 5 fields: min hour dom month dow".to_string(),
            ));
        }

        let mut day_of_week = parse_field(parts[4], 0, 7).map_err(invalid)?;
        // Fold 7 onto Sunday.
        if day_of_week.allowed[7] {
            day_of_week.allowed[0] = true;
        }

        Ok(Self {
            source: expr.trim().to_string(),
            minute: parse_field(parts[0], 0, 59).map_err(invalid)?,
            hour: parse_field(parts[1], 0, 23).map_err(invalid)?,
            day_of_month: parse_field(parts[2], 1, 31).map_err(invalid)?,
            month: parse_field(parts[3], 1, 12).map_err(invalid)?,
            day_of_week,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the local wall-clock time of `t` in `tz` matches.
    pub fn matches(&self, t: DateTime<Utc>, tz: Tz) -> bool {
        let local = t.with_timezone(&tz);
        self.minute.matches(local.minute())
            && self.hour.matches(local.hour())
            && self.date_matches(&local)
    }

    fn date_matches(&self, local: &DateTime<Tz>) -> bool {
        let dom = self.day_of_month.matches(local.day());
        let dow = self
            .day_of_week
            .matches(local.weekday().num_days_from_sunday());
        let day = if self.day_of_month.restricted && self.day_of_week.restricted {
            dom || dow
        } else {
            dom && dow
        };
        self.month.matches(local.month()) && day
    }

    /// First matching minute strictly after `after`.
    ///
    /// Local times skipped by a DST change never fire; repeated ones fire twice.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, CronError> {
        let mut t = after + ChronoDuration::minutes(1);
        t = t
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(t);

        // Long enough for Feb 29 across a skipped century leap year.
        let horizon = after + ChronoDuration::days(8 * 366 + 1);
        while t <= horizon {
            let local = t.with_timezone(&tz);
            if !self.date_matches(&local) {
                // Jump most of the way to local midnight; the last two hours are
                // walked so a DST shift cannot carry us past the next day's start.
                let left = i64::from(24 * 60 - (local.hour() * 60 + local.minute()));
                t += ChronoDuration::minutes((left - 120).max(1));
                continue;
            }
            if self.minute.matches(local.minute()) && self.hour.matches(local.hour()) {
                return Ok(t);
            }
            t += ChronoDuration::minutes(1);
        }
        Err(CronError::NoMatch(self.source.clone()))
    }
}

fn parse_field(token: &str, min: u32, max: u32) -> Result<Field, String> {
    let mut f = Field::new(min, max);
    if token == "*" {
        f.allowed.iter_mut().for_each(|a| *a = true);
        f.restricted = false;
        return Ok(f);
    }

    let num = |s: &str| -> Result<u32, String> {
        s.parse::<u32>()
            .map_err(|_| format!("invalid number '{s}'"))
    };

    for part in token.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err("empty field token".to_string());
        }
        let (range, step) = match part.split_once('/') {
            Some((r, s)) => {
                let n = num(s)?;
                if n == 0 {
                    return Err("step must be > 0".to_string());
                }
                (r, n)
            }
            None => (part, 1),
        };
        let (start, end) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            let (a, b) = (num(a)?, num(b)?);
            if a > b {
                return Err(format!("range start {a} > end {b}"));
            }
            (a, b)
        } else {
            let v = num(range)?;
            // "5/15" means from 5 to the end in steps of 15.
            if step > 1 {
                (v, max)
            } else {
                (v, v)
            }
        };
        let mut v = start;
        while v <= end {
            f.set(v)?;
            v += step;
        }
    }
    Ok(f)
}
