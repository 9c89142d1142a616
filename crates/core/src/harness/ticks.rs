//! Tick sources driving the repeated-job coordinator.

use async_trait::async_trait;
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule expression '{expression}': {message}")]
    Invalid { expression: String, message: String },
}

/// Something that fires periodically.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick. `None` means the source will never fire again.
    async fn next_tick(&mut self) -> Option<()>;
}

/// Parse a cron expression, accepting the standard five-field form.
///
/// The `cron` crate wants a leading seconds field, so five-field inputs get
/// `0` prepended and fire at the top of the matching minute. Their
/// day-of-week field uses standard numbering (Sunday is `0` or `7`) and is
/// rewritten into day names, since the crate counts Sunday as `1`.
pub fn parse_schedule(expression: &str) -> Result<Schedule, ScheduleError> {
    let trimmed = expression.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let normalized = if fields.len() == 5 {
        format!(
            "0 {} {}",
            fields[..4].join(" "),
            day_of_week_names(fields[4])
        )
    } else {
        trimmed.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| ScheduleError::Invalid {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

fn day_of_week_names(field: &str) -> String {
    field
        .split(',')
        .map(day_of_week_item)
        .collect::<Vec<_>>()
        .join(",")
}

/// One list item of a standard day-of-week field. Items that are not purely
/// numeric (names, `*`, `?`) or are out of range pass through unchanged.
fn day_of_week_item(item: &str) -> String {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };
    let step = match step.map(str::parse::<usize>) {
        None => 1,
        Some(Ok(step)) if step > 0 => step,
        Some(_) => return item.to_string(),
    };
    let has_step = item.contains('/');

    let bounds = if base == "*" {
        has_step.then_some((0, 6))
    } else if let Some((start, end)) = base.split_once('-') {
        start.parse::<usize>().ok().zip(end.parse::<usize>().ok())
    } else {
        base.parse::<usize>()
            .ok()
            .map(|day| (day, if has_step { 6 } else { day }))
    };

    match bounds {
        Some((start, end)) if start <= end && end <= 7 => {
            let mut days: Vec<&str> = Vec::new();
            for day in (start..=end).step_by(step) {
                let name = DAY_NAMES[day % 7];
                if !days.contains(&name) {
                    days.push(name);
                }
            }
            days.join(",")
        }
        _ => item.to_string(),
    }
}

/// Ticks at each upcoming time of a cron schedule.
pub struct CronTicks {
    schedule: Schedule,
}

impl CronTicks {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        parse_schedule(expression).map(Self::new)
    }
}

#[async_trait]
impl TickSource for CronTicks {
    async fn next_tick(&mut self) -> Option<()> {
        let next = self.schedule.upcoming(Utc).next()?;
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;
        Some(())
    }
}

/// Ticks on a fixed period; the first tick arrives one period after creation.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> Option<()> {
        self.interval.tick().await;
        Some(())
    }
}
