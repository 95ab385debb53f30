use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::datetime::DateContext;
use crate::task::Task;

/// Widest timeline a caller may ask for.
pub const MAX_GANTT_DAYS: u32 = 366;

/// `start`/`end` order the range; `start_day`/`end_day` are the calendar
/// days it covers, with bare `YYYY-MM-DD` inputs kept as written.
#[derive(Debug, Clone)]
pub struct NormalizedRange<'a> {
    pub task: &'a Task,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_day: NaiveDate,
    pub end_day: NaiveDate,
}

type Dated = (DateTime<Utc>, NaiveDate);

fn dated(raw: Option<&str>, ctx: &DateContext) -> Option<Dated> {
    let raw = raw?;
    Some((ctx.parse(raw)?, ctx.parse_date(raw)?))
}

/// Turns tasks into timeline ranges sorted by start.
///
/// start is the first parseable of `start_date`, `due_date`, `created_at`;
/// end is `due_date` when it parses, else start. Reversed windows are
/// swapped. Tasks with no usable date are left out. The sort is stable, so
/// equal starts keep their input order.
#[tracing::instrument(level = "debug", skip(tasks, ctx), fields(task_count = tasks.len()))]
pub fn normalize<'a>(tasks: &'a [Task], ctx: &DateContext) -> Vec<NormalizedRange<'a>> {
    let mut ranges: Vec<NormalizedRange<'a>> = tasks
        .iter()
        .filter_map(|task| {
            let due = dated(task.due_date.as_deref(), ctx);
            let Some(start) = dated(task.start_date.as_deref(), ctx)
                .or(due)
                .or_else(|| dated(Some(&task.created_at), ctx))
            else {
                debug!(task_id = task.id, "task has no usable date; left off the timeline");
                return None;
            };

            let end = due.unwrap_or(start);
            let (start, end) = if end.0 < start.0 { (end, start) } else { (start, end) };
            Some(NormalizedRange {
                task,
                start: start.0,
                end: end.0,
                start_day: start.1.min(end.1),
                end_day: start.1.max(end.1),
            })
        })
        .collect();

    ranges.sort_by_key(|range| range.start);
    ranges
}

/// Grid lines for a bar, 1-based with an exclusive end, as a CSS grid
/// would take them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpan {
    pub column_start: u32,
    pub column_end: u32,
}

impl GridSpan {
    pub fn span(&self) -> u32 {
        self.column_end - self.column_start
    }
}

/// A run of `day_count` visible calendar days starting at `first_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub first_day: NaiveDate,
    pub day_count: u32,
}

impl DayWindow {
    pub fn new(first_day: NaiveDate, day_count: u32) -> Self {
        Self { first_day, day_count }
    }

    /// Like [`DayWindow::new`], but rejects empty windows and ones wider
    /// than [`MAX_GANTT_DAYS`].
    pub fn try_new(first_day: NaiveDate, day_count: u32) -> anyhow::Result<Self> {
        if !(1..=MAX_GANTT_DAYS).contains(&day_count) {
            return Err(anyhow!(
                "window must be between 1 and {MAX_GANTT_DAYS} days, got {day_count}"
            ));
        }
        Ok(Self::new(first_day, day_count))
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let offset = self.day_count.checked_sub(1)?;
        self.first_day
            .checked_add_signed(Duration::days(i64::from(offset)))
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.day_count).filter_map(|offset| {
            self.first_day
                .checked_add_signed(Duration::days(i64::from(offset)))
        })
    }

    /// Clamps a range to the window; `None` when it falls entirely outside.
    pub fn clip(&self, range: &NormalizedRange<'_>) -> Option<GridSpan> {
        let last_day = self.last_day()?;
        let (start_day, end_day) = (range.start_day, range.end_day);

        if end_day < self.first_day || start_day > last_day {
            return None;
        }

        let from = start_day.max(self.first_day);
        let to = end_day.min(last_day);
        let offset = |day: NaiveDate| u32::try_from((day - self.first_day).num_days()).ok();

        Some(GridSpan {
            column_start: offset(from)? + 1,
            column_end: offset(to)? + 2,
        })
    }
}
