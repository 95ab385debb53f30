use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::datetime::{DateContext, parse_calendar_date};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyMode {
    #[default]
    DayOfMonth,
    Weekday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdayPosition {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl WeekdayPosition {
    fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
            Self::Fourth => "fourth",
            Self::Last => "last",
        }
    }

    /// Ordinal week of `date` inside its month; the fifth occurrence is "last".
    fn of_date(date: NaiveDate) -> Self {
        match (date.day() - 1) / 7 {
            0 => Self::First,
            1 => Self::Second,
            2 => Self::Third,
            3 => Self::Fourth,
            _ => Self::Last,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceWeekday {
    #[serde(alias = "mon")]
    Monday,
    #[serde(alias = "tue")]
    Tuesday,
    #[serde(alias = "wed")]
    Wednesday,
    #[serde(alias = "thu")]
    Thursday,
    #[serde(alias = "fri")]
    Friday,
    #[serde(alias = "sat")]
    Saturday,
    #[serde(alias = "sun")]
    Sunday,
}

impl RecurrenceWeekday {
    fn name(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for RecurrenceWeekday {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceEnds {
    #[default]
    Never,
    OnDate,
    AfterOccurrences,
}

/// How the next occurrence is anchored: the schedule itself, or the
/// completion of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceStrategy {
    #[default]
    Fixed,
    Rolling,
}

impl std::str::FromStr for RecurrenceStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "rolling" => Ok(Self::Rolling),
            other => Err(anyhow::anyhow!(
                "invalid recurrence strategy: {other} (expected fixed or rolling)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,

    #[serde(default = "default_interval")]
    pub interval: u32,

    #[serde(default)]
    pub weekdays: Vec<RecurrenceWeekday>,

    #[serde(default)]
    pub monthly_mode: MonthlyMode,

    #[serde(default)]
    pub day_of_month: Option<u32>,

    #[serde(default)]
    pub weekday_position: Option<WeekdayPosition>,

    #[serde(default)]
    pub weekday: Option<RecurrenceWeekday>,

    #[serde(default)]
    pub month: Option<u32>,

    #[serde(default)]
    pub ends: RecurrenceEnds,

    #[serde(default)]
    pub end_date: Option<String>,

    #[serde(default)]
    pub end_after_occurrences: Option<u32>,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            weekdays: vec![],
            monthly_mode: MonthlyMode::DayOfMonth,
            day_of_month: None,
            weekday_position: None,
            weekday: None,
            month: None,
            ends: RecurrenceEnds::Never,
            end_date: None,
            end_after_occurrences: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub reference_date: Option<NaiveDate>,
    pub strategy: RecurrenceStrategy,
    /// Calendar used to read `end_date` timestamps.
    pub tz: Tz,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            reference_date: None,
            strategy: RecurrenceStrategy::Fixed,
            tz: chrono_tz::UTC,
        }
    }
}

/// Renders a recurrence rule as a phrase such as
/// "Every 2 weeks on Monday, Friday, until Mar 1, 2026".
/// Returns `None` when there is no rule.
pub fn summarize(rule: Option<&RecurrenceRule>, options: &SummaryOptions) -> Option<String> {
    let rule = rule?;
    let mut out = cadence(rule.frequency, rule.interval.max(1));

    match rule.frequency {
        Frequency::Daily => {}
        Frequency::Weekly => {
            if let Some(days) = weekly_days(rule, options.reference_date) {
                out.push_str(" on ");
                out.push_str(&days);
            }
        }
        Frequency::Monthly => {
            if let Some(anchor) = monthly_anchor(rule, options.reference_date) {
                out.push_str(" on ");
                out.push_str(&anchor);
            }
        }
        Frequency::Yearly => {
            if let Some(anchor) = yearly_anchor(rule, options.reference_date) {
                out.push_str(" on ");
                out.push_str(&anchor);
            }
        }
    }

    match rule.ends {
        RecurrenceEnds::Never => {}
        RecurrenceEnds::OnDate => {
            if let Some(until) = rule
                .end_date
                .as_deref()
                .and_then(|raw| parse_calendar_date(raw, &options.tz))
            {
                out.push_str(&format!(", until {}", until.format("%b %-d, %Y")));
            }
        }
        RecurrenceEnds::AfterOccurrences => {
            if let Some(count) = rule.end_after_occurrences.filter(|n| *n > 0) {
                let noun = if count == 1 { "time" } else { "times" };
                out.push_str(&format!(", {count} {noun}"));
            }
        }
    }

    if options.strategy == RecurrenceStrategy::Rolling {
        out.push_str(" after completion");
    }

    Some(out)
}

/// Summary for a task's own rule, anchored on its due date (falling back to
/// start, then creation). The task's strategy wins over `default_strategy`.
pub fn summarize_task(
    task: &Task,
    ctx: &DateContext,
    default_strategy: RecurrenceStrategy,
) -> Option<String> {
    let rule = task.recurrence.as_ref()?;
    let reference_date = [
        task.due_date.as_deref(),
        task.start_date.as_deref(),
        Some(task.created_at.as_str()),
    ]
    .into_iter()
    .flatten()
    .find_map(|raw| ctx.parse_date(raw));

    summarize(
        Some(rule),
        &SummaryOptions {
            reference_date,
            strategy: task.recurrence_strategy.unwrap_or(default_strategy),
            tz: ctx.tz,
        },
    )
}

fn cadence(frequency: Frequency, interval: u32) -> String {
    let unit = match frequency {
        Frequency::Daily => "day",
        Frequency::Weekly => "week",
        Frequency::Monthly => "month",
        Frequency::Yearly => "year",
    };
    if interval == 1 {
        format!("Every {unit}")
    } else {
        format!("Every {interval} {unit}s")
    }
}

fn weekly_days(rule: &RecurrenceRule, reference: Option<NaiveDate>) -> Option<String> {
    let mut days = rule.weekdays.clone();
    if days.is_empty() {
        days.push(reference?.weekday().into());
    }
    days.sort_by_key(|day| *day as u8);
    days.dedup();

    Some(
        days.iter()
            .map(RecurrenceWeekday::name)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn positional_weekday(rule: &RecurrenceRule, reference: Option<NaiveDate>) -> Option<String> {
    let position = rule
        .weekday_position
        .or_else(|| reference.map(WeekdayPosition::of_date))?;
    let weekday = rule
        .weekday
        .or_else(|| reference.map(|date| date.weekday().into()))?;
    Some(format!("the {} {}", position.as_str(), weekday.name()))
}

fn monthly_anchor(rule: &RecurrenceRule, reference: Option<NaiveDate>) -> Option<String> {
    match rule.monthly_mode {
        MonthlyMode::DayOfMonth => {
            let day = valid_day(rule.day_of_month).or_else(|| reference.map(|d| d.day()))?;
            Some(format!("day {day}"))
        }
        MonthlyMode::Weekday => positional_weekday(rule, reference),
    }
}

fn yearly_anchor(rule: &RecurrenceRule, reference: Option<NaiveDate>) -> Option<String> {
    let month = rule
        .month
        .filter(|m| (1..=12).contains(m))
        .or_else(|| reference.map(|d| d.month()))?;
    let month_name = month_name(month)?;

    match rule.monthly_mode {
        MonthlyMode::DayOfMonth => {
            let day = valid_day(rule.day_of_month).or_else(|| reference.map(|d| d.day()))?;
            Some(format!("{month_name} {day}"))
        }
        MonthlyMode::Weekday => {
            let weekday = positional_weekday(rule, reference)?;
            Some(format!("{weekday} of {month_name}"))
        }
    }
}

fn valid_day(day: Option<u32>) -> Option<u32> {
    day.filter(|d| (1..=31).contains(d))
}

fn month_name(month: u32) -> Option<&'static str> {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    NAMES.get(month.checked_sub(1)? as usize).copied()
}

impl fmt::Display for RecurrenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Rolling => f.write_str("rolling"),
        }
    }
}
