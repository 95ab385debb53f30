use std::collections::HashMap;
use std::fmt;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::datetime::DateContext;
use crate::task::Task;

const WEEK_HORIZON_DAYS: i64 = 7;
const MONTH_HORIZON_DAYS: i64 = 30;

/// Date buckets in precedence order;
/// `Ord` follows declaration order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DateStatusKey {
  Overdue,
  Today,
  ThisWeek,
  ThisMonth,
  Later
}

impl DateStatusKey {
  pub const ALL: [Self; 5] = [
    Self::Overdue,
    Self::Today,
    Self::ThisWeek,
    Self::ThisMonth,
    Self::Later
  ];

  #[must_use]
  pub fn as_str(&self) -> &'static str {
    match self {
      | Self::Overdue => "overdue",
      | Self::Today => "today",
      | Self::ThisWeek => "this_week",
      | Self::ThisMonth => "this_month",
      | Self::Later => "later"
    }
  }

  #[must_use]
  pub fn label(&self) -> &'static str {
    match self {
      | Self::Overdue => "Overdue",
      | Self::Today => "Today",
      | Self::ThisWeek => "This week",
      | Self::ThisMonth => "This month",
      | Self::Later => "Later"
    }
  }

  #[must_use]
  pub fn parse(
    raw: &str
  ) -> Option<Self> {
    Self::ALL.into_iter().find(|key| {
      key.as_str() == raw.trim()
    })
  }
}

impl fmt::Display for DateStatusKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Buckets a task's date window against
/// the context's `now`. Total: missing or
/// unparseable dates never match.
#[tracing::instrument(
  level = "trace",
  skip(ctx)
)]
pub fn classify(
  start_date: Option<&str>,
  due_date: Option<&str>,
  ctx: &DateContext
) -> DateStatusKey {
  let start = ctx.parse_opt(start_date);
  let due = ctx.parse_opt(due_date);

  if let Some(due) = due
    && due < ctx.now
  {
    return DateStatusKey::Overdue;
  }

  let today = ctx.today();
  if let Some(start) = start
    && ctx.calendar_date(start) <= today
  {
    return DateStatusKey::Today;
  }
  if let Some(due) = due
    && ctx.calendar_date(due) == today
  {
    return DateStatusKey::Today;
  }

  let falls_before = |limit: DateTime<Utc>| {
    start.is_some_and(|s| s <= limit)
      || due.is_some_and(|d| d <= limit)
  };

  let key = if falls_before(
    ctx.days_from_now(WEEK_HORIZON_DAYS)
  ) {
    DateStatusKey::ThisWeek
  } else if falls_before(
    ctx.days_from_now(
      MONTH_HORIZON_DAYS
    )
  ) {
    DateStatusKey::ThisMonth
  } else {
    DateStatusKey::Later
  };
  trace!(%key, "classified date window");
  key
}

#[must_use]
pub fn classify_task(
  task: &Task,
  ctx: &DateContext
) -> DateStatusKey {
  classify(
    task.start_date.as_deref(),
    task.due_date.as_deref(),
    ctx
  )
}

/// Groups tasks by bucket in precedence
/// order, skipping empty buckets. Input
/// order is kept inside each group.
pub fn group_by_status<'a>(
  tasks: &'a [Task],
  ctx: &DateContext
) -> Vec<(DateStatusKey, Vec<&'a Task>)>
{
  let mut groups: Vec<(
    DateStatusKey,
    Vec<&'a Task>
  )> = DateStatusKey::ALL
    .into_iter()
    .map(|key| (key, Vec::new()))
    .collect();

  for task in tasks {
    let key = classify_task(task, ctx);
    if let Some((_, bucket)) = groups
      .iter_mut()
      .find(|(k, _)| *k == key)
    {
      bucket.push(task);
    }
  }

  groups.retain(|(_, bucket)| {
    !bucket.is_empty()
  });
  groups
}

/// Display labels with optional
/// per-key overrides.
#[derive(Debug, Clone, Default)]
pub struct StatusLabels {
  overrides: HashMap<String, String>
}

impl StatusLabels {
  pub fn with_overrides<I>(
    overrides: I
  ) -> Self
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    Self {
      overrides: overrides
        .into_iter()
        .map(|(k, v)| {
          (k.trim().to_string(), v)
        })
        .collect()
    }
  }

  #[must_use]
  pub fn label(
    &self,
    key: DateStatusKey
  ) -> String {
    self.label_for(key.as_str())
  }

  /// Never fails: unknown keys are
  /// title-cased.
  #[must_use]
  pub fn label_for(
    &self,
    raw: &str
  ) -> String {
    if let Some(custom) =
      self.overrides.get(raw.trim())
    {
      return custom.clone();
    }
    label_for(raw)
  }
}

#[must_use]
pub fn label_for(raw: &str) -> String {
  match DateStatusKey::parse(raw) {
    | Some(key) => key.label().to_string(),
    | None => title_case(raw)
  }
}

fn title_case(raw: &str) -> String {
  raw
    .split(|c: char| {
      c == '_'
        || c == '-'
        || c.is_whitespace()
    })
    .filter(|word| !word.is_empty())
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        | Some(first) => {
          first
            .to_uppercase()
            .chain(chars)
            .collect::<String>()
        }
        | None => String::new()
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    TimeZone,
    Utc
  };

  use super::{
    DateStatusKey,
    StatusLabels,
    classify,
    group_by_status,
    label_for
  };
  use crate::datetime::DateContext;
  use crate::task::IdSequence;

  fn at(
    y: i32,
    m: u32,
    d: u32,
    h: u32
  ) -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(y, m, d, h, 0, 0)
      .single()
      .expect("valid instant")
  }

  fn ctx_at(
    y: i32,
    m: u32,
    d: u32,
    h: u32
  ) -> DateContext {
    DateContext::utc(at(y, m, d, h))
  }

  #[test]
  fn past_due_is_overdue() {
    let ctx = ctx_at(2026, 1, 15, 0);
    assert_eq!(
      classify(
        None,
        Some("2026-01-10T00:00:00Z"),
        &ctx
      ),
      DateStatusKey::Overdue
    );
    assert_eq!(
      classify(
        Some("2026-02-20T00:00:00Z"),
        Some("2026-01-14T23:59:59Z"),
        &ctx
      ),
      DateStatusKey::Overdue
    );
  }

  #[test]
  fn started_today_or_earlier_is_today() {
    let ctx = ctx_at(2026, 1, 15, 12);
    assert_eq!(
      classify(
        Some("2026-01-15T00:00:00Z"),
        None,
        &ctx
      ),
      DateStatusKey::Today
    );
    assert_eq!(
      classify(
        Some("2025-12-01"),
        Some("2026-03-01"),
        &ctx
      ),
      DateStatusKey::Today
    );
  }

  #[test]
  fn due_later_today_is_today() {
    let ctx = ctx_at(2026, 1, 15, 8);
    assert_eq!(
      classify(
        None,
        Some("2026-01-15T20:00:00Z"),
        &ctx
      ),
      DateStatusKey::Today
    );
  }

  #[test]
  fn due_earlier_today_is_overdue() {
    let ctx = ctx_at(2026, 1, 15, 12);
    assert_eq!(
      classify(
        None,
        Some("2026-01-15T08:00:00Z"),
        &ctx
      ),
      DateStatusKey::Overdue
    );
  }

  #[test]
  fn horizons_pick_week_month_later() {
    let ctx = ctx_at(2026, 1, 15, 0);
    assert_eq!(
      classify(
        Some("2026-01-18T00:00:00Z"),
        Some("2026-01-20T00:00:00Z"),
        &ctx
      ),
      DateStatusKey::ThisWeek
    );
    assert_eq!(
      classify(
        None,
        Some("2026-01-22T00:00:00Z"),
        &ctx
      ),
      DateStatusKey::ThisWeek
    );
    assert_eq!(
      classify(
        Some("2026-01-28T00:00:00Z"),
        None,
        &ctx
      ),
      DateStatusKey::ThisMonth
    );
    assert_eq!(
      classify(
        None,
        Some("2026-02-14T00:00:00Z"),
        &ctx
      ),
      DateStatusKey::ThisMonth
    );
    assert_eq!(
      classify(
        Some("2026-02-14T00:00:01Z"),
        Some("2026-03-01T00:00:00Z"),
        &ctx
      ),
      DateStatusKey::Later
    );
  }

  #[test]
  fn missing_or_malformed_dates_are_later()
  {
    let ctx = ctx_at(2026, 1, 15, 0);
    for (start, due) in [
      (None, None),
      (Some(""), Some("")),
      (Some("not a date"), None),
      (None, Some("2026-99-99")),
      (Some("\u{1F600}"), Some("  "))
    ] {
      assert_eq!(
        classify(start, due, &ctx),
        DateStatusKey::Later
      );
    }
  }

  #[test]
  fn malformed_due_does_not_hide_start() {
    let ctx = ctx_at(2026, 1, 15, 0);
    assert_eq!(
      classify(
        Some("2026-01-17"),
        Some("garbage"),
        &ctx
      ),
      DateStatusKey::ThisWeek
    );
  }

  #[test]
  fn today_uses_calendar_day_in_timezone()
  {
    let tz: chrono_tz::Tz =
      "America/Mexico_City"
        .parse()
        .expect("known tz");
    // 2026-01-15 20:00 local
    let ctx = DateContext::new(
      at(2026, 1, 16, 2),
      tz
    );
    assert_eq!(
      classify(
        Some("2026-01-16T07:00:00Z"),
        None,
        &ctx
      ),
      DateStatusKey::ThisWeek
    );
    assert_eq!(
      classify(
        None,
        Some("2026-01-16T05:00:00Z"),
        &ctx
      ),
      DateStatusKey::Today
    );
  }

  #[test]
  fn groups_follow_precedence_order() {
    let ctx = ctx_at(2026, 1, 15, 0);
    let mut ids = IdSequence::default();
    let tasks = vec![
      ids
        .task("later", "2026-01-01")
        .with_dates(None, None),
      ids
        .task("late", "2026-01-01")
        .with_dates(
          None,
          Some("2026-01-02")
        ),
      ids
        .task("soon", "2026-01-01")
        .with_dates(
          Some("2026-01-17"),
          None
        ),
      ids
        .task("also late", "2026-01-01")
        .with_dates(
          None,
          Some("2026-01-03")
        ),
    ];

    let groups =
      group_by_status(&tasks, &ctx);
    let shape: Vec<(DateStatusKey, Vec<u64>)> = groups
      .iter()
      .map(|(key, items)| {
        (
          *key,
          items
            .iter()
            .map(|t| t.id)
            .collect()
        )
      })
      .collect();

    assert_eq!(
      shape,
      vec![
        (
          DateStatusKey::Overdue,
          vec![2, 4]
        ),
        (
          DateStatusKey::ThisWeek,
          vec![3]
        ),
        (DateStatusKey::Later, vec![1]),
      ]
    );
  }

  #[test]
  fn labels_fall_back_to_title_case() {
    assert_eq!(
      label_for("this_week"),
      "This week"
    );
    assert_eq!(
      label_for("next_quarter"),
      "Next Quarter"
    );
    assert_eq!(label_for(""), "");

    let labels =
      StatusLabels::with_overrides([(
        "later".to_string(),
        "Someday".to_string()
      )]);
    assert_eq!(
      labels.label(DateStatusKey::Later),
      "Someday"
    );
    assert_eq!(
      labels.label(
        DateStatusKey::Overdue
      ),
      "Overdue"
    );
  }

  #[test]
  fn keys_order_by_precedence() {
    let mut keys = vec![
      DateStatusKey::Later,
      DateStatusKey::Today,
      DateStatusKey::Overdue,
    ];
    keys.sort();
    assert_eq!(
      keys,
      vec![
        DateStatusKey::Overdue,
        DateStatusKey::Today,
        DateStatusKey::Later,
      ]
    );
    assert_eq!(
      serde_json::to_string(
        &DateStatusKey::ThisMonth
      )
      .expect("serialize"),
      "\"this_month\""
    );
  }
}
