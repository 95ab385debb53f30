use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;

pub const TIMEZONE_ENV_VAR: &str =
  "INITIATIVE_TIMEZONE";
pub const DEFAULT_TIMEZONE: &str =
  "UTC";

const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M"
];

/// The reference instant and calendar
/// timezone every date computation runs
/// against.
#[derive(Debug, Clone, Copy)]
pub struct DateContext {
  pub now: DateTime<Utc>,
  pub tz:  Tz
}

impl DateContext {
  #[must_use]
  pub fn new(
    now: DateTime<Utc>,
    tz: Tz
  ) -> Self {
    Self {
      now,
      tz
    }
  }

  #[must_use]
  pub fn utc(
    now: DateTime<Utc>
  ) -> Self {
    Self::new(now, chrono_tz::UTC)
  }

  #[must_use]
  pub fn current(tz: Tz) -> Self {
    Self::new(Utc::now(), tz)
  }

  #[must_use]
  pub fn today(&self) -> NaiveDate {
    self.calendar_date(self.now)
  }

  #[must_use]
  pub fn calendar_date(
    &self,
    dt: DateTime<Utc>
  ) -> NaiveDate {
    dt.with_timezone(&self.tz)
      .date_naive()
  }

  #[must_use]
  pub fn days_from_now(
    &self,
    days: i64
  ) -> DateTime<Utc> {
    self
      .now
      .checked_add_signed(
        Duration::days(days)
      )
      .unwrap_or(self.now)
  }

  /// Lenient timestamp parse; anything
  /// unrecognised is treated as absent.
  #[must_use]
  pub fn parse(
    &self,
    raw: &str
  ) -> Option<DateTime<Utc>> {
    parse_timestamp(raw, &self.tz)
  }

  #[must_use]
  pub fn parse_opt(
    &self,
    raw: Option<&str>
  ) -> Option<DateTime<Utc>> {
    raw.and_then(|value| {
      self.parse(value)
    })
  }

  #[must_use]
  pub fn parse_date(
    &self,
    raw: &str
  ) -> Option<NaiveDate> {
    parse_calendar_date(raw, &self.tz)
  }
}

/// Calendar date of a timestamp in `tz`;
/// bare `YYYY-MM-DD` is taken as-is.
#[must_use]
pub fn parse_calendar_date(
  raw: &str,
  tz: &Tz
) -> Option<NaiveDate> {
  if let Ok(date) =
    NaiveDate::parse_from_str(
      raw.trim(),
      "%Y-%m-%d"
    )
  {
    return Some(date);
  }
  parse_timestamp(raw, tz).map(|dt| {
    dt.with_timezone(tz).date_naive()
  })
}

#[must_use]
pub fn parse_timestamp(
  raw: &str,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.with_timezone(&Utc));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return date
      .and_hms_opt(0, 0, 0)
      .map(|midnight| {
        midnight.and_utc()
      });
  }

  for fmt in NAIVE_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(
        ndt, tz
      );
    }
  }

  tracing::trace!(
    input = token,
    "unrecognised timestamp; treating as absent"
  );
  None
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Some(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::debug!(
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Some(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      tracing::debug!(
        local = %local_naive,
        timezone = %tz,
        "local datetime does not exist in timezone"
      );
      None
    }
  }
}

/// Strict variant used for user input
/// such as `--now`, where silently
/// ignoring a typo would be wrong.
pub fn parse_instant(
  raw: &str,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  parse_timestamp(raw, tz).ok_or_else(
    || {
      anyhow!(
        "unrecognized timestamp: \
         {raw} (expected RFC3339, \
         YYYY-MM-DD, YYYY-MM-DDTHH:MM \
         or YYYY-MM-DD HH:MM)"
      )
    }
  )
}

/// Picks the calendar timezone:
/// `$INITIATIVE_TIMEZONE`, then the
/// configured value, then UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> anyhow::Result<Tz> {
  let from_env =
    std::env::var(TIMEZONE_ENV_VAR).ok();
  resolve_timezone_from(
    from_env.as_deref(),
    configured
  )
}

/// A set but blank env value counts as
/// unset; a set but unknown one is an
/// error, like a bad config value.
pub fn resolve_timezone_from(
  from_env: Option<&str>,
  configured: Option<&str>
) -> anyhow::Result<Tz> {
  if let Some(raw) = from_env
    && !raw.trim().is_empty()
  {
    return parse_timezone(
      raw,
      TIMEZONE_ENV_VAR
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid {TIMEZONE_ENV_VAR}: \
         {raw}"
      )
    });
  }

  if let Some(raw) = configured {
    return parse_timezone(
      raw, "config"
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid timezone setting: \
         {raw}"
      )
    });
  }

  parse_timezone(
    DEFAULT_TIMEZONE,
    "DEFAULT_TIMEZONE"
  )
  .ok_or_else(|| {
    anyhow!(
      "failed to parse fallback \
       timezone"
    )
  })
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}
