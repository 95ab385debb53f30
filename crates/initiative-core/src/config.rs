use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::date_status::StatusLabels;
use crate::gantt::MAX_GANTT_DAYS;
use crate::recurrence::RecurrenceStrategy;
use crate::tag_tree::DEFAULT_DELIMITER;

pub const CONFIG_ENV_VAR: &str =
  "INITIATIVERC";
const CONFIG_FILE_NAME: &str =
  ".initiativerc";
const STATUS_LABEL_PREFIX: &str =
  "status.label.";
const DEFAULT_GANTT_DAYS: u32 = 14;

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "timezone".to_string(),
      "UTC".to_string()
    );
    map.insert(
      "tag.delimiter".to_string(),
      DEFAULT_DELIMITER.to_string()
    );
    map.insert(
      "gantt.days".to_string(),
      DEFAULT_GANTT_DAYS.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "recurrence.strategy".to_string(),
      "fixed".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_config_path(
      config_override
    )?;
    if let Some(path) = rc {
      info!(config = %path.display(), "loading config");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no config file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for \
             {key}: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn timezone(
    &self
  ) -> Option<String> {
    self
      .get("timezone")
      .filter(|tz| !tz.trim().is_empty())
  }

  pub fn tag_delimiter(
    &self
  ) -> String {
    self
      .get("tag.delimiter")
      .filter(|d| !d.is_empty())
      .unwrap_or_else(|| {
        DEFAULT_DELIMITER.to_string()
      })
  }

  pub fn gantt_days(
    &self
  ) -> anyhow::Result<u32> {
    let Some(raw) =
      self.get("gantt.days")
    else {
      return Ok(DEFAULT_GANTT_DAYS);
    };
    let days: u32 = raw
      .trim()
      .parse()
      .with_context(|| {
        format!(
          "invalid gantt.days: {raw}"
        )
      })?;
    if !(1..=MAX_GANTT_DAYS)
      .contains(&days)
    {
      return Err(anyhow!(
        "gantt.days must be between \
         1 and {MAX_GANTT_DAYS}, got \
         {days}"
      ));
    }
    Ok(days)
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    Ok(
      self
        .get_bool("color")?
        .unwrap_or(true)
    )
  }

  pub fn recurrence_strategy(
    &self
  ) -> anyhow::Result<RecurrenceStrategy>
  {
    match self.get("recurrence.strategy") {
      | Some(raw) => raw.parse(),
      | None => {
        Ok(RecurrenceStrategy::Fixed)
      }
    }
  }

  pub fn status_labels(
    &self
  ) -> StatusLabels {
    StatusLabels::with_overrides(
      self.map.iter().filter_map(
        |(k, v)| {
          k.strip_prefix(
            STATUS_LABEL_PREFIX
          )
          .map(|key| {
            (key.to_string(), v.clone())
          })
        }
      )
    )
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let mut active = Vec::new();
    self.load_file_nested(
      path,
      &mut active
    )
  }

  /// `active` holds the canonical paths
  /// of the files currently being read,
  /// outermost first.
  #[tracing::instrument(skip(
    self, active
  ))]
  fn load_file_nested(
    &mut self,
    path: &Path,
    active: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| path.clone());
    if active.contains(&canonical) {
      let chain = active
        .iter()
        .chain(std::iter::once(
          &canonical
        ))
        .map(|p| {
          p.display().to_string()
        })
        .collect::<Vec<_>>()
        .join(" -> ");
      return Err(anyhow!(
        "config include cycle: {chain}"
      ));
    }
    active.push(canonical);

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      let mut had_comment = false;
      if let Some((before, _)) =
        line.split_once(" #")
      {
        line = before.trim();
        had_comment = true;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file_nested(
              &include_path,
              active
            )
            .with_context(|| {
              format!(
                "in include at {}:{}",
                path.display(),
                line_num + 1
              )
            })?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      if had_comment && value.is_empty() {
        return Err(anyhow!(
          "empty value for {key} at \
           {}:{} (\" #\" starts a \
           comment)",
          path.display(),
          line_num + 1
        ));
      }
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    active.pop();
    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping config \
       lookup"
    );
    return Ok(None);
  };
  let candidate =
    home.join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
