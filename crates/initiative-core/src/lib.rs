pub mod cli;
pub mod commands;
pub mod config;
pub mod date_status;
pub mod datetime;
pub mod gantt;
pub mod recurrence;
pub mod render;
pub mod tag_tree;
pub mod task;

use std::ffi::OsString;

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::datetime::{
  DateContext,
  parse_instant,
  resolve_timezone
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    command = cli.command.name(),
    "starting initiative CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (kv.key.clone(), kv.value.clone())
        })
    )
  );

  let tz = match cli.timezone.as_deref()
  {
    | Some(raw) => {
      raw.trim().parse::<Tz>().map_err(
        |err| {
          anyhow!(
            "invalid --timezone \
             {raw}: {err}"
          )
        }
      )?
    }
    | None => resolve_timezone(
      cfg.timezone().as_deref()
    )
    .context(
      "failed to resolve calendar \
       timezone"
    )?
  };

  let ctx = match cli.now.as_deref() {
    | Some(raw) => DateContext::new(
      parse_instant(raw, &tz)
        .context("invalid --now")?,
      tz
    ),
    | None => DateContext::current(tz)
  };

  let renderer =
    render::Renderer::new(&cfg)?;
  let stdout = std::io::stdout();

  commands::dispatch(
    &cli.command,
    &cfg,
    &ctx,
    &renderer,
    stdout.lock()
  )?;

  info!("done");
  Ok(())
}
