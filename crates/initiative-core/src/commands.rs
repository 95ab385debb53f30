use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::config::Config;
use crate::date_status::group_by_status;
use crate::datetime::DateContext;
use crate::gantt::{DayWindow, normalize};
use crate::recurrence::summarize_task;
use crate::render::Renderer;
use crate::tag_tree::build_tree_with;
use crate::task::{Tag, Task};

#[instrument(skip(cfg, ctx, renderer, out), fields(command = command.name()))]
pub fn dispatch<W: Write>(
    command: &Command,
    cfg: &Config,
    ctx: &DateContext,
    renderer: &Renderer,
    out: W,
) -> anyhow::Result<()> {
    debug!(now = %ctx.now, timezone = %ctx.tz, "dispatching command");

    match command {
        Command::Status { input } => cmd_status(cfg, ctx, renderer, input, out),
        Command::Tags { input } => cmd_tags(cfg, renderer, input, out),
        Command::Gantt { input, from, days } => {
            cmd_gantt(cfg, ctx, renderer, input, from.as_deref(), *days, out)
        }
        Command::Recur { input } => cmd_recur(cfg, ctx, renderer, input, out),
    }
}

fn cmd_status<W: Write>(
    cfg: &Config,
    ctx: &DateContext,
    renderer: &Renderer,
    input: &Path,
    out: W,
) -> anyhow::Result<()> {
    let tasks: Vec<Task> = load_json(input)?;
    let groups = group_by_status(&tasks, ctx);
    info!(
        tasks = tasks.len(),
        groups = groups.len(),
        "classified tasks"
    );
    renderer.write_status_groups(out, &groups, &cfg.status_labels(), ctx)
}

fn cmd_tags<W: Write>(
    cfg: &Config,
    renderer: &Renderer,
    input: &Path,
    out: W,
) -> anyhow::Result<()> {
    let tags: Vec<Tag> = load_json(input)?;
    let roots = build_tree_with(&tags, &cfg.tag_delimiter());
    info!(tags = tags.len(), roots = roots.len(), "built tag tree");
    renderer.write_tag_tree(out, &roots)
}

fn cmd_gantt<W: Write>(
    cfg: &Config,
    ctx: &DateContext,
    renderer: &Renderer,
    input: &Path,
    from: Option<&str>,
    days: Option<u32>,
    out: W,
) -> anyhow::Result<()> {
    let tasks: Vec<Task> = load_json(input)?;

    let first_day = match from {
        Some(raw) => ctx
            .parse_date(raw)
            .ok_or_else(|| anyhow!("invalid --from date: {raw} (expected YYYY-MM-DD)"))?,
        None => ctx.today(),
    };
    let window = match days {
        Some(days) => DayWindow::try_new(first_day, days).context("invalid --days")?,
        None => DayWindow::try_new(first_day, cfg.gantt_days()?)?,
    };
    let day_count = window.day_count;

    let ranges = normalize(&tasks, ctx);
    info!(
        tasks = tasks.len(),
        ranges = ranges.len(),
        first_day = %window.first_day,
        day_count,
        "normalized timeline"
    );
    renderer.write_gantt(out, &ranges, &window, ctx)
}

fn cmd_recur<W: Write>(
    cfg: &Config,
    ctx: &DateContext,
    renderer: &Renderer,
    input: &Path,
    out: W,
) -> anyhow::Result<()> {
    let tasks: Vec<Task> = load_json(input)?;
    let default_strategy = cfg.recurrence_strategy()?;

    let summaries: Vec<(&Task, String)> = tasks
        .iter()
        .filter_map(|task| summarize_task(task, ctx, default_strategy).map(|s| (task, s)))
        .collect();
    info!(
        tasks = tasks.len(),
        recurring = summaries.len(),
        "summarized recurrence rules"
    );
    renderer.write_recurrence(out, &summaries)
}

/// Reads a JSON document from `path`, or from stdin when `path` is `-`.
#[instrument]
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let (raw, source) = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        (buf, "stdin".to_string())
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        (text, path.display().to_string())
    };

    debug!(source = %source, bytes = raw.len(), "parsing json input");
    serde_json::from_str(&raw).with_context(|| format!("invalid json in {source}"))
}
