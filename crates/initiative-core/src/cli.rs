use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "initiative",
    version,
    about = "Initiative planning tools: date buckets, tag trees, timelines and recurrence"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file; defaults to $INITIATIVERC or ~/.initiativerc
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Reference instant instead of the system clock
    #[arg(long = "now", global = true)]
    pub now: Option<String>,

    /// IANA timezone used for calendar days
    #[arg(long = "timezone", global = true)]
    pub timezone: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Group tasks into overdue/today/this week/this month/later
    Status {
        /// JSON array of tasks, or - for stdin
        input: PathBuf,
    },

    /// Show tags as a tree built from their path-style names
    Tags {
        /// JSON array of tags, or - for stdin
        input: PathBuf,
    },

    /// Lay tasks out on a day-by-day timeline
    Gantt {
        /// JSON array of tasks, or - for stdin
        input: PathBuf,

        /// First visible day (defaults to today)
        #[arg(long)]
        from: Option<String>,

        /// Number of visible days (defaults to gantt.days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Describe each recurring task's schedule
    Recur {
        /// JSON array of tasks, or - for stdin
        input: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Tags { .. } => "tags",
            Self::Gantt { .. } => "gantt",
            Self::Recur { .. } => "recur",
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use clap::Parser;

    use super::{Command, GlobalCli, preprocess_args};

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&args(&[
            "initiative",
            "rc.timezone=Europe/Paris",
            "tags",
            "rc.tag.delimiter::",
            "tags.json",
        ]))
        .expect("preprocess");

        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.timezone".to_string(), "Europe/Paris".to_string()),
                ("rc.tag.delimiter".to_string(), ":".to_string()),
            ]
        );
        assert_eq!(pre.cleaned_args, args(&["initiative", "tags", "tags.json"]));
    }

    #[test]
    fn parses_gantt_with_global_flags() {
        let cli = GlobalCli::parse_from(args(&[
            "initiative",
            "gantt",
            "-",
            "--from",
            "2026-01-10",
            "--days",
            "7",
            "--now",
            "2026-01-15T00:00:00Z",
            "-vv",
            "--rc",
            "color=off",
        ]));

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.now.as_deref(), Some("2026-01-15T00:00:00Z"));
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "color");
        match cli.command {
            Command::Gantt { input, from, days } => {
                assert_eq!(input, PathBuf::from("-"));
                assert_eq!(from.as_deref(), Some("2026-01-10"));
                assert_eq!(days, Some(7));
            }
            other => panic!("unexpected command {}", other.name()),
        }
    }
}
