use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::date_status::{DateStatusKey, StatusLabels};
use crate::datetime::DateContext;
use crate::gantt::{DayWindow, GridSpan, NormalizedRange};
use crate::tag_tree::{TagTreeNode, flatten};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.color()? && io::stdout().is_terminal();
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn write_status_groups<W: Write>(
        &self,
        out: W,
        groups: &[(DateStatusKey, Vec<&Task>)],
        labels: &StatusLabels,
        ctx: &DateContext,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "Status".to_string(),
            "ID".to_string(),
            "Start".to_string(),
            "Due".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::new();
        for (key, tasks) in groups {
            let label = labels.label(*key);
            let label = if *key == DateStatusKey::Overdue {
                self.paint(&label, "31")
            } else {
                label
            };

            for task in tasks {
                rows.push(vec![
                    label.clone(),
                    self.paint(&task.id.to_string(), "33"),
                    format_day(task.start_date.as_deref(), ctx),
                    format_day(task.due_date.as_deref(), ctx),
                    task.title.clone(),
                ]);
            }
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn write_tag_tree<W: Write>(&self, out: W, roots: &[TagTreeNode]) -> anyhow::Result<()> {
        let headers = vec![
            "Tag".to_string(),
            "ID".to_string(),
            "Tags".to_string(),
            "Color".to_string(),
        ];

        let rows = flatten(roots)
            .into_iter()
            .map(|(depth, node)| {
                let name = format!("{}{}", "  ".repeat(depth), node.segment);
                let name = if node.is_ghost() {
                    self.paint(&name, "2")
                } else {
                    name
                };
                vec![
                    name,
                    node.tag
                        .as_ref()
                        .map(|tag| tag.id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    node.tag_count().to_string(),
                    node.effective_color().unwrap_or_default().to_string(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn write_gantt<W: Write>(
        &self,
        out: W,
        ranges: &[NormalizedRange<'_>],
        window: &DayWindow,
        ctx: &DateContext,
    ) -> anyhow::Result<()> {
        let today = ctx.today();
        let axis: String = window
            .days()
            .map(|day| if day == today { '|' } else { '-' })
            .collect();

        let headers = vec![
            "ID".to_string(),
            "Start".to_string(),
            "End".to_string(),
            axis,
            "Title".to_string(),
        ];

        let rows = ranges
            .iter()
            .map(|range| {
                let bar = match window.clip(range) {
                    Some(span) => self.paint(&bar_cells(span, window.day_count), "36"),
                    None => " ".repeat(window.day_count as usize),
                };
                vec![
                    range.task.id.to_string(),
                    range.start_day.format("%Y-%m-%d").to_string(),
                    range.end_day.format("%Y-%m-%d").to_string(),
                    bar,
                    range.task.title.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn write_recurrence<W: Write>(
        &self,
        out: W,
        summaries: &[(&Task, String)],
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Repeats".to_string(),
        ];
        let rows = summaries
            .iter()
            .map(|(task, summary)| vec![task.id.to_string(), task.title.clone(), summary.clone()])
            .collect();

        write_table(out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn format_day(raw: Option<&str>, ctx: &DateContext) -> String {
    raw.and_then(|value| ctx.parse_date(value))
        .map(|day| day.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn bar_cells(span: GridSpan, day_count: u32) -> String {
    (1..=day_count)
        .map(|column| {
            if column >= span.column_start && column < span.column_end {
                '#'
            } else {
                '.'
            }
        })
        .collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = column_count.saturating_sub(1);

    for (idx, header) in headers.iter().enumerate() {
        if idx == last {
            write!(writer, "{header}")?;
        } else {
            write!(writer, "{:width$} ", header, width = widths[idx])?;
        }
    }
    writeln!(writer)?;

    for (idx, width) in widths.iter().enumerate() {
        if idx == last {
            write!(writer, "{:-<width$}", "", width = *width)?;
        } else {
            write!(writer, "{:-<width$} ", "", width = *width)?;
        }
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            if idx == last {
                write!(writer, "{cell}")?;
                continue;
            }
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
