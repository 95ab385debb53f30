use std::collections::HashSet;
use std::fs;

use chrono::{DateTime, NaiveDate, Utc};
use initiative_core::config::Config;
use initiative_core::date_status::{DateStatusKey, classify, group_by_status};
use initiative_core::datetime::DateContext;
use initiative_core::gantt::{DayWindow, normalize};
use initiative_core::tag_tree::{build_tree, build_tree_with, flatten};
use initiative_core::task::{IdSequence, Tag, Task};
use tempfile::tempdir;

fn instant(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid instant")
        .with_timezone(&Utc)
}

fn ctx(now: &str) -> DateContext {
    DateContext::utc(instant(now))
}

#[test]
fn classifies_reference_scenarios() {
    assert_eq!(
        classify(None, Some("2026-01-10T00:00:00Z"), &ctx("2026-01-15T00:00:00Z")),
        DateStatusKey::Overdue
    );
    assert_eq!(
        classify(Some("2026-01-15T00:00:00Z"), None, &ctx("2026-01-15T12:00:00Z")),
        DateStatusKey::Today
    );
    assert_eq!(
        classify(
            Some("2026-01-18T00:00:00Z"),
            Some("2026-01-20T00:00:00Z"),
            &ctx("2026-01-15T00:00:00Z")
        ),
        DateStatusKey::ThisWeek
    );
}

#[test]
fn classification_is_total_over_odd_inputs() {
    let now = ctx("2026-01-15T00:00:00Z");
    let odd = [
        None,
        Some(""),
        Some(" "),
        Some("null"),
        Some("2026-02-30"),
        Some("T00:00:00Z"),
        Some("９９９９"),
        Some("2026-01-15T00:00:00Z"),
    ];

    for start in odd {
        for due in odd {
            let key = classify(start, due, &now);
            if due == Some("2026-01-15T00:00:00Z") {
                // equal to now: not strictly before, same calendar day
                assert_eq!(key, DateStatusKey::Today);
            }
            if start.is_none() && due.is_none() {
                assert_eq!(key, DateStatusKey::Later);
            }
        }
    }
}

#[test]
fn single_nested_tag_builds_ghost_root() {
    let tree = build_tree(&[Tag {
        id: 1,
        name: "Area/Sub".to_string(),
        color: Some("#fff".to_string()),
    }]);

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].full_path, "Area");
    assert!(tree[0].tag.is_none());
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[0].children[0].full_path, "Area/Sub");
    assert_eq!(tree[0].children[0].tag.as_ref().map(|t| t.id), Some(1));
}

#[test]
fn tag_tree_paths_unique_and_leaves_carry_tags() {
    let mut ids = IdSequence::default();
    let names = [
        "Eng/Backend/API",
        "Eng/Backend",
        "Eng/Frontend/Web",
        "Ops",
        "Ops/Oncall",
        "Eng/Backend/API",
        "Design/",
    ];
    let tags: Vec<Tag> = names.iter().map(|name| ids.tag(name, None)).collect();
    let tree = build_tree(&tags);
    let flat = flatten(&tree);

    let paths: HashSet<&str> = flat.iter().map(|(_, n)| n.full_path.as_str()).collect();
    assert_eq!(paths.len(), flat.len());

    for (_, node) in &flat {
        if node.children.is_empty() {
            assert!(node.is_renderable_leaf(), "{} should carry a tag", node.full_path);
        }
    }
    assert!(paths.contains("Design"));
    assert!(paths.contains("Eng/Frontend"));
}

#[test]
fn timeline_ranges_are_ordered_and_well_formed() {
    let mut ids = IdSequence::default();
    let tasks: Vec<Task> = vec![
        ids.task("due only", "2026-01-05")
            .with_dates(None, Some("2026-01-10")),
        ids.task("reversed", "2026-01-01")
            .with_dates(Some("2026-01-09"), Some("2026-01-03")),
        ids.task("created only", "2026-01-02T10:00:00Z"),
        ids.task("window", "2026-01-01")
            .with_dates(Some("2026-01-04"), Some("2026-01-30")),
    ];
    let now = ctx("2026-01-15T00:00:00Z");
    let ranges = normalize(&tasks, &now);

    assert_eq!(ranges.len(), 4);
    assert!(ranges.iter().all(|r| r.start <= r.end));
    assert!(ranges.windows(2).all(|w| w[0].start <= w[1].start));

    let due_only = ranges
        .iter()
        .find(|r| r.task.title == "due only")
        .expect("due-only range");
    assert_eq!(due_only.start, instant("2026-01-10T00:00:00Z"));
    assert_eq!(due_only.end, instant("2026-01-10T00:00:00Z"));

    let window = DayWindow::new(NaiveDate::from_ymd_opt(2026, 1, 10).expect("date"), 5);
    let visible: Vec<&str> = ranges
        .iter()
        .filter(|r| window.clip(r).is_some())
        .map(|r| r.task.title.as_str())
        .collect();
    assert_eq!(visible, vec!["window", "due only"]);
}

#[test]
fn config_drives_grouping_labels_and_delimiter() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("initiativerc");
    fs::write(
        &rc,
        "tag.delimiter = .\nstatus.label.overdue = Late\ntimezone = America/Mexico_City\n",
    )
    .expect("write config");

    let cfg = Config::load(Some(&rc)).expect("load config");
    let tz: chrono_tz::Tz = cfg
        .timezone()
        .expect("timezone set")
        .parse()
        .expect("valid timezone");

    let now = DateContext::new(instant("2026-01-16T02:00:00Z"), tz);
    let mut ids = IdSequence::default();
    let tasks = vec![
        ids.task("tonight", "2026-01-01")
            .with_dates(None, Some("2026-01-16T05:00:00Z")),
        ids.task("missed", "2026-01-01")
            .with_dates(None, Some("2026-01-15T23:00:00Z")),
    ];
    let groups = group_by_status(&tasks, &now);
    let labels = cfg.status_labels();
    let shape: Vec<(String, usize)> = groups
        .iter()
        .map(|(key, items)| (labels.label(*key), items.len()))
        .collect();
    assert_eq!(
        shape,
        vec![("Late".to_string(), 1), ("Today".to_string(), 1)]
    );

    let tags = vec![ids.tag("team.alpha", None), ids.tag("team.beta", None)];
    let tree = build_tree_with(&tags, &cfg.tag_delimiter());
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children.len(), 2);
    assert_eq!(tree[0].descendant_tag_count(), 2);
}
