use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::recurrence::{RecurrenceRule, RecurrenceStrategy};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default)]
    pub due_date: Option<String>,

    pub created_at: String,

    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,

    #[serde(default)]
    pub recurrence_strategy: Option<RecurrenceStrategy>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn new(id: u64, title: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            start_date: None,
            due_date: None,
            created_at: created_at.into(),
            recurrence: None,
            recurrence_strategy: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_dates(mut self, start_date: Option<&str>, due_date: Option<&str>) -> Self {
        self.start_date = start_date.map(ToString::to_string);
        self.due_date = due_date.map(ToString::to_string);
        self
    }
}

/// Hands out ascending ids for records built in tests and fixtures.
///
/// Each caller owns its sequence, so parallel tests never share a counter.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSequence {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    pub fn task(&mut self, title: &str, created_at: &str) -> Task {
        Task::new(self.next_id(), title, created_at)
    }

    pub fn tag(&mut self, name: &str, color: Option<&str>) -> Tag {
        Tag {
            id: self.next_id(),
            name: name.to_string(),
            color: color.map(ToString::to_string),
        }
    }
}
