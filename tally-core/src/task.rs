//! Task model for the tally list engine.
//!
//! The record stays small + serializable; storage (files, whatever comes
//! later) is a separate layer behind the `Storage` trait in `store`.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One to-do entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque unique id, assigned at creation, never changed.
    pub id: String,
    pub text: String,
    pub completed: bool,

    /// Short label ("Work", "General", ...). Absent until categorization
    /// resolves; always non-empty and trimmed once set.
    #[serde(default)]
    pub category: Option<String>,

    /// True while a categorization request for this task is in flight.
    /// Persisted with the record but reset on load: a fresh process has no
    /// outstanding request that could ever clear it.
    #[serde(default)]
    pub is_categorizing: bool,
}

impl Task {
    /// Build a freshly-added task: new id, not completed, categorization pending.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            category: None,
            is_categorizing: true,
        }
    }
}

/// View predicate for the task list. Pure view-state, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => bail!("unknown filter '{other}' (expected all|active|completed)"),
        }
    }
}

/// Display theme. Persisted independently of tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Lenient parse for stored values: anything but the two recognized
    /// literals falls back to `Light`.
    pub fn parse_or_default(s: &str) -> Theme {
        match s.trim() {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_pending_and_uncompleted() {
        let t = Task::new("Buy milk");
        assert!(!t.completed);
        assert!(t.is_categorizing);
        assert!(t.category.is_none());
        assert!(!t.id.is_empty());
    }

    #[test]
    fn new_tasks_get_distinct_ids() {
        let a = Task::new("a");
        let b = Task::new("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn filter_partitions_by_completion() {
        let mut t = Task::new("x");
        assert!(Filter::All.matches(&t));
        assert!(Filter::Active.matches(&t));
        assert!(!Filter::Completed.matches(&t));

        t.completed = true;
        assert!(Filter::All.matches(&t));
        assert!(!Filter::Active.matches(&t));
        assert!(Filter::Completed.matches(&t));
    }

    #[test]
    fn filter_parses_literals() {
        assert_eq!("all".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!("Active".parse::<Filter>().unwrap(), Filter::Active);
        assert_eq!("completed".parse::<Filter>().unwrap(), Filter::Completed);
        assert!("done".parse::<Filter>().is_err());
    }

    #[test]
    fn theme_defaults_to_light_on_unknown() {
        assert_eq!(Theme::parse_or_default("dark"), Theme::Dark);
        assert_eq!(Theme::parse_or_default("light"), Theme::Light);
        assert_eq!(Theme::parse_or_default("solarized"), Theme::Light);
        assert_eq!(Theme::parse_or_default(""), Theme::Light);
    }

    #[test]
    fn task_serde_defaults_tolerate_missing_fields() {
        // Records written before a category resolved have no category key.
        let t: Task = serde_json::from_str(
            r#"{"id":"t1","text":"Call mom","completed":false}"#,
        )
        .unwrap();
        assert_eq!(t.category, None);
        assert!(!t.is_categorizing);
    }
}
