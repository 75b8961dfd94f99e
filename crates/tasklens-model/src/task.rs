//! Task entity snapshot consumed by the query engine.
//!
//! The engine never owns or mutates tasks: the external task index owns the
//! records and hands out materialized snapshots. Date stamps are kept as raw
//! strings (`YYYY-MM-DD` or RFC 3339) and parsed lazily through the engine's
//! canonical anchor routine, so a malformed stamp degrades per-condition
//! instead of failing entity construction.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldValue;

/// Path of a task record inside the index (the index's lookup key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPath(pub String);

impl TaskPath {
    /// Creates a path from anything string-like.
    pub fn new(path: impl Into<String>) -> Self {
        TaskPath(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskPath {
    fn from(s: &str) -> Self {
        TaskPath(s.to_string())
    }
}

/// Recurrence rule attached to a task.
///
/// Either an RFC-5545-like rule string (e.g. `FREQ=WEEKLY;BYDAY=MO`) or the
/// legacy structured form older records still carry. The engine never expands
/// rules itself; it only asks the recurrence collaborator whether an instance
/// is due on a given calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rule", rename_all = "lowercase")]
pub enum Recurrence {
    /// RFC-5545-like rule string.
    Rrule(String),
    /// Legacy structured rule.
    Legacy(LegacyRecurrence),
}

/// Legacy structured recurrence rule (pre-rule-string records).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRecurrence {
    /// Base frequency keyword: `daily`, `weekly`, `monthly`, `yearly`.
    pub frequency: String,
    /// Repeat interval in units of `frequency`.
    #[serde(default = "default_interval")]
    pub interval: u32,
}

fn default_interval() -> u32 {
    1
}

/// A fully materialized task record (read-only input to the engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntity {
    /// Index path of the backing record.
    pub path: TaskPath,

    /// Task title text.
    pub title: String,

    /// Status key (resolved against the vocabulary for completeness and
    /// display order).
    pub status: String,

    /// Priority key, if any (resolved against the vocabulary for its weight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Due stamp: `YYYY-MM-DD` or an RFC 3339 date-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,

    /// Scheduled stamp: `YYYY-MM-DD` or an RFC 3339 date-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<String>,

    /// Recurrence rule, if the task repeats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,

    /// Calendar days on which instances of a recurring task were completed.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub completed_instances: BTreeSet<NaiveDate>,

    /// Ordered tag list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Ordered context list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,

    /// Ordered project reference list. References may use link syntax and are
    /// canonicalized through the engine's project resolver before comparison.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,

    /// Archived flag.
    #[serde(default)]
    pub archived: bool,

    /// User-defined extension fields, keyed by field id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,

    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last modification timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    /// Manual ordering number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,

    /// Story point estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,
}

impl TaskEntity {
    /// Creates a task with the given path, title, and status; every other
    /// field starts unset.
    pub fn new(path: impl Into<TaskPath>, title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            status: status.into(),
            priority: None,
            due: None,
            scheduled: None,
            recurrence: None,
            completed_instances: BTreeSet::new(),
            tags: Vec::new(),
            contexts: Vec::new(),
            projects: Vec::new(),
            archived: false,
            fields: BTreeMap::new(),
            created_at: None,
            modified_at: None,
            order: None,
            story_points: None,
        }
    }

    /// Returns true if the task carries a recurrence rule.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Returns a user field value by field id.
    pub fn field(&self, id: &str) -> Option<&FieldValue> {
        self.fields.get(id)
    }
}

impl From<String> for TaskPath {
    fn from(s: String) -> Self {
        TaskPath(s)
    }
}
