//! Collaborator contracts: the task index, the recurrence oracle, and the
//! project-reference resolver.
//!
//! The engine owns none of the task data. The index owns the records and
//! exposes path-keyed lookup sets plus an async point lookup; the engine only
//! ever reads the snapshots it materializes. Index mutations reach the engine
//! as [`IndexEvent`]s through [`QueryEngine::handle_index_event`]; the host
//! wires its own subscription mechanism to that method.
//!
//! [`QueryEngine::handle_index_event`]: crate::QueryEngine::handle_index_event

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tasklens_model::{TaskEntity, TaskPath};

/// A set of task paths. Ordered, so iteration (and therefore candidate
/// materialization) is deterministic.
pub type PathSet = BTreeSet<TaskPath>;

/// Read contract the engine consumes from the task index.
///
/// The set lookups are synchronous snapshots; only the point lookup may hit
/// slower storage and is async. Every set returned is owned by the caller;
/// the index must not hand out views into mutable internal state.
pub trait TaskIndex {
    /// Paths of every task in the index.
    fn all_paths(&self) -> PathSet;

    /// Paths of tasks with the given status key.
    fn paths_by_status(&self, status: &str) -> PathSet;

    /// Paths of tasks whose due or scheduled stamp anchors to the given UTC
    /// calendar day.
    fn paths_by_date(&self, day: NaiveDate) -> PathSet;

    /// Paths of tasks anchored strictly before the given day.
    ///
    /// The default returns [`all_paths`](TaskIndex::all_paths): a correct
    /// superset for indexes that only materialize point lookups. Override
    /// when a range index exists.
    fn paths_before(&self, _day: NaiveDate) -> PathSet {
        self.all_paths()
    }

    /// Paths of tasks anchored strictly after the given day. Same superset
    /// default as [`paths_before`](TaskIndex::paths_before).
    fn paths_after(&self, _day: NaiveDate) -> PathSet {
        self.all_paths()
    }

    /// Paths of tasks that are past due and not completed.
    fn overdue_paths(&self) -> PathSet;

    /// Materializes the task at a path, if it still exists.
    fn task_at(&self, path: &TaskPath) -> impl std::future::Future<Output = Option<TaskEntity>> + Send;

    /// Distinct status keys present in the index.
    fn all_statuses(&self) -> Vec<String>;

    /// Distinct priority keys present in the index.
    fn all_priorities(&self) -> Vec<String>;

    /// Distinct contexts present in the index.
    fn all_contexts(&self) -> Vec<String>;

    /// Distinct project references present in the index.
    fn all_projects(&self) -> Vec<String>;

    /// Distinct tags present in the index.
    fn all_tags(&self) -> Vec<String>;

    /// Distinct folders (path parents) present in the index.
    fn all_folders(&self) -> Vec<String>;
}

/// An index mutation, as delivered to the engine's event handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// A record was added.
    Added(TaskPath),
    /// A record was updated in place.
    Updated(TaskPath),
    /// A record was deleted.
    Deleted(TaskPath),
    /// A record moved to a new path.
    Renamed {
        /// Old path.
        from: TaskPath,
        /// New path.
        to: TaskPath,
    },
    /// The index was rebuilt from scratch.
    Rebuilt,
}

/// Recurrence oracle: a pure predicate answering whether a recurring task has
/// an instance due on a calendar day.
///
/// Implementations must be timezone-anchor-stable: the same task and day
/// always yield the same answer regardless of host clock or timezone.
pub trait RecurrenceProvider {
    /// Whether an instance of `task` is due on `day`.
    fn is_due_on(&self, task: &TaskEntity, day: NaiveDate) -> bool;
}

/// Recurrence provider for hosts without rule expansion: nothing is ever due.
/// Recurring tasks then bucket by their anchor due date alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecurrence;

impl RecurrenceProvider for NoRecurrence {
    fn is_due_on(&self, _task: &TaskEntity, _day: NaiveDate) -> bool {
        false
    }
}

/// Resolves a textual project reference to a canonical identity, so two
/// spellings of the same backing record compare equal. Pluggable: the engine
/// assumes no particular link syntax.
pub trait ProjectResolver {
    /// Canonical identity of a reference. References with equal canonical
    /// identities denote the same project. An empty canonical identity means
    /// the reference is blank.
    fn canonical(&self, reference: &str) -> String;

    /// Display text for a reference. Defaults to the canonical identity.
    fn display(&self, reference: &str) -> String {
        self.canonical(reference)
    }
}

/// Default resolver: understands `[[target]]` and `[[target|alias]]`
/// wiki-link references. Canonical identity is the case-folded link target
/// (or the case-folded text itself for plain references); display text is the
/// alias when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver;

impl LinkResolver {
    fn split(reference: &str) -> (&str, Option<&str>) {
        let trimmed = reference.trim();
        let Some(inner) = trimmed
            .strip_prefix("[[")
            .and_then(|rest| rest.strip_suffix("]]"))
        else {
            return (trimmed, None);
        };
        match inner.split_once('|') {
            Some((target, alias)) => (target.trim(), Some(alias.trim())),
            None => (inner.trim(), None),
        }
    }
}

impl ProjectResolver for LinkResolver {
    fn canonical(&self, reference: &str) -> String {
        let (target, _) = Self::split(reference);
        target.to_lowercase()
    }

    fn display(&self, reference: &str) -> String {
        let (target, alias) = Self::split(reference);
        alias.unwrap_or(target).to_string()
    }
}
