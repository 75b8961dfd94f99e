//! In-memory reference implementation of [`TaskIndex`].
//!
//! Backs the integration tests and gives embedders a starting point: a
//! `BTreeMap` of tasks with lookup sets derived on demand. Mutators return
//! the matching [`IndexEvent`] so the host can forward it to
//! [`QueryEngine::handle_index_event`].
//!
//! [`QueryEngine::handle_index_event`]: crate::QueryEngine::handle_index_event

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tasklens_model::{TaskEntity, TaskPath, Vocabulary};

use crate::dates::anchor_day;
use crate::index::{IndexEvent, PathSet, TaskIndex};

/// A fully in-memory task index.
#[derive(Debug, Clone)]
pub struct MemoryTaskIndex {
    tasks: BTreeMap<TaskPath, TaskEntity>,
    vocabulary: Vocabulary,
    today: NaiveDate,
}

impl MemoryTaskIndex {
    /// Creates an empty index. `today` anchors the overdue set.
    pub fn new(vocabulary: Vocabulary, today: NaiveDate) -> Self {
        Self {
            tasks: BTreeMap::new(),
            vocabulary,
            today,
        }
    }

    /// Moves the overdue anchor day.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    /// Inserts or replaces a task, returning the matching event.
    pub fn insert(&mut self, task: TaskEntity) -> IndexEvent {
        let path = task.path.clone();
        match self.tasks.insert(path.clone(), task) {
            Some(_) => IndexEvent::Updated(path),
            None => IndexEvent::Added(path),
        }
    }

    /// Removes a task, returning the matching event if it existed.
    pub fn remove(&mut self, path: &TaskPath) -> Option<IndexEvent> {
        self.tasks
            .remove(path)
            .map(|_| IndexEvent::Deleted(path.clone()))
    }

    /// Moves a task to a new path, returning the matching event if the source
    /// existed.
    pub fn rename(&mut self, from: &TaskPath, to: TaskPath) -> Option<IndexEvent> {
        let mut task = self.tasks.remove(from)?;
        task.path = to.clone();
        self.tasks.insert(to.clone(), task);
        Some(IndexEvent::Renamed {
            from: from.clone(),
            to,
        })
    }

    /// Number of tasks in the index.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn collect_paths(&self, mut keep: impl FnMut(&TaskEntity) -> bool) -> PathSet {
        self.tasks
            .values()
            .filter(|t| keep(t))
            .map(|t| t.path.clone())
            .collect()
    }

    fn distinct(&self, mut pick: impl FnMut(&TaskEntity) -> Vec<String>) -> Vec<String> {
        let set: BTreeSet<String> = self
            .tasks
            .values()
            .flat_map(|t| pick(t))
            .filter(|s| !s.trim().is_empty())
            .collect();
        set.into_iter().collect()
    }

    fn due_day(task: &TaskEntity) -> Option<NaiveDate> {
        task.due.as_deref().and_then(anchor_day)
    }

    fn scheduled_day(task: &TaskEntity) -> Option<NaiveDate> {
        task.scheduled.as_deref().and_then(anchor_day)
    }
}

impl TaskIndex for MemoryTaskIndex {
    fn all_paths(&self) -> PathSet {
        self.tasks.keys().cloned().collect()
    }

    fn paths_by_status(&self, status: &str) -> PathSet {
        self.collect_paths(|t| t.status == status)
    }

    fn paths_by_date(&self, day: NaiveDate) -> PathSet {
        self.collect_paths(|t| {
            Self::due_day(t) == Some(day) || Self::scheduled_day(t) == Some(day)
        })
    }

    fn paths_before(&self, day: NaiveDate) -> PathSet {
        self.collect_paths(|t| {
            Self::due_day(t).is_some_and(|d| d < day)
                || Self::scheduled_day(t).is_some_and(|d| d < day)
        })
    }

    fn paths_after(&self, day: NaiveDate) -> PathSet {
        self.collect_paths(|t| {
            Self::due_day(t).is_some_and(|d| d > day)
                || Self::scheduled_day(t).is_some_and(|d| d > day)
        })
    }

    fn overdue_paths(&self) -> PathSet {
        self.collect_paths(|t| {
            Self::due_day(t).is_some_and(|d| d < self.today)
                && !self.vocabulary.status_completes(&t.status)
        })
    }

    async fn task_at(&self, path: &TaskPath) -> Option<TaskEntity> {
        self.tasks.get(path).cloned()
    }

    fn all_statuses(&self) -> Vec<String> {
        self.distinct(|t| vec![t.status.clone()])
    }

    fn all_priorities(&self) -> Vec<String> {
        self.distinct(|t| t.priority.iter().cloned().collect())
    }

    fn all_contexts(&self) -> Vec<String> {
        self.distinct(|t| t.contexts.clone())
    }

    fn all_projects(&self) -> Vec<String> {
        self.distinct(|t| t.projects.clone())
    }

    fn all_tags(&self) -> Vec<String> {
        self.distinct(|t| t.tags.clone())
    }

    fn all_folders(&self) -> Vec<String> {
        self.distinct(|t| {
            let path = t.path.as_str();
            match path.rsplit_once('/') {
                Some((folder, _)) => vec![folder.to_string()],
                None => Vec::new(),
            }
        })
    }
}
