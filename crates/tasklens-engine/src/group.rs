//! Partitioning a sorted task list into named, ordered buckets.
//!
//! Every group key assigns exactly one bucket per task except project
//! grouping, the one many-to-many case. Date buckets are completion-aware:
//! a past date only means "Overdue" when the task's instance is not
//! completed. Derivation never fails; malformed values land in the no-date
//! bucket.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tasklens_model::{
    FieldValue, GroupKey, SortDirection, SortKey, TaskEntity, UserFieldKind, UserFieldTable,
    Vocabulary,
};

use crate::dates::anchor_day;
use crate::evaluator::instance_completed;
use crate::index::{ProjectResolver, RecurrenceProvider};

/// One named bucket of tasks, in sort order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskGroup {
    /// Bucket name, e.g. `Overdue` or a project name.
    pub name: String,
    /// Member tasks, preserving the input sort order.
    pub tasks: Vec<TaskEntity>,
}

/// Context for bucket derivation and ordering.
pub struct GroupContext<'a> {
    /// Status/priority vocabulary.
    pub vocabulary: &'a Vocabulary,
    /// User-field definition table.
    pub fields: &'a UserFieldTable,
    /// Project reference resolver.
    pub resolver: &'a dyn ProjectResolver,
    /// Recurrence oracle.
    pub recurrence: &'a dyn RecurrenceProvider,
    /// Reference calendar day.
    pub reference: NaiveDate,
    /// Whether completed tasks may still land in the overdue bucket.
    pub overdue_includes_completed: bool,
    /// Active sort key: when it matches the group key, bucket order follows
    /// the sort direction.
    pub sort_key: &'a SortKey,
    /// Active sort direction.
    pub sort_direction: SortDirection,
}

/// Ordering rank of a bucket: tier 1 buckets ("No Project", "none", unset
/// field values) always come last, then the numeric rank, then the folded
/// name.
#[derive(Debug, Clone, PartialEq)]
struct BucketRank {
    tier: u8,
    number: f64,
    text: String,
}

impl BucketRank {
    fn named(text: &str) -> Self {
        Self {
            tier: 0,
            number: 0.0,
            text: text.to_lowercase(),
        }
    }

    fn numbered(number: f64) -> Self {
        Self {
            tier: 0,
            number,
            text: String::new(),
        }
    }

    fn last() -> Self {
        Self {
            tier: 1,
            number: 0.0,
            text: String::new(),
        }
    }

    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tier
            .cmp(&other.tier)
            .then(
                self.number
                    .partial_cmp(&other.number)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| self.text.cmp(&other.text))
    }
}

struct Buckets {
    groups: Vec<(BucketRank, TaskGroup)>,
    by_name: HashMap<String, usize>,
}

impl Buckets {
    fn new() -> Self {
        Self {
            groups: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn push(&mut self, name: String, rank: BucketRank, task: TaskEntity) {
        if let Some(&slot) = self.by_name.get(&name) {
            self.groups[slot].1.tasks.push(task);
            return;
        }
        self.by_name.insert(name.clone(), self.groups.len());
        self.groups.push((rank, TaskGroup {
            name,
            tasks: vec![task],
        }));
    }

    fn into_ordered(mut self, reverse: bool) -> Vec<TaskGroup> {
        self.groups.sort_by(|a, b| a.0.cmp(&b.0));
        if reverse {
            self.groups.reverse();
        }
        self.groups.into_iter().map(|(_, g)| g).collect()
    }
}

/// Fixed semantic order of the due-date buckets.
const DUE_SEQUENCE: [&str; 6] = [
    "Overdue",
    "Today",
    "Tomorrow",
    "This week",
    "Later",
    "No due date",
];

/// Fixed semantic order of the scheduled-date buckets.
const SCHEDULED_SEQUENCE: [&str; 6] = [
    "Past scheduled",
    "Today",
    "Tomorrow",
    "This week",
    "Later",
    "No scheduled date",
];

/// Partitions a sorted task list into ordered buckets.
pub fn group_tasks(tasks: Vec<TaskEntity>, key: &GroupKey, ctx: &GroupContext<'_>) -> Vec<TaskGroup> {
    let mut buckets = Buckets::new();

    for task in tasks {
        match key {
            GroupKey::None => {
                buckets.push("all".to_string(), BucketRank::numbered(0.0), task);
            }
            GroupKey::Status => {
                let (name, rank) = status_bucket(&task, ctx);
                buckets.push(name, rank, task);
            }
            GroupKey::Priority => {
                let (name, rank) = priority_bucket(&task, ctx);
                buckets.push(name, rank, task);
            }
            GroupKey::Context => {
                let (name, rank) = context_bucket(&task);
                buckets.push(name, rank, task);
            }
            GroupKey::Due => {
                let name = date_bucket(&task, task.due.as_deref(), &DUE_SEQUENCE, ctx);
                let rank = sequence_rank(name, &DUE_SEQUENCE);
                buckets.push(name.to_string(), rank, task);
            }
            GroupKey::Scheduled => {
                let name = date_bucket(&task, task.scheduled.as_deref(), &SCHEDULED_SEQUENCE, ctx);
                let rank = sequence_rank(name, &SCHEDULED_SEQUENCE);
                buckets.push(name.to_string(), rank, task);
            }
            GroupKey::Project => {
                // The one many-to-many key: a task appears once per project
                // reference, or once under "No Project".
                let refs: Vec<(String, String)> = task
                    .projects
                    .iter()
                    .filter_map(|r| {
                        let canonical = ctx.resolver.canonical(r);
                        if canonical.is_empty() {
                            None
                        } else {
                            Some((canonical, ctx.resolver.display(r)))
                        }
                    })
                    .collect();

                if refs.is_empty() {
                    buckets.push("No Project".to_string(), BucketRank::last(), task);
                } else {
                    let mut seen = Vec::new();
                    for (canonical, display) in refs {
                        if seen.contains(&canonical) {
                            continue;
                        }
                        seen.push(canonical);
                        buckets.push(display.clone(), BucketRank::named(&display), task.clone());
                    }
                }
            }
            GroupKey::User(id) => {
                let (name, rank) = user_bucket(&task, id, ctx);
                buckets.push(name, rank, task);
            }
        }
    }

    let reverse =
        matches_sort_key(key, ctx.sort_key) && ctx.sort_direction == SortDirection::Desc;
    buckets.into_ordered(reverse)
}

/// Whether the group key and sort key address the same task property.
fn matches_sort_key(group_key: &GroupKey, sort_key: &SortKey) -> bool {
    matches!(
        (group_key, sort_key),
        (GroupKey::Priority, SortKey::Priority)
            | (GroupKey::Due, SortKey::Due)
            | (GroupKey::Scheduled, SortKey::Scheduled)
    ) || matches!(
        (group_key, sort_key),
        (GroupKey::User(a), SortKey::User(b)) if a == b
    )
}

fn status_bucket(task: &TaskEntity, ctx: &GroupContext<'_>) -> (String, BucketRank) {
    match ctx.vocabulary.status(&task.status) {
        Some(def) => (def.name.clone(), BucketRank::numbered(f64::from(def.display_order))),
        // Undeclared statuses come after declared ones, alphabetically.
        None => (
            task.status.clone(),
            BucketRank {
                tier: 0,
                number: f64::MAX,
                text: task.status.to_lowercase(),
            },
        ),
    }
}

fn priority_bucket(task: &TaskEntity, ctx: &GroupContext<'_>) -> (String, BucketRank) {
    let weight = task
        .priority
        .as_deref()
        .and_then(|key| ctx.vocabulary.priority_weight(key));
    match (task.priority.as_deref(), weight) {
        // Descending weight: most urgent bucket first.
        (Some(key), Some(weight)) => (key.to_string(), BucketRank::numbered(f64::from(-weight))),
        (Some(key), None) => (key.to_string(), BucketRank::named(key)),
        (None, _) => ("No Priority".to_string(), BucketRank::last()),
    }
}

fn context_bucket(task: &TaskEntity) -> (String, BucketRank) {
    match task.contexts.iter().find(|c| !c.trim().is_empty()) {
        Some(context) => (context.clone(), BucketRank::named(context)),
        None => ("none".to_string(), BucketRank::last()),
    }
}

/// Completion-aware date bucketing. `sequence` supplies the names so due and
/// scheduled share one derivation.
fn date_bucket<'s>(
    task: &TaskEntity,
    stamp: Option<&str>,
    sequence: &'s [&'s str; 6],
    ctx: &GroupContext<'_>,
) -> &'s str {
    let [past, today, tomorrow, this_week, later, no_date] = *sequence;

    // A recurring task whose instance falls on the reference day is "Today"
    // regardless of its anchor date.
    if task.is_recurring() && ctx.recurrence.is_due_on(task, ctx.reference) {
        return today;
    }

    let Some(day) = stamp.and_then(anchor_day) else {
        return no_date;
    };

    if day < ctx.reference {
        let completed = instance_completed(task, ctx.vocabulary, ctx.reference);
        if completed && !ctx.overdue_includes_completed {
            // Completed tasks are not overdue; nothing else in the sequence
            // fits a past date, so they fall through to the no-date bucket.
            return no_date;
        }
        return past;
    }

    match (day - ctx.reference).num_days() {
        0 => today,
        1 => tomorrow,
        2..=7 => this_week,
        _ => later,
    }
}

fn sequence_rank(name: &str, sequence: &[&str; 6]) -> BucketRank {
    let position = sequence.iter().position(|s| *s == name).unwrap_or(5);
    BucketRank::numbered(position as f64)
}

/// Type-aware bucket derivation for user fields, mirroring the sort rules:
/// numeric buckets descend, boolean buckets put true first, date buckets
/// ascend, everything else is alphabetical; unset values come last.
fn user_bucket(task: &TaskEntity, id: &str, ctx: &GroupContext<'_>) -> (String, BucketRank) {
    let missing = || ("none".to_string(), BucketRank::last());
    let Some(kind) = ctx.fields.kind(id) else {
        return missing();
    };
    let Some(value) = task.field(id) else {
        return missing();
    };

    match kind {
        UserFieldKind::Number => match value.as_number() {
            Some(n) => (format_number(n), BucketRank::numbered(-n)),
            None => missing(),
        },
        UserFieldKind::Bool => match value.as_bool() {
            Some(true) => ("true".to_string(), BucketRank::numbered(0.0)),
            Some(false) => ("false".to_string(), BucketRank::numbered(1.0)),
            None => missing(),
        },
        UserFieldKind::Date => match value.as_text().and_then(anchor_day) {
            Some(day) => (
                day.to_string(),
                BucketRank::numbered(f64::from(day.num_days_from_ce())),
            ),
            None => missing(),
        },
        UserFieldKind::List => match value.as_list().and_then(|items| items.first()) {
            Some(first) => (first.clone(), BucketRank::named(first)),
            None => missing(),
        },
        UserFieldKind::Text => match value.as_text().filter(|s| !s.trim().is_empty()) {
            Some(text) => (text.to_string(), BucketRank::named(text)),
            None => missing(),
        },
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
