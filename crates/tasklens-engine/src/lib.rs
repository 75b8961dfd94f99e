//! Filter/sort/group query engine over task collections.
//!
//! The engine answers "which tasks match this query, in what order, grouped
//! how?" against a mutable task collection owned by an external index. One
//! evaluation pass flows optimizer → materialization → evaluator → sort →
//! group:
//!
//! 1. The [`optimizer`] statically analyzes the filter tree and proposes a
//!    candidate path set from the index's precomputed lookups, always a
//!    superset of the true matches.
//! 2. Candidates are materialized through the index's async point lookup in
//!    fixed-size chunks.
//! 3. The [`evaluator`] filters the snapshot, the [`sort`] engine orders it,
//!    and the [`group`] engine partitions it into named, ordered buckets.
//!
//! Optimizer sub-queries and the selectable filter values are memoized in
//! short-lived caches, invalidated by the index-mutation events the host
//! forwards to [`QueryEngine::handle_index_event`].
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use tasklens_engine::{MemoryTaskIndex, NoRecurrence, QueryEngine};
//! use tasklens_model::{TaskEntity, Vocabulary};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
//! let mut index = MemoryTaskIndex::new(Vocabulary::default(), today);
//! let mut task = TaskEntity::new("inbox/call.md", "Call the plumber", "open");
//! task.due = Some("2025-06-10".to_string());
//! index.insert(task);
//!
//! let mut engine = QueryEngine::new(index, NoRecurrence, Vocabulary::default());
//! let result = engine.evaluate(&engine.default_query(), Some(today)).await;
//! assert_eq!(result.groups[0].tasks[0].title, "Call the plumber");
//! # }
//! ```

pub mod cache;
pub mod dates;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod index;
pub mod memory;
pub mod optimizer;
pub mod sort;

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use tasklens_model::{
    FilterQuery, QuickFilter, TaskEntity, TaskPath, UserFieldDefinition, UserFieldTable,
    Vocabulary,
};

pub use cache::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use group::TaskGroup;
pub use index::{
    IndexEvent, LinkResolver, NoRecurrence, PathSet, ProjectResolver, RecurrenceProvider,
    TaskIndex,
};
pub use memory::MemoryTaskIndex;

use cache::{OptionsCache, TtlCache};

/// Engine tunables. The defaults match production behavior; tests narrow
/// them.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Point lookups per materialization chunk.
    pub lookup_chunk: usize,
    /// Lifetime of memoized optimizer sub-queries.
    pub optimizer_ttl: Duration,
    /// Fallback lifetime of the selectable-values cache.
    pub options_ttl: Duration,
    /// Settle window before a mutation event invalidates the selectable
    /// values.
    pub options_settle: Duration,
    /// Whether completed tasks may still bucket as overdue.
    pub overdue_includes_completed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookup_chunk: 50,
            optimizer_ttl: Duration::from_secs(30),
            options_ttl: Duration::from_secs(300),
            options_settle: Duration::from_secs(30),
            overdue_includes_completed: false,
        }
    }
}

/// The distinct values a query-builder UI can offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectableValues {
    /// Distinct status keys.
    pub statuses: Vec<String>,
    /// Distinct priority keys.
    pub priorities: Vec<String>,
    /// Distinct contexts.
    pub contexts: Vec<String>,
    /// Distinct project references.
    pub projects: Vec<String>,
    /// Distinct tags.
    pub tags: Vec<String>,
    /// Distinct folders.
    pub folders: Vec<String>,
    /// Declared user fields.
    pub fields: Vec<UserFieldDefinition>,
}

/// Evaluation result: named buckets in display order, each holding tasks in
/// sort order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupedTasks {
    /// Ordered buckets.
    pub groups: Vec<TaskGroup>,
}

impl GroupedTasks {
    /// Looks up a bucket by name.
    pub fn get(&self, name: &str) -> Option<&TaskGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Bucket names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Total task count across buckets (project grouping counts
    /// multiplicities).
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    /// Whether the result holds no tasks at all.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.tasks.is_empty())
    }
}

/// The query engine facade.
///
/// Owns the collaborator handles, the vocabulary, and the result caches.
/// All operations are synchronous except [`evaluate`](QueryEngine::evaluate),
/// which awaits the chunked point lookups. The engine is single-threaded;
/// once an evaluation pass starts it runs on the snapshot it materialized
/// and never re-reads the index mid-pass.
pub struct QueryEngine<I, R> {
    index: I,
    recurrence: R,
    resolver: Box<dyn ProjectResolver + Send + Sync>,
    vocabulary: Vocabulary,
    fields: UserFieldTable,
    config: EngineConfig,
    clock: Box<dyn Clock + Send + Sync>,
    lookup_cache: TtlCache<PathSet>,
    options_cache: OptionsCache<SelectableValues>,
}

impl<I: TaskIndex, R: RecurrenceProvider> QueryEngine<I, R> {
    /// Creates an engine with the default config, the [`LinkResolver`], and
    /// the system clock.
    pub fn new(index: I, recurrence: R, vocabulary: Vocabulary) -> Self {
        let config = EngineConfig::default();
        let fields = vocabulary.field_table();
        Self {
            index,
            recurrence,
            resolver: Box::new(LinkResolver),
            fields,
            lookup_cache: TtlCache::new(config.optimizer_ttl),
            options_cache: OptionsCache::new(config.options_ttl, config.options_settle),
            vocabulary,
            config,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the config. Existing cache contents are discarded so the new
    /// lifetimes apply cleanly.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.lookup_cache = TtlCache::new(config.optimizer_ttl);
        self.options_cache = OptionsCache::new(config.options_ttl, config.options_settle);
        self.config = config;
        self
    }

    /// Replaces the project resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn ProjectResolver + Send + Sync>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the clock. Tests drive expiry with a [`ManualClock`].
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The underlying index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Mutable access to the underlying index. Remember to forward the
    /// resulting [`IndexEvent`]s to
    /// [`handle_index_event`](QueryEngine::handle_index_event).
    pub fn index_mut(&mut self) -> &mut I {
        &mut self.index
    }

    /// Runs a query: optimize, materialize, filter, sort, group.
    ///
    /// `reference` anchors "today"; it defaults to the current UTC calendar
    /// day. Internal failures never propagate: they are logged with their
    /// node id and property, and an empty result is returned.
    pub async fn evaluate(
        &mut self,
        query: &FilterQuery,
        reference: Option<NaiveDate>,
    ) -> GroupedTasks {
        let reference = reference.unwrap_or_else(|| Utc::now().date_naive());
        match self.run(query, reference).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    kind = err.kind(),
                    node = err.node_id(),
                    property = err.property(),
                    "query evaluation failed, returning empty result: {}",
                    err
                );
                GroupedTasks::default()
            }
        }
    }

    async fn run(&mut self, query: &FilterQuery, reference: NaiveDate) -> EngineResult<GroupedTasks> {
        let now = self.clock.now();
        let candidates =
            optimizer::candidate_paths(query, &self.index, &mut self.lookup_cache, now);

        // Materialize the snapshot in fixed-size chunks: caps concurrent
        // fan-out without blocking on the whole candidate set at once.
        let paths: Vec<TaskPath> = candidates.into_iter().collect();
        let mut tasks: Vec<TaskEntity> = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(self.config.lookup_chunk) {
            let fetched = join_all(chunk.iter().map(|path| self.index.task_at(path))).await;
            tasks.extend(fetched.into_iter().flatten());
        }

        let ctx = evaluator::EvalContext {
            vocabulary: &self.vocabulary,
            fields: &self.fields,
            resolver: self.resolver.as_ref(),
            recurrence: &self.recurrence,
            reference,
        };
        let mut matched = Vec::with_capacity(tasks.len());
        for task in tasks {
            if evaluator::evaluate_group(&query.root, &task, &ctx)? {
                matched.push(task);
            }
        }

        let sort_ctx = sort::SortContext {
            vocabulary: &self.vocabulary,
            fields: &self.fields,
        };
        sort::sort_tasks(&mut matched, &query.sort_key, query.sort_direction, &sort_ctx);

        let group_ctx = group::GroupContext {
            vocabulary: &self.vocabulary,
            fields: &self.fields,
            resolver: self.resolver.as_ref(),
            recurrence: &self.recurrence,
            reference,
            overdue_includes_completed: self.config.overdue_includes_completed,
            sort_key: &query.sort_key,
            sort_direction: query.sort_direction,
        };
        let groups = group::group_tasks(matched, &query.group_key, &group_ctx);

        Ok(GroupedTasks { groups })
    }

    /// Strict commit-time validation of a query's filter tree.
    pub fn validate(&self, query: &FilterQuery) -> EngineResult<()> {
        evaluator::validate_tree(&query.root, &self.fields)
    }

    /// The default query: match everything, sort by due date ascending, no
    /// grouping.
    pub fn default_query(&self) -> FilterQuery {
        FilterQuery::new().normalize()
    }

    /// Fills omitted query pieces with defaults. Idempotent, never fails.
    pub fn normalize(&self, query: FilterQuery) -> FilterQuery {
        query.normalize()
    }

    /// Adds or removes a quick-filter condition at the query root.
    pub fn toggle_quick_filter(
        &self,
        query: &FilterQuery,
        kind: QuickFilter,
        enabled: bool,
    ) -> FilterQuery {
        tasklens_model::toggle_quick_filter(query, kind, enabled)
    }

    /// The distinct selectable filter values, memoized with throttled
    /// freshness (see [`cache::OptionsCache`]).
    pub fn selectable_values(&mut self) -> SelectableValues {
        let now = self.clock.now();
        if let Some(values) = self.options_cache.get(now) {
            return values;
        }

        tracing::debug!("selectable values cache miss, rebuilding from index");
        let values = SelectableValues {
            statuses: self.index.all_statuses(),
            priorities: self.index.all_priorities(),
            contexts: self.index.all_contexts(),
            projects: self.index.all_projects(),
            tags: self.index.all_tags(),
            folders: self.index.all_folders(),
            fields: self.vocabulary.fields.clone(),
        };
        self.options_cache.fill(values.clone(), now);
        values
    }

    /// Forwards an index-mutation event: clears every memoized optimizer
    /// entry synchronously and marks the selectable-values cache for its
    /// throttled freshness check.
    pub fn handle_index_event(&mut self, event: &IndexEvent) {
        let now = self.clock.now();
        self.lookup_cache.clear();
        self.options_cache.mark_dirty(now);
        tracing::debug!(?event, "index mutation, optimizer cache cleared");
    }
}
