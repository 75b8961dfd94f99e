//! Index-aware candidate narrowing.
//!
//! Static analysis of a filter tree decides when it is safe to pre-narrow
//! the candidate set with the index's precomputed lookups before full
//! evaluation. The returned set is always a superset of the true match set:
//! whenever the tree shape is not provably safe, the optimizer falls back to
//! the full "all tasks" set. Correctness over speed.
//!
//! The safety rule is deliberately conservative: an indexable condition
//! reachable through any OR group disables optimization outright, because
//! narrowing by that condition could drop tasks its sibling branch would
//! have matched.

use std::time::Instant;

use tasklens_model::{
    Conjunction, FilterCondition, FilterGroup, FilterNode, FilterOperator, FilterProperty,
    FilterQuery,
};

use crate::cache::TtlCache;
use crate::dates::anchor_day;
use crate::index::{PathSet, TaskIndex};

/// An indexable condition found in the tree, with the shape facts the safety
/// rule needs.
struct IndexableHit<'a> {
    cond: &'a FilterCondition,
    under_or: bool,
    root_child: bool,
}

/// Computes the candidate path set for a query.
///
/// Lookups are memoized in `cache` under `property:operator:value` keys;
/// hits return owned copies that never alias the memoized state.
pub fn candidate_paths<I: TaskIndex>(
    query: &FilterQuery,
    index: &I,
    cache: &mut TtlCache<PathSet>,
    now: Instant,
) -> PathSet {
    let mut hits = Vec::new();
    collect(&query.root, false, true, &mut hits);

    if hits.is_empty() || hits.iter().any(|h| h.under_or) {
        return index.all_paths();
    }

    if hits.len() == 1 {
        return lookup(hits[0].cond, index, cache, now);
    }

    // Several indexable conditions intersect only when they are all direct
    // children of an AND root.
    let intersectable =
        query.root.conjunction == Conjunction::And && hits.iter().all(|h| h.root_child);
    if !intersectable {
        return index.all_paths();
    }

    let mut sets = hits.iter().map(|h| lookup(h.cond, index, cache, now));
    let first = sets.next().unwrap_or_default();
    sets.fold(first, |acc, set| &acc & &set)
}

fn collect<'a>(
    group: &'a FilterGroup,
    under_or: bool,
    is_root: bool,
    hits: &mut Vec<IndexableHit<'a>>,
) {
    let under_or = under_or || group.conjunction == Conjunction::Or;
    for child in &group.children {
        match child {
            FilterNode::Condition(cond) => {
                if is_indexable(cond) {
                    hits.push(IndexableHit {
                        cond,
                        under_or,
                        root_child: is_root,
                    });
                }
            }
            FilterNode::Group(nested) => collect(nested, under_or, false, hits),
        }
    }
}

/// A condition is indexable iff its property/operator/value combination has
/// a precomputed lookup: status equality, or due/scheduled equality and
/// before/after with a parseable day. A malformed value simply makes the
/// condition non-indexable, which degrades to the full-set path.
fn is_indexable(cond: &FilterCondition) -> bool {
    if !cond.is_complete() {
        return false;
    }
    let (Some(property), Some(operator)) = (&cond.property, cond.operator) else {
        return false;
    };
    match (property, operator) {
        (FilterProperty::Status, FilterOperator::Equals) => cond
            .value
            .as_ref()
            .and_then(|v| v.as_text())
            .is_some_and(|s| !s.trim().is_empty()),
        (
            FilterProperty::Due | FilterProperty::Scheduled,
            FilterOperator::Equals | FilterOperator::Before | FilterOperator::After,
        ) => cond
            .value
            .as_ref()
            .and_then(|v| v.as_text())
            .and_then(anchor_day)
            .is_some(),
        _ => false,
    }
}

fn lookup<I: TaskIndex>(
    cond: &FilterCondition,
    index: &I,
    cache: &mut TtlCache<PathSet>,
    now: Instant,
) -> PathSet {
    // is_indexable() guaranteed these.
    let property = cond.property.as_ref().expect("indexable condition");
    let operator = cond.operator.expect("indexable condition");
    let value = cond.value.as_ref().expect("indexable condition");

    let key = format!("{}:{}:{}", property, operator, value);
    if let Some(cached) = cache.get(&key, now) {
        return cached;
    }

    let set = match (property, operator) {
        (FilterProperty::Status, FilterOperator::Equals) => match value.as_text() {
            Some(status) => index.paths_by_status(status.trim()),
            None => index.all_paths(),
        },
        (FilterProperty::Due | FilterProperty::Scheduled, _) => {
            match value.as_text().and_then(anchor_day) {
                Some(day) => match operator {
                    FilterOperator::Equals => index.paths_by_date(day),
                    FilterOperator::Before => index.paths_before(day),
                    FilterOperator::After => index.paths_after(day),
                    _ => index.all_paths(),
                },
                // Malformed value: never exclude anything.
                None => index.all_paths(),
            }
        }
        _ => index.all_paths(),
    };

    cache.insert(key, set.clone(), now);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tasklens_model::{TaskEntity, TaskPath, Vocabulary};

    use crate::cache::{Clock, ManualClock};
    use crate::memory::MemoryTaskIndex;

    // ==================== Test Helpers ====================

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_index() -> MemoryTaskIndex {
        let mut index = MemoryTaskIndex::new(Vocabulary::default(), day(2025, 6, 10));

        let mut a = TaskEntity::new("a.md", "A", "open");
        a.due = Some("2025-06-09".to_string());
        index.insert(a);

        let mut b = TaskEntity::new("b.md", "B", "open");
        b.due = Some("2025-06-11".to_string());
        index.insert(b);

        let mut c = TaskEntity::new("c.md", "C", "done");
        c.due = Some("2025-06-09".to_string());
        index.insert(c);

        index.insert(TaskEntity::new("d.md", "D", "in-progress"));
        index
    }

    fn status_cond(id: &str, status: &str) -> FilterCondition {
        FilterCondition::new(id, FilterProperty::Status, FilterOperator::Equals)
            .with_value(status)
    }

    fn title_cond(id: &str, needle: &str) -> FilterCondition {
        FilterCondition::new(id, FilterProperty::Title, FilterOperator::Contains)
            .with_value(needle)
    }

    fn query_with_root(root: FilterGroup) -> FilterQuery {
        let mut query = FilterQuery::new();
        query.root = root;
        query
    }

    fn candidates(query: &FilterQuery, index: &MemoryTaskIndex) -> PathSet {
        let clock = ManualClock::new();
        let mut cache = TtlCache::new(std::time::Duration::from_secs(30));
        candidate_paths(query, index, &mut cache, clock.now())
    }

    fn paths(names: &[&str]) -> PathSet {
        names.iter().map(|n| TaskPath::from(*n)).collect()
    }

    // ==================== Shapes ====================

    #[test]
    fn test_no_indexable_conditions_returns_all() {
        let index = make_index();
        let query = query_with_root(FilterGroup::and("root").with_child(title_cond("c1", "A")));

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    #[test]
    fn test_empty_root_returns_all() {
        let index = make_index();
        let query = FilterQuery::new();

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    #[test]
    fn test_single_status_condition_uses_index() {
        let index = make_index();
        let query = query_with_root(FilterGroup::and("root").with_child(status_cond("c1", "open")));

        assert_eq!(candidates(&query, &index), paths(&["a.md", "b.md"]));
    }

    #[test]
    fn test_single_indexable_deep_under_and_chain_uses_index() {
        let index = make_index();
        // and(and(status = done), title contains "x"): the indexable leaf is
        // nested but never crosses an OR.
        let query = query_with_root(
            FilterGroup::and("root")
                .with_child(FilterGroup::and("g1").with_child(status_cond("c1", "done")))
                .with_child(title_cond("c2", "x")),
        );

        assert_eq!(candidates(&query, &index), paths(&["c.md"]));
    }

    #[test]
    fn test_or_root_disables_optimization() {
        let index = make_index();
        let query = query_with_root(
            FilterGroup::or("root")
                .with_child(status_cond("c1", "open"))
                .with_child(title_cond("c2", "D")),
        );

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    #[test]
    fn test_indexable_under_nested_or_disables_optimization() {
        let index = make_index();
        // and( or(status = open, title contains "D"), ... ): narrowing by
        // status would drop d.md even though the OR's other branch matches it.
        let query = query_with_root(
            FilterGroup::and("root").with_child(
                FilterGroup::or("g1")
                    .with_child(status_cond("c1", "open"))
                    .with_child(title_cond("c2", "D")),
            ),
        );

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    #[test]
    fn test_multiple_root_children_intersect() {
        let index = make_index();
        let query = query_with_root(
            FilterGroup::and("root")
                .with_child(status_cond("c1", "open"))
                .with_child(
                    FilterCondition::new("c2", FilterProperty::Due, FilterOperator::Equals)
                        .with_value("2025-06-09"),
                ),
        );

        assert_eq!(candidates(&query, &index), paths(&["a.md"]));
    }

    #[test]
    fn test_multiple_indexable_not_all_at_root_falls_back() {
        let index = make_index();
        // Two indexable conditions, one nested: shape is not the intersect
        // pattern, so the conservative fallback applies.
        let query = query_with_root(
            FilterGroup::and("root")
                .with_child(status_cond("c1", "open"))
                .with_child(FilterGroup::and("g1").with_child(status_cond("c2", "done"))),
        );

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    #[test]
    fn test_incomplete_condition_is_not_indexable() {
        let index = make_index();
        let query = query_with_root(
            FilterGroup::and("root").with_child(FilterCondition::new(
                "c1",
                FilterProperty::Status,
                FilterOperator::Equals,
            )),
        );

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    #[test]
    fn test_malformed_date_value_is_not_indexable() {
        let index = make_index();
        let query = query_with_root(
            FilterGroup::and("root").with_child(
                FilterCondition::new("c1", FilterProperty::Due, FilterOperator::Before)
                    .with_value("whenever"),
            ),
        );

        assert_eq!(candidates(&query, &index), index.all_paths());
    }

    // ==================== Date lookups ====================

    #[test]
    fn test_due_before_uses_range_lookup() {
        let index = make_index();
        let query = query_with_root(
            FilterGroup::and("root").with_child(
                FilterCondition::new("c1", FilterProperty::Due, FilterOperator::Before)
                    .with_value("2025-06-10"),
            ),
        );

        assert_eq!(candidates(&query, &index), paths(&["a.md", "c.md"]));
    }

    #[test]
    fn test_due_after_uses_range_lookup() {
        let index = make_index();
        let query = query_with_root(
            FilterGroup::and("root").with_child(
                FilterCondition::new("c1", FilterProperty::Due, FilterOperator::After)
                    .with_value("2025-06-10"),
            ),
        );

        assert_eq!(candidates(&query, &index), paths(&["b.md"]));
    }

    // ==================== Memoization ====================

    #[test]
    fn test_lookup_is_memoized_and_returns_copies() {
        let mut index = make_index();
        let clock = ManualClock::new();
        let mut cache = TtlCache::new(std::time::Duration::from_secs(30));
        let query = query_with_root(FilterGroup::and("root").with_child(status_cond("c1", "open")));

        let first = candidate_paths(&query, &index, &mut cache, clock.now());
        assert_eq!(first, paths(&["a.md", "b.md"]));
        assert_eq!(cache.len(), 1);

        // Mutate the index without invalidating: the memoized set is served.
        index.insert(TaskEntity::new("e.md", "E", "open"));
        let second = candidate_paths(&query, &index, &mut cache, clock.now());
        assert_eq!(second, paths(&["a.md", "b.md"]));

        // After a clear (what an index event triggers) the fresh set appears.
        cache.clear();
        let third = candidate_paths(&query, &index, &mut cache, clock.now());
        assert_eq!(third, paths(&["a.md", "b.md", "e.md"]));
    }

    #[test]
    fn test_memoized_entry_expires() {
        let mut index = make_index();
        let clock = ManualClock::new();
        let mut cache = TtlCache::new(std::time::Duration::from_secs(30));
        let query = query_with_root(FilterGroup::and("root").with_child(status_cond("c1", "open")));

        candidate_paths(&query, &index, &mut cache, clock.now());
        index.insert(TaskEntity::new("e.md", "E", "open"));

        clock.advance(std::time::Duration::from_secs(31));
        let after_expiry = candidate_paths(&query, &index, &mut cache, clock.now());
        assert_eq!(after_expiry, paths(&["a.md", "b.md", "e.md"]));
    }
}
