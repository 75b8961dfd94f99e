//! Multi-key sorting with a deterministic tie-break chain.
//!
//! One comparator per key, each returning an [`Ordering`]. When the primary
//! key ties, a fixed fallback chain (scheduled date, due date, priority,
//! title, skipping whichever was primary) resolves the tie. The requested
//! direction negates the final comparison only; the chain's internal
//! ordering is never reversed on its own.
//!
//! Comparators never fail: malformed or missing values sort after valid
//! ones.

use std::cmp::Ordering;

use tasklens_model::{
    FieldValue, SortDirection, SortKey, TaskEntity, UserFieldKind, UserFieldTable, Vocabulary,
};

use crate::dates::{anchor_day, anchor_timestamp, compare_days};

/// Lookup context for comparators.
pub struct SortContext<'a> {
    /// Status/priority vocabulary.
    pub vocabulary: &'a Vocabulary,
    /// User-field definition table.
    pub fields: &'a UserFieldTable,
}

/// Fallback chain applied on primary-key ties, in order.
const FALLBACK_CHAIN: [SortKey; 4] = [
    SortKey::Scheduled,
    SortKey::Due,
    SortKey::Priority,
    SortKey::Title,
];

/// Sorts tasks by the given key and direction, in place. Stable with respect
/// to exact duplicates.
pub fn sort_tasks(
    tasks: &mut [TaskEntity],
    key: &SortKey,
    direction: SortDirection,
    ctx: &SortContext<'_>,
) {
    tasks.sort_by(|a, b| {
        let ord = compare_with_fallback(a, b, key, ctx);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Primary comparison plus the fallback chain, without direction applied.
pub fn compare_with_fallback(
    a: &TaskEntity,
    b: &TaskEntity,
    key: &SortKey,
    ctx: &SortContext<'_>,
) -> Ordering {
    let ord = compare_by_key(a, b, key, ctx);
    if ord != Ordering::Equal {
        return ord;
    }
    for fallback in &FALLBACK_CHAIN {
        if fallback == key {
            continue;
        }
        let ord = compare_by_key(a, b, fallback, ctx);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Signed comparison by a single key.
pub fn compare_by_key(
    a: &TaskEntity,
    b: &TaskEntity,
    key: &SortKey,
    ctx: &SortContext<'_>,
) -> Ordering {
    match key {
        SortKey::Order => cmp_numbers(a.order, b.order),
        SortKey::Due => compare_days(
            a.due.as_deref().and_then(anchor_day),
            b.due.as_deref().and_then(anchor_day),
        ),
        SortKey::Scheduled => compare_days(
            a.scheduled.as_deref().and_then(anchor_day),
            b.scheduled.as_deref().and_then(anchor_day),
        ),
        SortKey::Created => compare_days(
            a.created_at.as_ref().map(anchor_timestamp),
            b.created_at.as_ref().map(anchor_timestamp),
        ),
        SortKey::Modified => compare_days(
            a.modified_at.as_ref().map(anchor_timestamp),
            b.modified_at.as_ref().map(anchor_timestamp),
        ),
        SortKey::Priority => compare_priorities(a, b, ctx),
        SortKey::Title => cmp_folded(&a.title, &b.title),
        SortKey::StoryPoints => cmp_numbers(a.story_points, b.story_points),
        SortKey::User(id) => compare_user_field(a, b, id, ctx),
    }
}

/// Priority compares by descending weight: an "ascending" sort still puts
/// the most urgent tasks first. Unset or unknown keys sort last.
fn compare_priorities(a: &TaskEntity, b: &TaskEntity, ctx: &SortContext<'_>) -> Ordering {
    let weight = |task: &TaskEntity| {
        task.priority
            .as_deref()
            .and_then(|key| ctx.vocabulary.priority_weight(key))
    };
    cmp_numbers(
        weight(a).map(|w| f64::from(-w)),
        weight(b).map(|w| f64::from(-w)),
    )
}

/// User fields compare per their declared kind; type-mismatched or
/// unparsable values sort after valid ones, and unknown fields tie.
fn compare_user_field(a: &TaskEntity, b: &TaskEntity, id: &str, ctx: &SortContext<'_>) -> Ordering {
    let Some(kind) = ctx.fields.kind(id) else {
        return Ordering::Equal;
    };
    let va = a.field(id);
    let vb = b.field(id);

    match kind {
        UserFieldKind::Number => cmp_numbers(
            va.and_then(FieldValue::as_number),
            vb.and_then(FieldValue::as_number),
        ),
        UserFieldKind::Bool => {
            // true before false before unset.
            let rank = |v: Option<&FieldValue>| match v.and_then(FieldValue::as_bool) {
                Some(true) => 0u8,
                Some(false) => 1,
                None => 2,
            };
            rank(va).cmp(&rank(vb))
        }
        UserFieldKind::Date => compare_days(
            va.and_then(FieldValue::as_text).and_then(anchor_day),
            vb.and_then(FieldValue::as_text).and_then(anchor_day),
        ),
        UserFieldKind::List => {
            let first = |v: Option<&FieldValue>| {
                v.and_then(FieldValue::as_list)
                    .and_then(|items| items.first())
                    .map(|s| s.to_lowercase())
            };
            cmp_options(first(va), first(vb))
        }
        UserFieldKind::Text => cmp_options(
            va.and_then(FieldValue::as_text).map(str::to_lowercase),
            vb.and_then(FieldValue::as_text).map(str::to_lowercase),
        ),
    }
}

/// Case-folded lexical compare.
fn cmp_folded(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Optional numeric compare; absent values sort last, NaN ties.
fn cmp_numbers(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Optional ordered compare; absent values sort last.
fn cmp_options<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasklens_model::UserFieldDefinition;

    // ==================== Test Helpers ====================

    fn make_task(path: &str, title: &str) -> TaskEntity {
        TaskEntity::new(path, title, "open")
    }

    fn vocab() -> Vocabulary {
        let mut vocab = Vocabulary::default();
        vocab.fields = vec![
            UserFieldDefinition::new("effort", "Effort", UserFieldKind::Number),
            UserFieldDefinition::new("reviewed", "Reviewed", UserFieldKind::Bool),
            UserFieldDefinition::new("milestone", "Milestone", UserFieldKind::Date),
            UserFieldDefinition::new("teams", "Teams", UserFieldKind::List),
        ];
        vocab
    }

    fn sorted_titles(
        mut tasks: Vec<TaskEntity>,
        key: SortKey,
        direction: SortDirection,
    ) -> Vec<String> {
        let vocab = vocab();
        let fields = vocab.field_table();
        let ctx = SortContext {
            vocabulary: &vocab,
            fields: &fields,
        };
        sort_tasks(&mut tasks, &key, direction, &ctx);
        tasks.into_iter().map(|t| t.title).collect()
    }

    // ==================== Primary keys ====================

    #[test]
    fn test_sort_by_due_ascending() {
        let mut a = make_task("a.md", "A");
        a.due = Some("2025-01-10".to_string());
        let mut b = make_task("b.md", "B");
        b.due = Some("2025-01-05".to_string());
        let mut c = make_task("c.md", "C");
        c.due = Some("2025-01-01".to_string());

        assert_eq!(
            sorted_titles(vec![a, b, c], SortKey::Due, SortDirection::Asc),
            vec!["C", "B", "A"]
        );
    }

    #[test]
    fn test_sort_by_due_missing_last() {
        let mut a = make_task("a.md", "A");
        a.due = Some("2025-01-10".to_string());
        let b = make_task("b.md", "B");
        let mut c = make_task("c.md", "C");
        c.due = Some("garbage".to_string());

        let titles = sorted_titles(vec![b, c, a], SortKey::Due, SortDirection::Asc);
        assert_eq!(titles[0], "A");
        // Unset and unparsable both sort after valid dates.
        assert_eq!(titles.len(), 3);
    }

    #[test]
    fn test_sort_by_priority_ascending_puts_urgent_first() {
        let mut a = make_task("a.md", "A");
        a.priority = Some("low".to_string());
        let mut b = make_task("b.md", "B");
        b.priority = Some("urgent".to_string());
        let mut c = make_task("c.md", "C");
        c.priority = Some("normal".to_string());
        let d = make_task("d.md", "D");

        assert_eq!(
            sorted_titles(vec![a, b, c, d], SortKey::Priority, SortDirection::Asc),
            vec!["B", "C", "A", "D"]
        );
    }

    #[test]
    fn test_sort_by_title_case_folded() {
        let a = make_task("a.md", "banana");
        let b = make_task("b.md", "Apple");
        let c = make_task("c.md", "cherry");

        assert_eq!(
            sorted_titles(vec![a, b, c], SortKey::Title, SortDirection::Asc),
            vec!["Apple", "banana", "cherry"]
        );
    }

    #[test]
    fn test_sort_by_manual_order() {
        let mut a = make_task("a.md", "A");
        a.order = Some(3.0);
        let mut b = make_task("b.md", "B");
        b.order = Some(1.0);
        let c = make_task("c.md", "C");

        assert_eq!(
            sorted_titles(vec![a, b, c], SortKey::Order, SortDirection::Asc),
            vec!["B", "A", "C"]
        );
    }

    #[test]
    fn test_sort_by_story_points() {
        let mut a = make_task("a.md", "A");
        a.story_points = Some(8.0);
        let mut b = make_task("b.md", "B");
        b.story_points = Some(2.0);

        assert_eq!(
            sorted_titles(vec![a, b], SortKey::StoryPoints, SortDirection::Asc),
            vec!["B", "A"]
        );
    }

    // ==================== Direction ====================

    #[test]
    fn test_desc_reverses_total_order() {
        let mut a = make_task("a.md", "A");
        a.due = Some("2025-01-10".to_string());
        let mut b = make_task("b.md", "B");
        b.due = Some("2025-01-05".to_string());
        let mut c = make_task("c.md", "C");
        c.due = Some("2025-01-01".to_string());

        let asc = sorted_titles(
            vec![a.clone(), b.clone(), c.clone()],
            SortKey::Due,
            SortDirection::Asc,
        );
        let desc = sorted_titles(vec![a, b, c], SortKey::Due, SortDirection::Desc);

        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
    }

    #[test]
    fn test_sorting_sorted_list_is_noop() {
        let mut a = make_task("a.md", "A");
        a.due = Some("2025-01-03".to_string());
        let mut b = make_task("b.md", "B");
        b.due = Some("2025-01-05".to_string());
        let mut c = make_task("c.md", "C");
        c.due = Some("2025-01-01".to_string());

        let vocab = vocab();
        let fields = vocab.field_table();
        let ctx = SortContext {
            vocabulary: &vocab,
            fields: &fields,
        };

        let mut tasks = vec![a, b, c];
        sort_tasks(&mut tasks, &SortKey::Due, SortDirection::Asc, &ctx);
        let once: Vec<String> = tasks.iter().map(|t| t.title.clone()).collect();

        // Re-sorting the sorted list changes nothing.
        sort_tasks(&mut tasks, &SortKey::Due, SortDirection::Asc, &ctx);
        let twice: Vec<String> = tasks.iter().map(|t| t.title.clone()).collect();

        assert_eq!(once, vec!["C", "A", "B"]);
        assert_eq!(once, twice);
    }

    // ==================== Fallback chain ====================

    #[test]
    fn test_tie_falls_back_to_scheduled_then_due() {
        // Same priority; scheduled differs.
        let mut a = make_task("a.md", "A");
        a.priority = Some("high".to_string());
        a.scheduled = Some("2025-02-02".to_string());
        let mut b = make_task("b.md", "B");
        b.priority = Some("high".to_string());
        b.scheduled = Some("2025-02-01".to_string());

        assert_eq!(
            sorted_titles(vec![a, b], SortKey::Priority, SortDirection::Asc),
            vec!["B", "A"]
        );
    }

    #[test]
    fn test_tie_chain_skips_primary_key() {
        // Sorting by scheduled with equal scheduled dates: the chain moves to
        // due without re-comparing scheduled.
        let mut a = make_task("a.md", "A");
        a.scheduled = Some("2025-02-01".to_string());
        a.due = Some("2025-03-05".to_string());
        let mut b = make_task("b.md", "B");
        b.scheduled = Some("2025-02-01".to_string());
        b.due = Some("2025-03-01".to_string());

        assert_eq!(
            sorted_titles(vec![a, b], SortKey::Scheduled, SortDirection::Asc),
            vec!["B", "A"]
        );
    }

    #[test]
    fn test_tie_chain_ends_at_title() {
        let mut a = make_task("a.md", "Zebra");
        a.priority = Some("high".to_string());
        let mut b = make_task("b.md", "Aardvark");
        b.priority = Some("high".to_string());

        assert_eq!(
            sorted_titles(vec![a, b], SortKey::Priority, SortDirection::Asc),
            vec!["Aardvark", "Zebra"]
        );
    }

    #[test]
    fn test_chain_is_deterministic_total_order() {
        let mut a = make_task("a.md", "Same");
        a.due = Some("2025-01-01".to_string());
        let mut b = make_task("b.md", "Same");
        b.due = Some("2025-01-01".to_string());

        let vocab = vocab();
        let fields = vocab.field_table();
        let ctx = SortContext {
            vocabulary: &vocab,
            fields: &fields,
        };
        // Identical fallback values: exact duplicates tie.
        assert_eq!(
            compare_with_fallback(&a, &b, &SortKey::Due, &ctx),
            Ordering::Equal
        );
    }

    // ==================== User fields ====================

    fn with_field(title: &str, id: &str, value: FieldValue) -> TaskEntity {
        let mut task = make_task(&format!("{}.md", title), title);
        task.fields.insert(id.to_string(), value);
        task
    }

    #[test]
    fn test_user_number_field_sorts_numerically() {
        let a = with_field("A", "effort", FieldValue::Number(10.0));
        let b = with_field("B", "effort", FieldValue::Number(2.0));
        let c = make_task("c.md", "C");

        assert_eq!(
            sorted_titles(
                vec![a, b, c],
                SortKey::User("effort".to_string()),
                SortDirection::Asc
            ),
            vec!["B", "A", "C"]
        );
    }

    #[test]
    fn test_user_number_field_mismatched_type_sorts_last() {
        let a = with_field("A", "effort", FieldValue::Text("high".to_string()));
        let b = with_field("B", "effort", FieldValue::Number(1.0));

        assert_eq!(
            sorted_titles(
                vec![a, b],
                SortKey::User("effort".to_string()),
                SortDirection::Asc
            ),
            vec!["B", "A"]
        );
    }

    #[test]
    fn test_user_bool_field_true_false_unset() {
        let a = with_field("A", "reviewed", FieldValue::Bool(false));
        let b = with_field("B", "reviewed", FieldValue::Bool(true));
        let c = make_task("c.md", "C");

        assert_eq!(
            sorted_titles(
                vec![a, b, c],
                SortKey::User("reviewed".to_string()),
                SortDirection::Asc
            ),
            vec!["B", "A", "C"]
        );
    }

    #[test]
    fn test_user_date_field_sorts_by_anchor_day() {
        let a = with_field("A", "milestone", FieldValue::Date("2025-09-01".to_string()));
        let b = with_field("B", "milestone", FieldValue::Date("2025-03-01".to_string()));
        let c = with_field("C", "milestone", FieldValue::Date("not a date".to_string()));

        assert_eq!(
            sorted_titles(
                vec![a, b, c],
                SortKey::User("milestone".to_string()),
                SortDirection::Asc
            ),
            vec!["B", "A", "C"]
        );
    }

    #[test]
    fn test_user_list_field_sorts_by_first_token() {
        let a = with_field(
            "A",
            "teams",
            FieldValue::List(vec!["platform".to_string(), "api".to_string()]),
        );
        let b = with_field("B", "teams", FieldValue::List(vec!["api".to_string()]));
        let c = with_field("C", "teams", FieldValue::List(vec![]));

        assert_eq!(
            sorted_titles(
                vec![a, b, c],
                SortKey::User("teams".to_string()),
                SortDirection::Asc
            ),
            vec!["B", "A", "C"]
        );
    }

    #[test]
    fn test_unknown_user_field_falls_back_to_chain() {
        let mut a = make_task("a.md", "A");
        a.due = Some("2025-01-02".to_string());
        let mut b = make_task("b.md", "B");
        b.due = Some("2025-01-01".to_string());

        assert_eq!(
            sorted_titles(
                vec![a, b],
                SortKey::User("missing".to_string()),
                SortDirection::Asc
            ),
            vec!["B", "A"]
        );
    }
}
