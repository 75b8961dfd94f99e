//! Filter evaluation against task snapshots.
//!
//! [`evaluate`] recursively decides whether a single task satisfies a filter
//! node. Incomplete conditions are treated as always-true (a query under
//! construction keeps producing sensible results); structural problems only
//! surface through the stricter [`validate`] path used at commit time.

use chrono::NaiveDate;
use tasklens_model::{
    FieldValue, FilterCondition, FilterGroup, FilterNode, FilterOperator, FilterProperty,
    Recurrence, TaskEntity, UserFieldKind, UserFieldTable, Vocabulary,
};

use crate::dates::anchor_day;
use crate::error::{EngineError, EngineResult};
use crate::index::{ProjectResolver, RecurrenceProvider};

/// Context for filter evaluation: the vocabulary, the user-field table, the
/// pluggable collaborators, and the reference day.
pub struct EvalContext<'a> {
    /// Status/priority vocabulary.
    pub vocabulary: &'a Vocabulary,
    /// User-field definition table.
    pub fields: &'a UserFieldTable,
    /// Project reference resolver.
    pub resolver: &'a dyn ProjectResolver,
    /// Recurrence oracle.
    pub recurrence: &'a dyn RecurrenceProvider,
    /// Reference calendar day for completeness and date comparisons.
    pub reference: NaiveDate,
}

/// Evaluates a filter node against a task.
pub fn evaluate(node: &FilterNode, task: &TaskEntity, ctx: &EvalContext<'_>) -> EngineResult<bool> {
    match node {
        FilterNode::Condition(cond) => {
            if !cond.is_complete() {
                return Ok(true);
            }
            evaluate_condition(cond, task, ctx)
        }
        FilterNode::Group(group) => evaluate_group(group, task, ctx),
    }
}

/// Evaluates a group node. Incomplete condition children are filtered out
/// first; a group left with zero complete children matches unconditionally
/// (inert, not false).
pub fn evaluate_group(
    group: &FilterGroup,
    task: &TaskEntity,
    ctx: &EvalContext<'_>,
) -> EngineResult<bool> {
    let active = group.children.iter().filter(|child| match child {
        FilterNode::Condition(cond) => cond.is_complete(),
        FilterNode::Group(_) => true,
    });

    match group.conjunction {
        tasklens_model::Conjunction::And => {
            for child in active {
                if !evaluate(child, task, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        tasklens_model::Conjunction::Or => {
            let mut considered = false;
            for child in active {
                considered = true;
                if evaluate(child, task, ctx)? {
                    return Ok(true);
                }
            }
            Ok(!considered)
        }
    }
}

/// Instance-aware completeness: a recurring task is asked "is this instance,
/// for the reference day, complete," a plain task consults its status key.
pub(crate) fn instance_completed(
    task: &TaskEntity,
    vocabulary: &Vocabulary,
    reference: NaiveDate,
) -> bool {
    if task.is_recurring() {
        task.completed_instances.contains(&reference)
    } else {
        vocabulary.status_completes(&task.status)
    }
}

fn describe_recurrence(rec: &Recurrence) -> String {
    match rec {
        Recurrence::Rrule(rule) => rule.clone(),
        Recurrence::Legacy(legacy) => format!("every {} {}", legacy.interval, legacy.frequency),
    }
}

/// Resolves a task's property value. `None` means the property is unset.
fn resolve_property(
    task: &TaskEntity,
    property: &FilterProperty,
    ctx: &EvalContext<'_>,
) -> Option<FieldValue> {
    match property {
        FilterProperty::Title => Some(FieldValue::Text(task.title.clone())),
        FilterProperty::Status => Some(FieldValue::Text(task.status.clone())),
        FilterProperty::StatusCompleted => Some(FieldValue::Bool(instance_completed(
            task,
            ctx.vocabulary,
            ctx.reference,
        ))),
        FilterProperty::Priority => task.priority.clone().map(FieldValue::Text),
        FilterProperty::Due => task.due.clone().map(FieldValue::Date),
        FilterProperty::Scheduled => task.scheduled.clone().map(FieldValue::Date),
        FilterProperty::Created => task
            .created_at
            .map(|ts| FieldValue::Date(ts.to_rfc3339())),
        FilterProperty::Modified => task
            .modified_at
            .map(|ts| FieldValue::Date(ts.to_rfc3339())),
        FilterProperty::Tags => Some(FieldValue::List(task.tags.clone())),
        FilterProperty::Contexts => Some(FieldValue::List(task.contexts.clone())),
        FilterProperty::Projects => Some(FieldValue::List(task.projects.clone())),
        FilterProperty::Archived => Some(FieldValue::Bool(task.archived)),
        FilterProperty::Recurrence => task
            .recurrence
            .as_ref()
            .map(|rec| FieldValue::Text(describe_recurrence(rec))),
        FilterProperty::StoryPoints => task.story_points.map(FieldValue::Number),
        FilterProperty::User(id) => task.field(id).cloned(),
    }
}

fn evaluate_condition(
    cond: &FilterCondition,
    task: &TaskEntity,
    ctx: &EvalContext<'_>,
) -> EngineResult<bool> {
    // is_complete() guaranteed these.
    let property = cond.property.as_ref().expect("complete condition");
    let operator = cond.operator.expect("complete condition");

    let resolved = resolve_property(task, property, ctx);
    let projects = matches!(property, FilterProperty::Projects).then_some(ctx.resolver);

    match operator {
        FilterOperator::Empty => Ok(resolved.as_ref().is_none_or(FieldValue::is_empty)),
        FilterOperator::NotEmpty => Ok(!resolved.as_ref().is_none_or(FieldValue::is_empty)),

        FilterOperator::Checked => Ok(matches!(resolved, Some(FieldValue::Bool(true)))),
        FilterOperator::NotChecked => Ok(!matches!(resolved, Some(FieldValue::Bool(true)))),

        FilterOperator::Equals => Ok(equals_any(resolved.as_ref(), cond, projects)),
        FilterOperator::NotEquals => Ok(!equals_any(resolved.as_ref(), cond, projects)),

        FilterOperator::Contains => Ok(contains_any(resolved.as_ref(), cond, projects)),
        FilterOperator::NotContains => Ok(!contains_any(resolved.as_ref(), cond, projects)),

        FilterOperator::Before
        | FilterOperator::After
        | FilterOperator::OnOrBefore
        | FilterOperator::OnOrAfter => compare_dates(cond, operator, resolved.as_ref()),

        FilterOperator::GreaterThan | FilterOperator::LessThan => {
            compare_numbers(cond, operator, resolved.as_ref())
        }
    }
}

/// List-aware equality: any task value equal to any condition value.
fn equals_any(
    resolved: Option<&FieldValue>,
    cond: &FilterCondition,
    projects: Option<&dyn ProjectResolver>,
) -> bool {
    let value = cond.value.as_ref().expect("complete condition");
    let Some(resolved) = resolved else {
        return false;
    };

    match resolved {
        FieldValue::List(items) => {
            let wanted = value.text_items();
            items
                .iter()
                .any(|item| wanted.iter().any(|w| text_eq(item, w, projects)))
        }
        FieldValue::Text(text) => value.text_items().iter().any(|w| text_eq(text, w, projects)),
        FieldValue::Date(stamp) => value.text_items().iter().any(|w| stamp_eq(stamp, w)),
        FieldValue::Number(n) => value.as_number() == Some(*n),
        FieldValue::Bool(b) => matches!(value, tasklens_model::FilterValue::Bool(v) if v == b),
    }
}

/// List-aware containment: any condition value appearing as case-insensitive
/// substring (or canonical membership, for projects) of any task value.
fn contains_any(
    resolved: Option<&FieldValue>,
    cond: &FilterCondition,
    projects: Option<&dyn ProjectResolver>,
) -> bool {
    let value = cond.value.as_ref().expect("complete condition");
    let Some(resolved) = resolved else {
        return false;
    };
    let wanted = value.text_items();

    match resolved {
        FieldValue::List(items) => wanted.iter().any(|w| {
            items.iter().any(|item| text_contains(item, w, projects))
        }),
        FieldValue::Text(text) | FieldValue::Date(text) => {
            wanted.iter().any(|w| text_contains(text, w, projects))
        }
        FieldValue::Number(_) | FieldValue::Bool(_) => false,
    }
}

fn text_eq(task_value: &str, wanted: &str, projects: Option<&dyn ProjectResolver>) -> bool {
    match projects {
        Some(resolver) => resolver.canonical(task_value) == resolver.canonical(wanted),
        None => task_value.to_lowercase() == wanted.to_lowercase(),
    }
}

fn text_contains(task_value: &str, wanted: &str, projects: Option<&dyn ProjectResolver>) -> bool {
    match projects {
        Some(resolver) => {
            let canonical = resolver.canonical(task_value);
            let wanted = resolver.canonical(wanted);
            !wanted.is_empty() && canonical.contains(&wanted)
        }
        None => task_value.to_lowercase().contains(&wanted.to_lowercase()),
    }
}

/// Stamp equality compares anchored UTC days when both sides parse, and
/// falls back to case-insensitive text equality when they do not.
fn stamp_eq(stamp: &str, wanted: &str) -> bool {
    match (anchor_day(stamp), anchor_day(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => stamp.to_lowercase() == wanted.to_lowercase(),
    }
}

fn compare_dates(
    cond: &FilterCondition,
    operator: FilterOperator,
    resolved: Option<&FieldValue>,
) -> EngineResult<bool> {
    let value = cond.value.as_ref().expect("complete condition");
    let property = cond.property.as_ref().expect("complete condition");

    let wanted = value
        .as_text()
        .and_then(anchor_day)
        .ok_or_else(|| {
            EngineError::evaluation(
                cond.id.as_str(),
                property.to_string(),
                format!("unparsable date value '{}'", value),
            )
        })?;

    // A malformed stamp on the task side fails this one condition, not the
    // whole query.
    let Some(day) = resolved.and_then(|v| v.as_text()).and_then(anchor_day) else {
        return Ok(false);
    };

    Ok(match operator {
        FilterOperator::Before => day < wanted,
        FilterOperator::After => day > wanted,
        FilterOperator::OnOrBefore => day <= wanted,
        FilterOperator::OnOrAfter => day >= wanted,
        _ => unreachable!("not a date comparison"),
    })
}

fn compare_numbers(
    cond: &FilterCondition,
    operator: FilterOperator,
    resolved: Option<&FieldValue>,
) -> EngineResult<bool> {
    let value = cond.value.as_ref().expect("complete condition");
    let property = cond.property.as_ref().expect("complete condition");

    let wanted = value.as_number().ok_or_else(|| {
        EngineError::evaluation(
            cond.id.as_str(),
            property.to_string(),
            format!("non-numeric comparison value '{}'", value),
        )
    })?;

    let Some(number) = resolved.and_then(FieldValue::as_number) else {
        return Ok(false);
    };

    Ok(match operator {
        FilterOperator::GreaterThan => number > wanted,
        FilterOperator::LessThan => number < wanted,
        _ => unreachable!("not a numeric comparison"),
    })
}

// ==================== Strict validation ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Text,
    TextList,
    Number,
    Bool,
    Date,
}

fn property_kind(
    property: &FilterProperty,
    fields: &UserFieldTable,
) -> Result<PropertyKind, String> {
    Ok(match property {
        FilterProperty::Title
        | FilterProperty::Status
        | FilterProperty::Priority
        | FilterProperty::Recurrence => PropertyKind::Text,
        FilterProperty::Tags | FilterProperty::Contexts | FilterProperty::Projects => {
            PropertyKind::TextList
        }
        FilterProperty::StatusCompleted | FilterProperty::Archived => PropertyKind::Bool,
        FilterProperty::Due
        | FilterProperty::Scheduled
        | FilterProperty::Created
        | FilterProperty::Modified => PropertyKind::Date,
        FilterProperty::StoryPoints => PropertyKind::Number,
        FilterProperty::User(id) => match fields.kind(id) {
            Some(UserFieldKind::Text) => PropertyKind::Text,
            Some(UserFieldKind::Number) => PropertyKind::Number,
            Some(UserFieldKind::Bool) => PropertyKind::Bool,
            Some(UserFieldKind::Date) => PropertyKind::Date,
            Some(UserFieldKind::List) => PropertyKind::TextList,
            None => return Err(format!("unknown user field '{}'", id)),
        },
    })
}

/// Strict validation of a whole tree from its root group.
pub fn validate_tree(group: &FilterGroup, fields: &UserFieldTable) -> EngineResult<()> {
    for child in &group.children {
        validate(child, fields)?;
    }
    Ok(())
}

/// Strict commit-time validation: rejects what lenient evaluation merely
/// ignores. Interactive construction should not call this on every edit.
pub fn validate(node: &FilterNode, fields: &UserFieldTable) -> EngineResult<()> {
    match node {
        FilterNode::Group(group) => {
            for child in &group.children {
                validate(child, fields)?;
            }
            Ok(())
        }
        FilterNode::Condition(cond) => validate_condition(cond, fields),
    }
}

fn validate_condition(cond: &FilterCondition, fields: &UserFieldTable) -> EngineResult<()> {
    let property_name = cond
        .property
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "(unset)".to_string());

    let Some(property) = &cond.property else {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            "missing property",
        ));
    };
    let Some(operator) = cond.operator else {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            "missing operator",
        ));
    };
    if operator.requires_value() && cond.value.is_none() {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            format!("operator '{}' requires a value", operator),
        ));
    }

    let kind = property_kind(property, fields)
        .map_err(|reason| EngineError::validation(cond.id.as_str(), property_name.as_str(), reason))?;

    if operator.is_date_comparison() && kind != PropertyKind::Date {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            format!("date comparison '{}' on non-date property", operator),
        ));
    }
    if matches!(
        operator,
        FilterOperator::Checked | FilterOperator::NotChecked
    ) && kind != PropertyKind::Bool
    {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            format!("'{}' on non-boolean property", operator),
        ));
    }
    if matches!(
        operator,
        FilterOperator::GreaterThan | FilterOperator::LessThan
    ) && kind != PropertyKind::Number
    {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            format!("numeric comparison '{}' on non-numeric property", operator),
        ));
    }
    if matches!(
        operator,
        FilterOperator::Contains | FilterOperator::NotContains
    ) && !matches!(kind, PropertyKind::Text | PropertyKind::TextList | PropertyKind::Date)
    {
        return Err(EngineError::validation(
            cond.id.as_str(),
            property_name,
            format!("'{}' on non-text property", operator),
        ));
    }

    Ok(())
}
