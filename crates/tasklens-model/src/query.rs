//! Query envelope: filter root plus sort and group selection.
//!
//! Every field serde-defaults, so a partial query deserializes to something
//! runnable, and [`normalize`] fills the remaining gaps (blank node ids)
//! deterministically. Normalization is idempotent.

use serde::{Deserialize, Serialize};

use crate::filter::{
    FilterCondition, FilterGroup, FilterNode, FilterOperator, FilterProperty,
};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending (the default).
    #[default]
    Asc,
    /// Descending: the final comparison is negated, fallback chain included.
    Desc,
}

/// Primary sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SortKey {
    /// Manual ordering number.
    Order,
    /// Due date.
    Due,
    /// Scheduled date.
    Scheduled,
    /// Creation timestamp.
    Created,
    /// Modification timestamp.
    Modified,
    /// Priority weight (descending weight, so ascending = most urgent first).
    Priority,
    /// Title text.
    Title,
    /// Story points.
    StoryPoints,
    /// User-defined field, typed per its declared kind.
    User(String),
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Due
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortKey::Order => "order",
            SortKey::Due => "due",
            SortKey::Scheduled => "scheduled",
            SortKey::Created => "created",
            SortKey::Modified => "modified",
            SortKey::Priority => "priority",
            SortKey::Title => "title",
            SortKey::StoryPoints => "story-points",
            SortKey::User(id) => return write!(f, "user:{}", id),
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("user:") {
            if id.is_empty() {
                return Err("user sort key is missing a field id".to_string());
            }
            return Ok(SortKey::User(id.to_string()));
        }
        match s {
            "order" => Ok(SortKey::Order),
            "due" => Ok(SortKey::Due),
            "scheduled" => Ok(SortKey::Scheduled),
            "created" => Ok(SortKey::Created),
            "modified" => Ok(SortKey::Modified),
            "priority" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            "story-points" => Ok(SortKey::StoryPoints),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

impl From<SortKey> for String {
    fn from(k: SortKey) -> String {
        k.to_string()
    }
}

impl TryFrom<String> for SortKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum GroupKey {
    /// No grouping: one "all" bucket.
    None,
    /// By status key, ordered by declared display order.
    Status,
    /// By priority key, ordered by descending weight.
    Priority,
    /// By project reference; the one many-to-many key.
    Project,
    /// By first context.
    Context,
    /// By due-date bucket.
    Due,
    /// By scheduled-date bucket.
    Scheduled,
    /// By user-defined field, bucketed per its declared kind.
    User(String),
}

impl Default for GroupKey {
    fn default() -> Self {
        GroupKey::None
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GroupKey::None => "none",
            GroupKey::Status => "status",
            GroupKey::Priority => "priority",
            GroupKey::Project => "project",
            GroupKey::Context => "context",
            GroupKey::Due => "due",
            GroupKey::Scheduled => "scheduled",
            GroupKey::User(id) => return write!(f, "user:{}", id),
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("user:") {
            if id.is_empty() {
                return Err("user group key is missing a field id".to_string());
            }
            return Ok(GroupKey::User(id.to_string()));
        }
        match s {
            "none" => Ok(GroupKey::None),
            "status" => Ok(GroupKey::Status),
            "priority" => Ok(GroupKey::Priority),
            "project" => Ok(GroupKey::Project),
            "context" => Ok(GroupKey::Context),
            "due" => Ok(GroupKey::Due),
            "scheduled" => Ok(GroupKey::Scheduled),
            other => Err(format!("unknown group key: {}", other)),
        }
    }
}

impl From<GroupKey> for String {
    fn from(k: GroupKey) -> String {
        k.to_string()
    }
}

impl TryFrom<String> for GroupKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A complete query: filter root, sort selection, group selection.
///
/// A query with an empty root group matches every task unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    /// Root of the filter tree.
    #[serde(default = "default_root")]
    pub root: FilterGroup,
    /// Primary sort key.
    #[serde(default)]
    pub sort_key: SortKey,
    /// Sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Grouping key.
    #[serde(default)]
    pub group_key: GroupKey,
}

fn default_root() -> FilterGroup {
    FilterGroup::and("root")
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            root: default_root(),
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            group_key: GroupKey::default(),
        }
    }
}

impl FilterQuery {
    /// The default query: match everything, sort by due date ascending, no
    /// grouping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills every omitted piece with its default: a blank root id becomes
    /// `root`, and blank node ids become positional ids derived from their
    /// parent. Never fails, and applying it twice changes nothing.
    pub fn normalize(mut self) -> Self {
        if self.root.id.trim().is_empty() {
            self.root.id = "root".to_string();
        }
        let parent_id = self.root.id.clone();
        for (i, child) in self.root.children.iter_mut().enumerate() {
            normalize_node(child, &parent_id, i);
        }
        self
    }
}

fn normalize_node(node: &mut FilterNode, parent_id: &str, index: usize) {
    match node {
        FilterNode::Condition(cond) => {
            if cond.id.trim().is_empty() {
                cond.id = format!("{}.{}", parent_id, index);
            }
        }
        FilterNode::Group(group) => {
            if group.id.trim().is_empty() {
                group.id = format!("{}.{}", parent_id, index);
            }
            let parent_id = group.id.clone();
            for (i, child) in group.children.iter_mut().enumerate() {
                normalize_node(child, &parent_id, i);
            }
        }
    }
}

/// Named quick-filter shortcuts. Each maps to one well-known condition at the
/// query root, so callers toggle them without tree surgery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuickFilter {
    /// Hide tasks whose current instance is completed.
    HideCompleted,
    /// Hide archived tasks.
    HideArchived,
    /// Hide recurring tasks.
    HideRecurring,
}

impl QuickFilter {
    /// The well-known id of the injected root condition.
    pub fn condition_id(&self) -> &'static str {
        match self {
            QuickFilter::HideCompleted => "quick.hide-completed",
            QuickFilter::HideArchived => "quick.hide-archived",
            QuickFilter::HideRecurring => "quick.hide-recurring",
        }
    }

    /// The condition this shortcut injects.
    pub fn condition(&self) -> FilterCondition {
        match self {
            QuickFilter::HideCompleted => FilterCondition::new(
                self.condition_id(),
                FilterProperty::StatusCompleted,
                FilterOperator::NotChecked,
            ),
            QuickFilter::HideArchived => FilterCondition::new(
                self.condition_id(),
                FilterProperty::Archived,
                FilterOperator::NotChecked,
            ),
            QuickFilter::HideRecurring => FilterCondition::new(
                self.condition_id(),
                FilterProperty::Recurrence,
                FilterOperator::Empty,
            ),
        }
    }
}

/// Adds or removes a quick-filter condition at the query root, returning a
/// new query. The input is cloned field by field, with no serialization
/// round trip, so the result shares no mutable state with the original.
pub fn toggle_quick_filter(query: &FilterQuery, kind: QuickFilter, enabled: bool) -> FilterQuery {
    let mut next = query.clone();
    next.root
        .children
        .retain(|node| node.id() != kind.condition_id());
    if enabled {
        next.root.children.push(kind.condition().into());
    }
    next
}
