//! Filter tree: conditions and boolean groups.
//!
//! A filter is a recursive tagged union: a [`FilterNode`] is either a leaf
//! [`FilterCondition`] or a nested [`FilterGroup`] combining children with
//! AND/OR. The tree is built top-down by value (ownership makes cycles
//! unrepresentable) and is only ever replaced wholesale, never mutated in
//! place during evaluation.
//!
//! A condition is *complete* only when it carries a property, an operator,
//! and (where the operator needs one) a value. Incomplete conditions are
//! ignored during evaluation rather than rejected, so a query under
//! construction in a UI keeps producing sensible results.

use serde::{Deserialize, Serialize};

/// Property selector of a condition: a built-in property or a dynamic
/// `user:<field-id>` selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FilterProperty {
    /// Task title text.
    Title,
    /// Raw status key.
    Status,
    /// Virtual property: instance-aware completeness, not raw key equality.
    StatusCompleted,
    /// Priority key.
    Priority,
    /// Due stamp.
    Due,
    /// Scheduled stamp.
    Scheduled,
    /// Creation timestamp.
    Created,
    /// Modification timestamp.
    Modified,
    /// Tag list.
    Tags,
    /// Context list.
    Contexts,
    /// Project reference list.
    Projects,
    /// Archived flag.
    Archived,
    /// Recurrence rule presence.
    Recurrence,
    /// Story point estimate.
    StoryPoints,
    /// User-defined field, by field id.
    User(String),
}

impl FilterProperty {
    /// Whether this property resolves to a calendar date.
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            FilterProperty::Due
                | FilterProperty::Scheduled
                | FilterProperty::Created
                | FilterProperty::Modified
        )
    }
}

impl std::fmt::Display for FilterProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FilterProperty::Title => "title",
            FilterProperty::Status => "status",
            FilterProperty::StatusCompleted => "status.completed",
            FilterProperty::Priority => "priority",
            FilterProperty::Due => "due",
            FilterProperty::Scheduled => "scheduled",
            FilterProperty::Created => "created",
            FilterProperty::Modified => "modified",
            FilterProperty::Tags => "tags",
            FilterProperty::Contexts => "contexts",
            FilterProperty::Projects => "projects",
            FilterProperty::Archived => "archived",
            FilterProperty::Recurrence => "recurrence",
            FilterProperty::StoryPoints => "story-points",
            FilterProperty::User(id) => return write!(f, "user:{}", id),
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for FilterProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("user:") {
            if id.is_empty() {
                return Err("user field selector is missing a field id".to_string());
            }
            return Ok(FilterProperty::User(id.to_string()));
        }
        match s {
            "title" => Ok(FilterProperty::Title),
            "status" => Ok(FilterProperty::Status),
            "status.completed" => Ok(FilterProperty::StatusCompleted),
            "priority" => Ok(FilterProperty::Priority),
            "due" => Ok(FilterProperty::Due),
            "scheduled" => Ok(FilterProperty::Scheduled),
            "created" => Ok(FilterProperty::Created),
            "modified" => Ok(FilterProperty::Modified),
            "tags" => Ok(FilterProperty::Tags),
            "contexts" => Ok(FilterProperty::Contexts),
            "projects" => Ok(FilterProperty::Projects),
            "archived" => Ok(FilterProperty::Archived),
            "recurrence" => Ok(FilterProperty::Recurrence),
            "story-points" => Ok(FilterProperty::StoryPoints),
            other => Err(format!("unknown filter property: {}", other)),
        }
    }
}

impl From<FilterProperty> for String {
    fn from(p: FilterProperty) -> String {
        p.to_string()
    }
}

impl TryFrom<String> for FilterProperty {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
    Empty,
    NotEmpty,
    Checked,
    NotChecked,
    GreaterThan,
    LessThan,
}

impl FilterOperator {
    /// Whether the operator needs a comparison value to be complete.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            FilterOperator::Empty
                | FilterOperator::NotEmpty
                | FilterOperator::Checked
                | FilterOperator::NotChecked
        )
    }

    /// Whether the operator compares calendar dates.
    pub fn is_date_comparison(&self) -> bool {
        matches!(
            self,
            FilterOperator::Before
                | FilterOperator::After
                | FilterOperator::OnOrBefore
                | FilterOperator::OnOrAfter
        )
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not-equals",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not-contains",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
            FilterOperator::OnOrBefore => "on-or-before",
            FilterOperator::OnOrAfter => "on-or-after",
            FilterOperator::Empty => "empty",
            FilterOperator::NotEmpty => "not-empty",
            FilterOperator::Checked => "checked",
            FilterOperator::NotChecked => "not-checked",
            FilterOperator::GreaterThan => "greater-than",
            FilterOperator::LessThan => "less-than",
        };
        f.write_str(s)
    }
}

/// Comparison value carried by a condition. The expected type depends on the
/// property and operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value (also carries date stamps for date operators).
    Text(String),
    /// List of text values.
    List(Vec<String>),
}

impl FilterValue {
    /// Text content, when textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content; text is parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            FilterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The value as a list of text items; a scalar text becomes a singleton.
    pub fn text_items(&self) -> Vec<&str> {
        match self {
            FilterValue::Text(s) => vec![s.as_str()],
            FilterValue::List(items) => items.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => f.write_str(s),
            FilterValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

/// Conjunction of a group's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    /// Every child must match.
    And,
    /// At least one child must match.
    Or,
}

/// Leaf of the filter tree: one property/operator/value comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Identity of this node, referenced in logs and quick-filter toggles.
    pub id: String,
    /// Property selector; `None` while the condition is being built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<FilterProperty>,
    /// Operator; `None` while the condition is being built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<FilterOperator>,
    /// Comparison value, when the operator needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl FilterCondition {
    /// Creates a condition with property and operator set and no value.
    pub fn new(id: impl Into<String>, property: FilterProperty, operator: FilterOperator) -> Self {
        Self {
            id: id.into(),
            property: Some(property),
            operator: Some(operator),
            value: None,
        }
    }

    /// Creates an empty condition (always ignored until filled in).
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            property: None,
            operator: None,
            value: None,
        }
    }

    /// Sets the comparison value.
    pub fn with_value(mut self, value: impl Into<FilterValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// A condition is complete when it has a property, an operator, and,
    /// where the operator requires one, a value. Incomplete conditions are
    /// treated as always-true during evaluation, never as an error.
    pub fn is_complete(&self) -> bool {
        let Some(op) = self.operator else {
            return false;
        };
        self.property.is_some() && (!op.requires_value() || self.value.is_some())
    }
}

/// Branch of the filter tree: an AND/OR combination of child nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// Identity of this node.
    pub id: String,
    /// How children combine.
    pub conjunction: Conjunction,
    /// Ordered children: conditions or nested groups.
    #[serde(default)]
    pub children: Vec<FilterNode>,
}

impl FilterGroup {
    /// Creates an empty AND group.
    pub fn and(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conjunction: Conjunction::And,
            children: Vec::new(),
        }
    }

    /// Creates an empty OR group.
    pub fn or(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conjunction: Conjunction::Or,
            children: Vec::new(),
        }
    }

    /// Appends a child node, builder style.
    pub fn with_child(mut self, child: impl Into<FilterNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Returns true if the group has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A node of the filter tree. Closed sum type: every consumer matches
/// exhaustively, so a new node kind cannot be silently mishandled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterNode {
    /// Leaf comparison.
    Condition(FilterCondition),
    /// Nested boolean group.
    Group(FilterGroup),
}

impl FilterNode {
    /// Node identity, for logs and toggles.
    pub fn id(&self) -> &str {
        match self {
            FilterNode::Condition(c) => &c.id,
            FilterNode::Group(g) => &g.id,
        }
    }
}

impl From<FilterCondition> for FilterNode {
    fn from(c: FilterCondition) -> Self {
        FilterNode::Condition(c)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(g: FilterGroup) -> Self {
        FilterNode::Group(g)
    }
}
