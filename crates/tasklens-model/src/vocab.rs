//! Status and priority vocabulary.
//!
//! Statuses and priorities are text keys on the task; this module carries the
//! associated semantics: whether a status counts as completed, how statuses
//! order in grouped output, and the numeric urgency weight behind each
//! priority key (higher weight = more urgent, so an "ascending" priority sort
//! still puts the most urgent tasks first).

use serde::{Deserialize, Serialize};

use crate::field::{UserFieldDefinition, UserFieldTable};

/// Declaration of a task status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDef {
    /// Status key as stored on tasks.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Position in grouped output (lower first).
    pub display_order: i32,
    /// Whether tasks in this status count as completed.
    pub completes: bool,
}

impl StatusDef {
    /// Creates a status definition.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        display_order: i32,
        completes: bool,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            display_order,
            completes,
        }
    }
}

/// Declaration of a priority level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDef {
    /// Priority key as stored on tasks.
    pub key: String,
    /// Urgency weight; higher is more urgent.
    pub weight: i32,
}

impl PriorityDef {
    /// Creates a priority definition.
    pub fn new(key: impl Into<String>, weight: i32) -> Self {
        Self {
            key: key.into(),
            weight,
        }
    }
}

/// The full vocabulary the engine resolves text keys against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Known statuses, in declared display order.
    pub statuses: Vec<StatusDef>,
    /// Known priorities.
    pub priorities: Vec<PriorityDef>,
    /// User-defined field declarations.
    #[serde(default)]
    pub fields: Vec<UserFieldDefinition>,
}

impl Default for Vocabulary {
    /// The standard vocabulary: open / in-progress / done / cancelled and
    /// low / normal / high / urgent.
    fn default() -> Self {
        Self {
            statuses: vec![
                StatusDef::new("open", "Open", 0, false),
                StatusDef::new("in-progress", "In Progress", 1, false),
                StatusDef::new("done", "Done", 2, true),
                StatusDef::new("cancelled", "Cancelled", 3, true),
            ],
            priorities: vec![
                PriorityDef::new("low", 1),
                PriorityDef::new("normal", 2),
                PriorityDef::new("high", 3),
                PriorityDef::new("urgent", 4),
            ],
            fields: Vec::new(),
        }
    }
}

impl Vocabulary {
    /// Looks up a status definition by key.
    pub fn status(&self, key: &str) -> Option<&StatusDef> {
        self.statuses.iter().find(|s| s.key == key)
    }

    /// Whether the given status key counts as completed. Unknown keys do not.
    pub fn status_completes(&self, key: &str) -> bool {
        self.status(key).is_some_and(|s| s.completes)
    }

    /// Display order of a status key. Unknown keys sort after declared ones.
    pub fn status_order(&self, key: &str) -> Option<i32> {
        self.status(key).map(|s| s.display_order)
    }

    /// Urgency weight of a priority key.
    pub fn priority_weight(&self, key: &str) -> Option<i32> {
        self.priorities
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.weight)
    }

    /// Builds the field-definition lookup table.
    pub fn field_table(&self) -> UserFieldTable {
        UserFieldTable::new(self.fields.iter().cloned())
    }
}
