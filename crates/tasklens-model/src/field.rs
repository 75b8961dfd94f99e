//! User-defined extension fields.
//!
//! Fields are declared once (id, name, kind) and attached to tasks as typed
//! values. The kind table drives evaluator, sort, and group behavior for
//! `user:<id>` selectors, so type behavior is resolved through one closed
//! enum instead of being re-derived at each call site.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The closed set of user field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserFieldKind {
    /// Free text.
    Text,
    /// Floating-point number.
    Number,
    /// Boolean checkbox.
    Bool,
    /// Calendar date stamp.
    Date,
    /// Ordered list of text values.
    List,
}

/// Declaration of a user-defined field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFieldDefinition {
    /// Stable field id, referenced by `user:<id>` selectors.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Declared value kind.
    pub kind: UserFieldKind,
}

impl UserFieldDefinition {
    /// Creates a definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: UserFieldKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Field-definition lookup table, built once and shared by every `user:`
/// selector path (evaluation, sorting, grouping).
#[derive(Debug, Clone, Default)]
pub struct UserFieldTable {
    by_id: HashMap<String, UserFieldDefinition>,
}

impl UserFieldTable {
    /// Builds a table from a list of definitions. Later duplicates win.
    pub fn new(definitions: impl IntoIterator<Item = UserFieldDefinition>) -> Self {
        let by_id = definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        Self { by_id }
    }

    /// Looks up a definition by field id.
    pub fn get(&self, id: &str) -> Option<&UserFieldDefinition> {
        self.by_id.get(id)
    }

    /// Declared kind for a field id, if the field exists.
    pub fn kind(&self, id: &str) -> Option<UserFieldKind> {
        self.by_id.get(id).map(|def| def.kind)
    }

    /// All definitions, in arbitrary order.
    pub fn definitions(&self) -> impl Iterator<Item = &UserFieldDefinition> {
        self.by_id.values()
    }
}

/// A typed user field value attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Floating-point number.
    Number(f64),
    /// Boolean checkbox.
    Bool(bool),
    /// Calendar date stamp (`YYYY-MM-DD` or RFC 3339), parsed lazily.
    Date(String),
    /// Ordered list of text values.
    List(Vec<String>),
}

impl FieldValue {
    /// The value as text, when it is textual (Text or Date).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a number. Text is parsed; unparsable text is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as a list. Scalars are not promoted.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Empty-ness check: empty string, empty list, and blank date stamps all
    /// count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        let table = UserFieldTable::new(vec![
            UserFieldDefinition::new("effort", "Effort", UserFieldKind::Number),
            UserFieldDefinition::new("owner", "Owner", UserFieldKind::Text),
        ]);

        assert_eq!(table.kind("effort"), Some(UserFieldKind::Number));
        assert_eq!(table.kind("owner"), Some(UserFieldKind::Text));
        assert_eq!(table.kind("missing"), None);
        assert_eq!(table.get("owner").unwrap().name, "Owner");
    }

    #[test]
    fn test_table_later_duplicate_wins() {
        let table = UserFieldTable::new(vec![
            UserFieldDefinition::new("x", "First", UserFieldKind::Text),
            UserFieldDefinition::new("x", "Second", UserFieldKind::Number),
        ]);

        assert_eq!(table.get("x").unwrap().name, "Second");
        assert_eq!(table.kind("x"), Some(UserFieldKind::Number));
    }

    #[test]
    fn test_as_number_parses_text() {
        assert_eq!(FieldValue::Number(3.5).as_number(), Some(3.5));
        assert_eq!(FieldValue::Text(" 42 ".to_string()).as_number(), Some(42.0));
        assert_eq!(FieldValue::Text("n/a".to_string()).as_number(), None);
        assert_eq!(FieldValue::Bool(true).as_number(), None);
    }

    #[test]
    fn test_is_empty() {
        assert!(FieldValue::Text(String::new()).is_empty());
        assert!(FieldValue::Text("  ".to_string()).is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(!FieldValue::Text("x".to_string()).is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
        assert!(!FieldValue::Bool(false).is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let values = vec![
            FieldValue::Text("hello".to_string()),
            FieldValue::Number(1.5),
            FieldValue::Bool(true),
            FieldValue::Date("2025-03-01".to_string()),
            FieldValue::List(vec!["a".to_string(), "b".to_string()]),
        ];

        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let back: FieldValue = serde_json::from_str(&json).unwrap();
            assert_eq!(value, back);
        }
    }
}
