//! Typed data model for the tasklens query engine.
//!
//! This crate carries the passive shapes the engine operates on: task
//! snapshots, user-defined field declarations, the status/priority
//! vocabulary, and the filter/query tree. It performs no I/O and holds no
//! engine logic; evaluation, optimization, sorting, and grouping live in
//! `tasklens-engine`.
//!
//! # Example
//!
//! ```
//! use tasklens_model::{
//!     FilterCondition, FilterGroup, FilterOperator, FilterProperty, FilterQuery,
//!     GroupKey, SortKey,
//! };
//!
//! let mut query = FilterQuery::new();
//! query.root = FilterGroup::and("root").with_child(
//!     FilterCondition::new("c1", FilterProperty::Status, FilterOperator::Equals)
//!         .with_value("open"),
//! );
//! query.sort_key = SortKey::Priority;
//! query.group_key = GroupKey::Project;
//!
//! let query = query.normalize();
//! assert_eq!(query.root.children.len(), 1);
//! ```

pub mod field;
pub mod filter;
pub mod query;
pub mod task;
pub mod vocab;

pub use field::{FieldValue, UserFieldDefinition, UserFieldKind, UserFieldTable};
pub use filter::{
    Conjunction, FilterCondition, FilterGroup, FilterNode, FilterOperator, FilterProperty,
    FilterValue,
};
pub use query::{
    toggle_quick_filter, FilterQuery, GroupKey, QuickFilter, SortDirection, SortKey,
};
pub use task::{LegacyRecurrence, Recurrence, TaskEntity, TaskPath};
pub use vocab::{PriorityDef, StatusDef, Vocabulary};
