//! Typed listing predicate
//!
//! A `Predicate` is an ordered set of per-field constraints that a listing
//! must all satisfy. Each constraint is one of a small number of tagged
//! variants, so a malformed clause cannot be built.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Listing fields that can be constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    Id,
    PurposeId,
    SubPurposeId,
    Status,
    Location,
    TypeId,
    SubTypeId,
    Bed,
    Bath,
    Price,
    Size,
    Keywords,
    Video,
}

impl Field {
    /// Document path of the field in the listing wire format
    pub fn path(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::PurposeId => "purpose.purpose.id",
            Field::SubPurposeId => "purpose.subPurpose.id",
            Field::Status => "status",
            Field::Location => "address.location",
            Field::TypeId => "type.id",
            Field::SubTypeId => "subType.id",
            Field::Bed => "bed",
            Field::Bath => "bath",
            Field::Price => "price",
            Field::Size => "size",
            Field::Keywords => "keywords",
            Field::Video => "video",
        }
    }

    /// Array-valued fields match `Eq` by containment
    pub fn is_array(&self) -> bool {
        matches!(self, Field::Keywords)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A constraint operand
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Id(Uuid),
}

impl Value {
    /// Whether the value can take part in a query
    pub fn is_valid(&self) -> bool {
        match self {
            Value::Text(text) => !text.is_empty(),
            Value::Number(number) => number.is_finite(),
            Value::Id(_) => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Id(value)
    }
}

/// Constraint on a single field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Equal to the value (array fields: contains the value)
    Eq(Value),
    /// Equal to any of the values (array fields: contains any)
    In(Vec<Value>),
    /// Inclusive numeric range
    Range { min: f64, max: f64 },
    /// Field is present and not null
    NotNull,
    /// Not equal to the value
    Ne(Value),
}

impl Constraint {
    /// Whether the constraint is well formed. Invalid constraints are
    /// removed by `Predicate::prune` before execution.
    pub fn is_valid(&self) -> bool {
        match self {
            Constraint::Eq(value) | Constraint::Ne(value) => value.is_valid(),
            Constraint::In(values) => !values.is_empty() && values.iter().all(Value::is_valid),
            Constraint::Range { min, max } => min.is_finite() && max.is_finite(),
            Constraint::NotNull => true,
        }
    }
}

/// Conjunction of field constraints, ordered by field
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Predicate {
    constraints: BTreeMap<Field, Constraint>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the constraint for a field, replacing any previous one
    pub fn insert(&mut self, field: Field, constraint: Constraint) -> &mut Self {
        self.constraints.insert(field, constraint);
        self
    }

    /// Builder-style `insert`
    pub fn with(mut self, field: Field, constraint: Constraint) -> Self {
        self.insert(field, constraint);
        self
    }

    pub fn get(&self, field: Field) -> Option<&Constraint> {
        self.constraints.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.constraints.contains_key(&field)
    }

    pub fn remove(&mut self, field: Field) -> Option<Constraint> {
        self.constraints.remove(&field)
    }

    /// Drop every constraint that failed to resolve to a usable value.
    /// Returns the fields that were removed.
    pub fn prune(&mut self) -> Vec<Field> {
        let invalid: Vec<Field> = self
            .constraints
            .iter()
            .filter(|(_, constraint)| !constraint.is_valid())
            .map(|(field, _)| *field)
            .collect();
        for field in &invalid {
            self.constraints.remove(field);
        }
        invalid
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Constraint)> {
        self.constraints.iter().map(|(field, constraint)| (*field, constraint))
    }

    pub fn fields(&self) -> Vec<Field> {
        self.constraints.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Sortable listing fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering applied before pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: SortField) -> Self {
        Self { field, direction: SortDirection::Ascending }
    }

    pub fn descending(field: SortField) -> Self {
        Self { field, direction: SortDirection::Descending }
    }
}
