//! In-process listing store
//!
//! Holds an immutable set of listings and evaluates predicates with the same
//! semantics as the Postgres repository. Used by tests and for local runs
//! from a JSON seed file.

use crate::db::{FindQuery, ListingStore};
use crate::errors::{AppError, Result};
use crate::listing::{Listing, ListingSummary};
use crate::query::{Constraint, Field, Predicate, SortDirection, SortField, SortSpec, Value};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    listings: Arc<Vec<Listing>>,
}

impl MemoryStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(listings),
        }
    }

    /// Load listings from a JSON array in the listing wire format
    pub async fn from_json_file(path: &str) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Store {
                message: format!("Failed to read seed file {}: {}", path, e),
            })?;
        let listings: Vec<Listing> = serde_json::from_str(&raw).map_err(|e| AppError::Store {
            message: format!("Failed to parse seed file {}: {}", path, e),
        })?;
        Ok(Self::new(listings))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    fn matching<'a>(&'a self, predicate: &'a Predicate) -> impl Iterator<Item = &'a Listing> + 'a {
        self.listings
            .iter()
            .filter(move |listing| matches(listing, predicate))
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn find(&self, query: &FindQuery) -> Result<Vec<ListingSummary>> {
        let mut hits: Vec<&Listing> = self.matching(&query.predicate).collect();
        hits.sort_by(|a, b| compare(a, b, query.sort));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

        Ok(hits
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(Listing::summary)
            .collect())
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        Ok(self.matching(predicate).count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        Ok(self.listings.iter().find(|listing| listing.id == id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Sort key first, then id so pagination is stable
fn compare(a: &Listing, b: &Listing, sort: Option<SortSpec>) -> Ordering {
    let primary = match sort {
        Some(spec) => {
            let ordering = match spec.field {
                SortField::Price => a.price.total_cmp(&b.price),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            match spec.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
        None => Ordering::Equal,
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// A listing field as seen by the evaluator
enum Slot<'a> {
    Text(Option<&'a str>),
    Number(f64),
    Id(Uuid),
    Array(&'a [String]),
}

fn slot(listing: &Listing, field: Field) -> Slot<'_> {
    match field {
        Field::Id => Slot::Id(listing.id),
        Field::PurposeId => Slot::Text(Some(&listing.purpose.purpose.id)),
        Field::SubPurposeId => {
            Slot::Text(listing.purpose.sub_purpose.as_ref().map(|sub| sub.id.as_str()))
        }
        Field::Status => Slot::Text(Some(&listing.status)),
        Field::Location => Slot::Text(Some(&listing.address.location)),
        Field::TypeId => Slot::Text(Some(&listing.property_type.id)),
        Field::SubTypeId => Slot::Text(Some(&listing.sub_type.id)),
        Field::Bed => Slot::Number(f64::from(listing.bed)),
        Field::Bath => Slot::Number(f64::from(listing.bath)),
        Field::Price => Slot::Number(listing.price),
        Field::Size => Slot::Number(listing.size),
        Field::Keywords => Slot::Array(&listing.keywords),
        Field::Video => Slot::Text(listing.video.as_deref()),
    }
}

fn equals(slot: &Slot<'_>, value: &Value) -> bool {
    match (slot, value) {
        (Slot::Text(Some(text)), Value::Text(expected)) => text == expected,
        (Slot::Number(number), Value::Number(expected)) => number == expected,
        (Slot::Id(id), Value::Id(expected)) => id == expected,
        (Slot::Array(items), Value::Text(expected)) => items.iter().any(|item| item == expected),
        _ => false,
    }
}

fn satisfies(slot: &Slot<'_>, constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Eq(value) => equals(slot, value),
        // NULL is never unequal, as in SQL
        Constraint::Ne(value) => !matches!(slot, Slot::Text(None)) && !equals(slot, value),
        Constraint::In(values) => values.iter().any(|value| equals(slot, value)),
        Constraint::Range { min, max } => match slot {
            Slot::Number(number) => *min <= *number && *number <= *max,
            _ => false,
        },
        Constraint::NotNull => !matches!(slot, Slot::Text(None)),
    }
}

fn matches(listing: &Listing, predicate: &Predicate) -> bool {
    predicate
        .iter()
        .all(|(field, constraint)| satisfies(&slot(listing, field), constraint))
}
