//! Property listing domain types
//!
//! `Listing` is the full document returned by the detail endpoint;
//! `ListingSummary` is the projection used by list and related views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An `{id, name}` pair used by every categorical attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Listing intent: sale vs rent, plus an optional finer-grained sub-purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purpose {
    pub purpose: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_purpose: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub location: String,
}

/// A property record available for sale or rent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub reference_no: String,
    pub title: String,
    pub purpose: Purpose,
    pub status: String,
    pub address: Address,
    #[serde(rename = "type")]
    pub property_type: Category,
    pub sub_type: Category,
    pub bed: i32,
    pub bath: i32,
    pub price: f64,
    pub size: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Whether the listing offers a video tour
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn summary(&self) -> ListingSummary {
        ListingSummary {
            id: self.id,
            reference_no: self.reference_no.clone(),
            title: self.title.clone(),
            size: self.size,
            price: self.price,
            bed: self.bed,
            bath: self.bath,
            status: self.status.clone(),
            address: self.address.clone(),
            images: self.images.clone(),
        }
    }
}

/// Fields needed to render a listing card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: Uuid,
    pub reference_no: String,
    pub title: String,
    pub size: f64,
    pub price: f64,
    pub bed: i32,
    pub bath: i32,
    pub status: String,
    pub address: Address,
    pub images: Vec<String>,
}
