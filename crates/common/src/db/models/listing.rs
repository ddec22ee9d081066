//! Listing entity
//!
//! Nested categories of the listing document are flattened into columns;
//! `images` and `keywords` are JSONB arrays.

use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::listing::{Address, Category, Listing, ListingSummary, Purpose};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub reference_no: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub purpose_id: String,

    #[sea_orm(column_type = "Text")]
    pub purpose_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub sub_purpose_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub sub_purpose_name: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text")]
    pub location: String,

    #[sea_orm(column_type = "Text")]
    pub type_id: String,

    #[sea_orm(column_type = "Text")]
    pub type_name: String,

    #[sea_orm(column_type = "Text")]
    pub sub_type_id: String,

    #[sea_orm(column_type = "Text")]
    pub sub_type_name: String,

    pub bed: i32,

    pub bath: i32,

    #[sea_orm(column_type = "Double")]
    pub price: f64,

    #[sea_orm(column_type = "Double")]
    pub size: f64,

    /// Ordered image references
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Json,

    /// Free-text keywords
    #[sea_orm(column_type = "JsonBinary")]
    pub keywords: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub video: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Columns read for list and related views
#[derive(Debug, Clone, FromQueryResult)]
pub struct SummaryRow {
    pub id: Uuid,
    pub reference_no: String,
    pub title: String,
    pub size: f64,
    pub price: f64,
    pub bed: i32,
    pub bath: i32,
    pub status: String,
    pub location: String,
    pub images: Json,
}

impl SummaryRow {
    pub const COLUMNS: [Column; 10] = [
        Column::Id,
        Column::ReferenceNo,
        Column::Title,
        Column::Size,
        Column::Price,
        Column::Bed,
        Column::Bath,
        Column::Status,
        Column::Location,
        Column::Images,
    ];
}

/// Non-string entries in a JSONB array are skipped
fn string_array(value: Json) -> Vec<String> {
    match value {
        Json::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Json::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl From<SummaryRow> for ListingSummary {
    fn from(row: SummaryRow) -> Self {
        ListingSummary {
            id: row.id,
            reference_no: row.reference_no,
            title: row.title,
            size: row.size,
            price: row.price,
            bed: row.bed,
            bath: row.bath,
            status: row.status,
            address: Address { location: row.location },
            images: string_array(row.images),
        }
    }
}

impl From<Model> for Listing {
    fn from(model: Model) -> Self {
        let sub_purpose = match (model.sub_purpose_id, model.sub_purpose_name) {
            (Some(id), name) => Some(Category { id, name: name.unwrap_or_default() }),
            (None, _) => None,
        };

        Listing {
            id: model.id,
            reference_no: model.reference_no,
            title: model.title,
            purpose: Purpose {
                purpose: Category::new(model.purpose_id, model.purpose_name),
                sub_purpose,
            },
            status: model.status,
            address: Address { location: model.location },
            property_type: Category::new(model.type_id, model.type_name),
            sub_type: Category::new(model.sub_type_id, model.sub_type_name),
            bed: model.bed,
            bath: model.bath,
            price: model.price,
            size: model.size,
            images: string_array(model.images),
            keywords: string_array(model.keywords),
            video: model.video,
            created_at: model.created_at.with_timezone(&chrono::Utc),
        }
    }
}
