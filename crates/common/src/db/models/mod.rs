//! SeaORM entity models

mod listing;

pub use listing::{
    Entity as ListingEntity,
    Model as ListingModel,
    ActiveModel as ListingActiveModel,
    Column as ListingColumn,
    SummaryRow,
};
