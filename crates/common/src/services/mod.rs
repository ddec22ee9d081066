//! Listing read services

mod listings;

pub use listings::{ListingDetail, ListingPage, ListingService};
