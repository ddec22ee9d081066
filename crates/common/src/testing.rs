//! Listing fixtures for unit tests

use crate::listing::{Address, Category, Listing, Purpose};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Builds a valid listing whose id is `Uuid::from_u128(n)`
pub struct ListingFixture {
    listing: Listing,
}

impl ListingFixture {
    pub fn new(n: u128) -> Self {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        Self {
            listing: Listing {
                id: Uuid::from_u128(n),
                reference_no: format!("BDP-{:04}", n),
                title: format!("Listing {}", n),
                purpose: Purpose {
                    purpose: Category::new("sale", "Sale"),
                    sub_purpose: None,
                },
                status: "ready".to_string(),
                address: Address { location: "Gulshan".to_string() },
                property_type: Category::new("residential", "Residential"),
                sub_type: Category::new("apartment", "Apartment"),
                bed: 3,
                bath: 2,
                price: 1000.0 * n as f64,
                size: 1200.0,
                images: vec![format!("{}-front.jpg", n)],
                keywords: Vec::new(),
                video: None,
                created_at: base + Duration::days(n as i64),
            },
        }
    }

    pub fn location(mut self, location: &str) -> Self {
        self.listing.address.location = location.to_string();
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.listing.price = price;
        self
    }

    pub fn bed(mut self, bed: i32) -> Self {
        self.listing.bed = bed;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.listing.status = status.to_string();
        self
    }

    pub fn kind(mut self, type_id: &str, sub_type_id: &str) -> Self {
        self.listing.property_type = Category::new(type_id, type_id);
        self.listing.sub_type = Category::new(sub_type_id, sub_type_id);
        self
    }

    pub fn sub_purpose(mut self, id: &str) -> Self {
        self.listing.purpose.sub_purpose = Some(Category::new(id, id));
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.listing.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn video(mut self, video: &str) -> Self {
        self.listing.video = Some(video.to_string());
        self
    }

    pub fn build(self) -> Listing {
        self.listing
    }
}
