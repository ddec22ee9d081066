//! Listing service
//!
//! Runs compiled listing queries against the store:
//! 1. Compile query parameters into a predicate and sort
//! 2. Fetch the requested page and the total count concurrently
//! 3. For detail views, resolve the listing and then its related listings

use crate::config::ListingsConfig;
use crate::db::{FindQuery, ListingStore};
use crate::errors::{AppError, Result};
use crate::listing::{Listing, ListingSummary};
use crate::metrics;
use crate::query::{FilterCompiler, Pagination, QueryParams};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// One page of list results
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub page: u64,
    pub limit: u64,
    /// Matching listings across all pages
    pub count: u64,
    pub results: Vec<ListingSummary>,
}

/// A full listing together with its related listings
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    pub details: Listing,
    pub related: Vec<ListingSummary>,
}

#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ListingStore>,
    config: ListingsConfig,
}

impl ListingService {
    pub fn new(store: Arc<dyn ListingStore>, config: ListingsConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ListingStore> {
        &self.store
    }

    /// Filtered, sorted, paginated listing summaries plus the total count
    pub async fn list(&self, params: &QueryParams) -> Result<ListingPage> {
        let start = Instant::now();

        let compiled = FilterCompiler::new(&self.config).compile(params);
        let pagination = Pagination::from_params(params, &self.config);
        let fields: Vec<&'static str> = compiled.predicate.fields().iter().map(|f| f.path()).collect();

        tracing::debug!(
            fields = ?fields,
            sort = ?compiled.sort_key,
            page = pagination.page,
            limit = pagination.limit,
            "Compiled listing query"
        );

        let query = FindQuery::new(
            compiled.predicate.clone(),
            compiled.sort,
            pagination.offset(),
            pagination.limit,
        );

        let (results, count) = tokio::try_join!(
            self.store.find(&query),
            self.store.count(&compiled.predicate),
        )?;

        let duration = start.elapsed();
        let sort = compiled.sort_key.map(|key| key.as_str()).unwrap_or("none");
        metrics::record_listing_query(duration.as_secs_f64(), sort, results.len(), &fields);

        tracing::info!(
            page = pagination.page,
            limit = pagination.limit,
            count,
            returned = results.len(),
            latency_ms = duration.as_millis() as u64,
            "Listing query completed"
        );

        Ok(ListingPage {
            page: pagination.page,
            limit: pagination.limit,
            count,
            results,
        })
    }

    /// Full listing by id with up to `related.limit` related listings.
    ///
    /// A malformed id is reported as not found.
    pub async fn detail(&self, id: &str) -> Result<ListingDetail> {
        let Ok(listing_id) = Uuid::parse_str(id.trim()) else {
            tracing::debug!(id, "Malformed listing id");
            metrics::record_detail_lookup("not_found");
            return Err(AppError::ListingNotFound { id: id.to_string() });
        };

        let Some(details) = self.store.find_by_id(listing_id).await? else {
            metrics::record_detail_lookup("not_found");
            return Err(AppError::ListingNotFound { id: id.to_string() });
        };

        // Depends on the type and sub-type of the listing found above
        let policy = &self.config.related;
        let query = FindQuery::new(policy.predicate_for(&details), None, 0, policy.limit);
        let related = self.store.find(&query).await?;

        metrics::record_detail_lookup("found");
        tracing::debug!(id = %listing_id, related = related.len(), "Listing detail resolved");

        Ok(ListingDetail { details, related })
    }
}
