//! Listing store layer
//!
//! Provides:
//! - The `ListingStore` abstraction the listing service runs against
//! - SeaORM entity models and the Postgres-backed `Repository`
//! - An in-process `MemoryStore` with identical semantics
//! - Connection pool management

pub mod models;
mod memory;
mod repository;

pub use memory::MemoryStore;
pub use repository::Repository;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::errors::{AppError, Result};
use crate::listing::{Listing, ListingSummary};
use crate::query::{Predicate, SortSpec};
use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// A paginated, projected listing lookup
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub predicate: Predicate,
    pub sort: Option<SortSpec>,
    pub skip: u64,
    pub limit: u64,
}

impl FindQuery {
    pub fn new(predicate: Predicate, sort: Option<SortSpec>, skip: u64, limit: u64) -> Self {
        Self { predicate, sort, skip, limit }
    }
}

/// Read-only access to stored listings
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Listings matching the query, sorted then paginated, as summaries.
    /// Ties (and unsorted queries) are ordered by id.
    async fn find(&self, query: &FindQuery) -> Result<Vec<ListingSummary>>;

    /// Number of listings matching the predicate
    async fn count(&self, predicate: &Predicate) -> Result<u64>;

    /// Full listing by identity
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;
}

/// Open the store selected by configuration. Called once at startup; the
/// returned handle is shared by every request.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn ListingStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let pool = DbPool::new(config).await?;
            Ok(Arc::new(Repository::new(pool)))
        }
        StoreBackend::Memory => {
            let store = match config.seed_path.as_deref() {
                Some(path) => MemoryStore::from_json_file(path).await?,
                None => MemoryStore::default(),
            };
            info!(listings = store.len(), "Using in-memory listing store");
            Ok(Arc::new(store))
        }
    }
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(Self::options(config, &config.url))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e)
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(Self::options(config, read_url))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e)
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    fn options(config: &DatabaseConfig, url: &str) -> ConnectOptions {
        let mut opts = ConnectOptions::new(url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);
        opts
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}
