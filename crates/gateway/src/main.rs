//! BD Property API Gateway
//!
//! The HTTP entry point for the property listings API.
//! Handles:
//! - Request routing for listing and detail lookups
//! - Rate limiting
//! - CORS and response security headers
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use bdproperty_common::{
    config::{AppConfig, ObservabilityConfig},
    db,
    metrics,
    services::ListingService,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitState};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub listings: ListingService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting BD Property API Gateway v{}",
        bdproperty_common::VERSION
    );

    // Initialize metrics
    init_metrics(config.observability.metrics_port)?;

    // Open the listing store once; every request shares the handle
    info!(backend = ?config.database.backend, "Connecting to listing store...");
    let store = db::connect(&config.database).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        listings: ListingService::new(store, config.listings.clone()),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.shutdown_timeout()))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Start the Prometheus exporter unless the port is 0
fn init_metrics(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        info!("Metrics exporter disabled");
    } else {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Metrics exporter listening on port {}", port);
    }

    metrics::register_metrics();
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let referrer_policy = SetResponseHeaderLayer::overriding(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    // API routes
    let api_routes = Router::new()
        .route("/properties", get(handlers::properties::list_properties))
        .route("/properties/{id}", get(handlers::properties::get_property));

    let mut router = Router::new()
        // Liveness endpoints
        .route("/", get(handlers::health::welcome))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes);

    if state.config.rate_limit.enabled {
        info!(
            requests_per_second = state.config.rate_limit.requests_per_second,
            burst = state.config.rate_limit.burst,
            "Rate limiting enabled"
        );
        let limiter = RateLimitState::new(&state.config.rate_limit);
        router = router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    let request_timeout = state.config.request_timeout();

    router
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(
            ServiceBuilder::new()
                // Request ID first so traces and responses carry it
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(referrer_policy)
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler. In-flight requests get `grace` to
/// finish before the process exits.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, exiting");
        std::process::exit(1);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
    };
    use bdproperty_common::{
        db::{FindQuery, ListingStore, MemoryStore},
        errors::{AppError, Result},
        listing::{Listing, ListingSummary},
        query::Predicate,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn listing(n: u128, sub_type: &str) -> Listing {
        serde_json::from_value(json!({
            "id": Uuid::from_u128(n),
            "referenceNo": format!("BDP-{:04}", n),
            "title": format!("Listing {}", n),
            "purpose": { "purpose": { "id": "sale", "name": "Sale" } },
            "status": "ready",
            "address": { "location": "Gulshan" },
            "type": { "id": "residential", "name": "Residential" },
            "subType": { "id": sub_type, "name": sub_type },
            "bed": 3,
            "bath": 2,
            "price": 1000.0 * n as f64,
            "size": 1200.0,
            "images": ["front.jpg"],
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    struct FailingStore;

    #[async_trait]
    impl ListingStore for FailingStore {
        async fn find(&self, _query: &FindQuery) -> Result<Vec<ListingSummary>> {
            Err(AppError::Store { message: "connection refused".into() })
        }

        async fn count(&self, _predicate: &Predicate) -> Result<u64> {
            Err(AppError::Store { message: "connection refused".into() })
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Listing>> {
            Err(AppError::Store { message: "connection refused".into() })
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::Store { message: "connection refused".into() })
        }
    }

    fn app_with(store: Arc<dyn ListingStore>, config: AppConfig) -> Router {
        let listings = ListingService::new(store, config.listings.clone());
        create_router(AppState {
            config: Arc::new(config),
            listings,
        })
    }

    fn app() -> Router {
        let mut listings: Vec<Listing> = (1..=25).map(|n| listing(n, "apartment")).collect();
        listings.push(listing(26, "duplex"));
        app_with(Arc::new(MemoryStore::new(listings)), AppConfig::default())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_welcome_and_headers() {
        let (status, headers, body) = get(app(), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("welcome to bd property"));
        assert_eq!(headers[header::REFERRER_POLICY], "strict-origin-when-cross-origin");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = get(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (_, _, body) = get(app(), "/ready").await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["store"]["status"], "up");
    }

    #[tokio::test]
    async fn test_list_envelope() {
        let (status, _, body) = get(app(), "/api/properties?subType=apartment&page=2&limit=10").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["page"], 2);
        assert_eq!(body["limit"], 10);
        assert_eq!(body["count"], 25);

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(results[0]["referenceNo"], "BDP-0011");
        // summaries never carry detail-only fields
        assert!(results[0].get("keywords").is_none());
        assert!(results[0].get("purpose").is_none());
    }

    #[tokio::test]
    async fn test_detail_with_related() {
        let uri = format!("/api/properties/{}", Uuid::from_u128(5));
        let (status, _, body) = get(app(), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["results"]["details"]["referenceNo"], "BDP-0005");

        let related = body["results"]["related"].as_array().unwrap();
        assert_eq!(related.len(), 3);
        let original = Uuid::from_u128(5).to_string();
        assert!(related.iter().all(|r| r["id"] != original.as_str()));

        let uri = format!("/api/properties/{}", Uuid::from_u128(26));
        let (_, _, body) = get(app(), &uri).await;
        assert!(body["results"]["related"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let uri = format!("/api/properties/{}", Uuid::from_u128(999));
        let (status, _, body) = get(app(), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Property not found" }));

        let (status, _, body) = get(app(), "/api/properties/not-an-id").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Property not found");
    }

    #[tokio::test]
    async fn test_undecodable_id_is_not_found() {
        let (status, _, body) = get(app(), "/api/properties/%FF").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Property not found" }));

        let (status, _, _) = get(app(), "/api/properties/%C3%28abc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_failures() {
        let app = app_with(Arc::new(FailingStore), AppConfig::default());

        let (status, _, body) = get(app.clone(), "/api/properties?bed=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "message": "Failed to fetch properties" }));

        let uri = format!("/api/properties/{}", Uuid::from_u128(1));
        let (status, _, body) = get(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "success": false, "message": "Failed to fetch property" }));

        let (_, _, body) = get(app, "/ready").await;
        assert_eq!(body["status"], "not_ready");
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_with_envelope() {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = app_with(Arc::new(MemoryStore::default()), config);

        let (status, _, _) = get(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);
    }
}
