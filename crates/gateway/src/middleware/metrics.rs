//! Request metrics middleware

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use bdproperty_common::metrics::RequestMetrics;

/// Record count and latency for every request, labelled by route template
pub async fn track_metrics(request: Request, next: Next) -> Response {
    // Route templates keep listing ids out of label values
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let metrics = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}
