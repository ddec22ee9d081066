//! Property listing handlers

use axum::{
    extract::{rejection::PathRejection, Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::AppState;
use bdproperty_common::{
    errors::{AppError, ErrorResponse, Result},
    metrics,
    query::QueryParams,
    services::{ListingDetail, ListingPage},
};

pub const LIST_FAILED_MESSAGE: &str = "Failed to fetch properties";
pub const DETAIL_FAILED_MESSAGE: &str = "Failed to fetch property";

/// Successful list response
#[derive(Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub page: ListingPage,
}

/// Successful detail response
#[derive(Serialize)]
pub struct DetailResponse {
    pub success: bool,
    pub message: String,
    pub results: ListingDetail,
}

/// List properties matching the query string.
///
/// Store failures are reported in the body with HTTP 200.
pub async fn list_properties(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = QueryParams::parse(query.as_deref());

    match state.listings.list(&params).await {
        Ok(page) => Json(ListResponse {
            success: true,
            message: String::new(),
            page,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, code = ?e.code(), "Listing query failed");
            (StatusCode::OK, Json(ErrorResponse::new(LIST_FAILED_MESSAGE))).into_response()
        }
    }
}

/// Get one property with its related listings.
///
/// An id that does not decode as UTF-8 cannot name a listing and is
/// reported as not found.
pub async fn get_property(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<DetailResponse>> {
    let id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Undecodable listing id");
            metrics::record_detail_lookup("not_found");
            return Err(AppError::ListingNotFound {
                id: rejection.body_text(),
            });
        }
    };

    let results = state.listings.detail(&id).await.map_err(|e| {
        if e.is_not_found() {
            e
        } else {
            tracing::error!(error = %e, code = ?e.code(), id = %id, "Listing detail failed");
            AppError::FetchFailed {
                message: DETAIL_FAILED_MESSAGE.to_string(),
            }
        }
    })?;

    Ok(Json(DetailResponse {
        success: true,
        message: String::new(),
        results,
    }))
}
