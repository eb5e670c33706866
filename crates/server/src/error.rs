use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cinetrack_core::error::{ApiError, ErrorEnvelope};
use cinetrack_metadata::CatalogError;
use tracing::warn;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        let api = match &e {
            CatalogError::Superseded => ApiError::Conflict(e.to_string()),
            CatalogError::Timeout(_) => ApiError::GatewayTimeout(e.to_string()),
            CatalogError::UpstreamUnavailable(_)
            | CatalogError::DirectoryUnavailable { .. }
            | CatalogError::MalformedRecord(_) => ApiError::BadGateway(e.to_string()),
        };
        if !matches!(e, CatalogError::Superseded) {
            warn!(error = %e, "catalog request failed");
        }
        Self(api)
    }
}
