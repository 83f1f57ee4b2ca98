//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_kernel::TemporalError;
use domain_receivables::LedgerError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::CustomerNotFound(_) => ApiError::NotFound(err.to_string()),
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidDateRange(_)
            | LedgerError::BalanceOverflow(_) => ApiError::Validation(err.to_string()),
            LedgerError::ConcurrencyConflict { .. } => ApiError::Conflict(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TemporalError> for ApiError {
    fn from(err: TemporalError) -> Self {
        LedgerError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{CustomerId, PortError};
    use rust_decimal::Decimal;

    fn status_of(err: LedgerError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_ledger_errors_map_to_status_codes() {
        let customer = CustomerId::new();

        assert_eq!(status_of(LedgerError::CustomerNotFound(customer)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(LedgerError::InvalidAmount(Decimal::ZERO)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(LedgerError::ConcurrencyConflict {
                customer_id: customer,
                attempts: 3
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LedgerError::BalanceOverflow(customer)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(LedgerError::FleetTotalsOverflow),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(LedgerError::Port(PortError::connection("down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_date_is_a_validation_error() {
        let err = core_kernel::DateRange::parse(Some("2024-13-01"), None).unwrap_err();

        assert!(matches!(ApiError::from(err), ApiError::Validation(_)));
    }
}
