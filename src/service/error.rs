use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Offer {0} not found")]
    OfferNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Payout {0} not found")]
    PayoutNotFound(Uuid),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("User {0} is not authorized to perform this action")]
    Forbidden(Uuid),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Payment has not been captured into escrow for order {0}")]
    PaymentNotCaptured(Uuid),

    #[error("Freelancer {0} has no connected payout account")]
    AccountNotOnboarded(Uuid),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    /// Unique-constraint violations surface as Duplicate; the guard
    /// tripping is benign, not a server fault.
    pub fn from_db(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return ServiceError::Duplicate(what.to_string());
            }
        }
        ServiceError::Database(err)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidState(_) => StatusCode::BAD_REQUEST,

            ServiceError::OfferNotFound(_)
            | ServiceError::OrderNotFound(_)
            | ServiceError::PayoutNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::Duplicate(_) => StatusCode::CONFLICT,

            ServiceError::PaymentNotCaptured(_) | ServiceError::AccountNotOnboarded(_) => {
                StatusCode::PAYMENT_REQUIRED
            }

            ServiceError::Gateway(_)
            | ServiceError::Database(_)
            | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match &error {
            // Gateway/database detail stays in the logs; the caller gets
            // a generic failure.
            ServiceError::Gateway(detail) => {
                tracing::error!("gateway failure: {}", detail);
                HttpError::server_error("Payment processing failed")
            }
            ServiceError::Database(detail) => {
                tracing::error!("database failure: {}", detail);
                HttpError::server_error("Internal server error")
            }
            _ => HttpError::new(error.to_string(), error.status_code()),
        }
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ServiceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::OfferNotFound(Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Forbidden(Uuid::nil()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Duplicate("order".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::PaymentNotCaptured(Uuid::nil()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ServiceError::Gateway("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
