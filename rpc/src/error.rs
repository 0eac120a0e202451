//! API errors and the `{ success, message, data }` response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use fomo_governance::{GovernanceError, ValidationError};
use fomo_ledger::LedgerError;
use fomo_registry::RegistryError;
use fomo_store::StoreError;

/// Body of every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Session expired or invalid.")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    /// A supplied transaction signature is not confirmed on the ledger.
    #[error("Transaction {0} is not confirmed.")]
    NotConfirmed(String),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("data store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for RpcError {
    fn from(e: ValidationError) -> Self {
        Self::Governance(e.into())
    }
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::NotConfirmed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Governance(e) => match e {
                GovernanceError::Validation(ValidationError::ProposalNotFound(_))
                | GovernanceError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
                GovernanceError::Validation(ValidationError::DailyCapReached { .. }) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                GovernanceError::Validation(_) => StatusCode::BAD_REQUEST,
                GovernanceError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Registry(e) => match e {
                RegistryError::MissingFields
                | RegistryError::InvalidMint(_)
                | RegistryError::InvalidWallet(_) => StatusCode::BAD_REQUEST,
                RegistryError::AlreadyListed => StatusCode::CONFLICT,
                RegistryError::TokenNotFound | RegistryError::ApplicationNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                RegistryError::AuthenticationFailed | RegistryError::Unauthorized => {
                    StatusCode::UNAUTHORIZED
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Ledger(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Server(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the caller.
    pub fn message(&self) -> String {
        match self {
            Self::Governance(e) => e.user_message(),
            Self::Registry(
                e @ (RegistryError::Hashing(_) | RegistryError::Random(_) | RegistryError::Store(_)),
            ) => {
                tracing::error!(error = %e, "registry failure");
                "Something went wrong. Please try again.".to_string()
            }
            Self::Store(_) | Self::Server(_) | Self::Ledger(_) | Self::Io(_) => {
                tracing::error!(error = %self, "request failed");
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            message: Some(self.message()),
            data: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_governance::LedgerWriteError;
    use fomo_nullables::test_signature;

    #[test]
    fn ledger_write_failure_is_a_server_error_with_support_message() {
        let err = RpcError::Governance(GovernanceError::LedgerWrite(LedgerWriteError {
            burn_tx: test_signature(1),
            reward_tx: Some(test_signature(2)),
            source: StoreError::Backend("disk".into()),
        }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("contact support"));
    }

    #[test]
    fn duplicate_listing_is_a_conflict() {
        let err = RpcError::Registry(RegistryError::AlreadyListed);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "Token already listed.");
    }

    #[test]
    fn daily_cap_is_too_many_requests() {
        let err: RpcError = ValidationError::DailyCapReached { cap: 5 }.into();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
