use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::application::usecases::{
    auth::AuthError, catalog::CatalogError, checkout::CheckoutError, dashboard::DashboardError,
    enrollments::EnrollmentError, progress::ProgressError, reconciliation::ReconciliationError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Rejected { status, message } => (status, message),
            AppError::Internal(_) => {
                // Detail is logged where the error happened, never returned.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

macro_rules! impl_from_usecase_error {
    ($($error:ty),+ $(,)?) => {
        $(
            impl From<$error> for AppError {
                fn from(err: $error) -> Self {
                    let status = err.status_code();
                    if status.is_server_error() {
                        AppError::Internal(anyhow::anyhow!(err.to_string()))
                    } else {
                        AppError::Rejected {
                            status,
                            message: err.to_string(),
                        }
                    }
                }
            }
        )+
    };
}

impl_from_usecase_error!(
    AuthError,
    CatalogError,
    CheckoutError,
    DashboardError,
    EnrollmentError,
    ProgressError,
    ReconciliationError,
);
