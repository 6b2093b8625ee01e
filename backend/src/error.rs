use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::req::ErrorResponse;
use serde_json::Value;

use crate::validation::ValidationErrors;

pub type ApiResult<T> = Result<T, ApiError>;

/// Field whose validation failure is reported as an authentication failure.
const PSK_FIELD: &str = "psk";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("authentication failed: {0}")]
    Unauthorized(ValidationErrors),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Auth payloads that fail on the shared secret answer 401 instead of 400.
    pub fn auth_validation(errors: ValidationErrors) -> Self {
        if errors.contains_field(PSK_FIELD) {
            ApiError::Unauthorized(errors)
        } else {
            ApiError::Validation(errors)
        }
    }

    fn message(&self) -> Value {
        match self {
            ApiError::Validation(errors) | ApiError::Unauthorized(errors) => errors.to_message(),
            other => Value::String(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if let ApiError::Internal(err) = self {
            log::error!("request failed: {err:#}");
        }

        HttpResponse::build(status).json(ErrorResponse {
            status: status.as_u16(),
            message: self.message(),
        })
    }
}
