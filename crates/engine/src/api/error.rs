//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use eom_domain::DomainError;
use eom_shared::ErrorBody;

use crate::infrastructure::ports::RepoError;
use crate::use_cases::{RoomError, UserError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal error".to_string()
            }
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg) => msg,
        };
        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let msg = e.to_string();
        match e {
            DomainError::Validation(_)
            | DomainError::InvalidId(_)
            | DomainError::InsufficientFunds { .. } => ApiError::BadRequest(msg),
            DomainError::NotFound { .. } => ApiError::NotFound(msg),
            DomainError::NotPermitted(_) => ApiError::Forbidden(msg),
            DomainError::Constraint(_)
            | DomainError::InvalidStateTransition(_)
            | DomainError::RoomFull { .. } => ApiError::Conflict(msg),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            RepoError::ConstraintViolation(_) => ApiError::Conflict(e.to_string()),
            RepoError::Database { .. } | RepoError::Serialization(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::RoomNotFound(_) => ApiError::NotFound(e.to_string()),
            RoomError::Domain(e) => e.into(),
            RoomError::Repo(e) => e.into(),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(_) => ApiError::NotFound(e.to_string()),
            UserError::Domain(e) => e.into(),
            UserError::Repo(e) => e.into(),
        }
    }
}
