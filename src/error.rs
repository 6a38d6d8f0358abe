use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum RdoError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Plan limit reached: {0}")]
    PlanLimit(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Category migration left {remaining} entries behind")]
    MigrationIncomplete { remaining: i64 },

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Upstream error with status {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },
}

impl RdoError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            RdoError::Unauthorized | RdoError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            RdoError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            RdoError::PlanLimit(_) => (StatusCode::FORBIDDEN, "PLAN_LIMIT"),
            RdoError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RdoError::BadRequest(_) | RdoError::Json(_) | RdoError::Csv(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            RdoError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            RdoError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            RdoError::DatabaseError(SqlxError::RowNotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            RdoError::DatabaseError(SqlxError::Database(db)) if db.is_unique_violation() => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            RdoError::DatabaseError(SqlxError::Database(db)) if db.is_foreign_key_violation() => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            RdoError::Reqwest(_) | RdoError::UrlParse(_) | RdoError::UpstreamStatus { .. } => {
                (StatusCode::BAD_GATEWAY, "BAD_GATEWAY")
            }
            RdoError::DatabaseError(_)
            | RdoError::Io(_)
            | RdoError::RactorError(_)
            | RdoError::Config(_)
            | RdoError::MigrationIncomplete { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for RdoError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        let detail = if status.is_server_error() {
            error!(error = %self, "request failed");
            match &self {
                // Internals of the database or filesystem stay in the logs.
                RdoError::DatabaseError(_) | RdoError::Io(_) | RdoError::RactorError(_) => {
                    "An internal server error occurred.".to_string()
                }
                other => other.to_string(),
            }
        } else {
            self.to_string()
        };
        (
            status,
            Json(ApiErrorBody {
                error: code.to_string(),
                detail,
            }),
        )
            .into_response()
    }
}

/// Error body returned by every endpoint: `{"error": CODE, "detail": message}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses() {
        assert_eq!(
            RdoError::Unauthorized.status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RdoError::PlanLimit("free".into()).status_and_code(),
            (StatusCode::FORBIDDEN, "PLAN_LIMIT")
        );
        assert_eq!(
            RdoError::DatabaseError(SqlxError::RowNotFound).status_and_code().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RdoError::MigrationIncomplete { remaining: 2 }
                .status_and_code()
                .0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
