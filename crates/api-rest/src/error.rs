use api_shared::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chairside_core::{AuditError, DocumentType};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorRes {
    pub detail: String,
    /// Set on 409 responses to the time of the existing confirmation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorRes {
                detail: detail.into(),
                confirmed_at: None,
            },
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Maps an error raised while generating a document.
    pub fn generation(document_type: DocumentType, err: AuditError) -> Self {
        match err {
            AuditError::Generation(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Failed to generate {}: {}",
                    document_type.as_str().replace('_', " "),
                    message
                ),
            ),
            other => Self::from_audit(other, "Failed to generate document"),
        }
    }

    /// Maps a core error, prefixing server-side failures with `context`.
    pub fn from_audit(err: AuditError, context: &str) -> Self {
        match err {
            AuditError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            AuditError::Conflict { confirmed_at, .. } => Self {
                status: StatusCode::CONFLICT,
                body: ErrorRes {
                    detail: err.to_string(),
                    confirmed_at: Some(confirmed_at),
                },
            },
            e if e.is_client_error() => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            e => {
                tracing::error!("{}: {:?}", context, e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{}: {}", context, e),
                )
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
