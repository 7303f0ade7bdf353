use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Validation and entitlement errors carry a user-facing message. Extraction,
/// AI, storage, and database failures are logged in full server-side and
/// surfaced to the client as a generic message — provider internals never
/// leak to the end user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Entitlement error: {0}")]
    Entitlement(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("AI call failed: {0}")]
    AiCall(String),

    #[error("AI response invalid: {0}")]
    AiResponse(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnsupportedFileType(msg) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FILE_TYPE",
                format!("Unsupported file type: {msg}. Upload a PDF or DOCX file."),
            ),
            AppError::Extraction(msg) => {
                tracing::error!("Extraction error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_FAILED",
                    "Could not read the uploaded file. Check that it is a valid PDF or DOCX."
                        .to_string(),
                )
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Entitlement(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                "ENTITLEMENT_ERROR",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::AiCall(msg) => {
                tracing::error!("AI call error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI_CALL_FAILED",
                    "Failed to analyze the resume. Please try again.".to_string(),
                )
            }
            AppError::AiResponse(msg) => {
                tracing::error!("AI response error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI_RESPONSE_INVALID",
                    "Failed to analyze the resume. Please try again.".to_string(),
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "S3_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Webhook(msg) => {
                tracing::warn!("Webhook rejected: {msg}");
                (StatusCode::BAD_REQUEST, "WEBHOOK_ERROR", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let resp = AppError::Validation("bad input".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unsupported_file_type_maps_to_400() {
        let resp = AppError::UnsupportedFileType("txt".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_extraction_maps_to_422() {
        let resp = AppError::Extraction("truncated xref table".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_entitlement_maps_to_402() {
        let resp =
            AppError::Entitlement("No active subscription found".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_ai_call_maps_to_500() {
        let resp = AppError::AiCall("connection refused".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
