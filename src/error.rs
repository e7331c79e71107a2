// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::services::ServiceError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    InvalidInput(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 503 Service Unavailable (object store / database not reachable)
    StorageUnavailable(String),

    // 500 Internal Server Error; carries an opaque support code, never the cause
    Internal { support_code: String },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::StorageUnavailable(_) => 503,
            ApiError::Internal { .. } => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::InvalidInput(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::StorageUnavailable(msg) => msg.clone(),
            ApiError::Internal { support_code } => format!(
                "Something went wrong. Please contact support with error code: {}",
                support_code
            ),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            ApiError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Internal { support_code } => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code(),
                    "support_code": support_code,
                })
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code(),
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        ApiError::StorageUnavailable(message.into())
    }

    /// Build a 500 response: log the real cause server-side under a generated
    /// support code, expose only the code to the caller.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        let support_code = generate_support_code();
        tracing::error!("[{}] internal error: {}", support_code, cause);
        ApiError::Internal { support_code }
    }
}

/// Opaque 8-hex-char diagnostic code attached to 500 responses.
pub fn generate_support_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(msg) => ApiError::invalid_input(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::StorageUnavailable(msg) => {
                tracing::error!("storage unavailable: {}", msg);
                ApiError::storage_unavailable("Storage temporarily unavailable")
            }
            ServiceError::Persistence(msg) => ApiError::internal(msg),
        }
    }
}

impl From<crate::services::AuthError> for ApiError {
    fn from(err: crate::services::AuthError) -> Self {
        match err {
            crate::services::AuthError::InvalidCredentials => {
                ApiError::unauthorized("Invalid username or password")
            }
            crate::services::AuthError::Database(e) => ApiError::internal(e),
            crate::services::AuthError::Jwt(e) => ApiError::internal(e),
        }
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            other => ApiError::internal(other),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::invalid_input("x").status_code(), 400);
        assert_eq!(ApiError::unauthorized("x").status_code(), 401);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::conflict("x").status_code(), 409);
        assert_eq!(ApiError::storage_unavailable("x").status_code(), 503);
        assert_eq!(ApiError::internal("boom").status_code(), 500);
    }

    #[test]
    fn support_code_is_eight_hex_chars() {
        let code = generate_support_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn internal_error_hides_the_cause() {
        let err = ApiError::internal("connection refused to db");
        let body = err.to_json();
        let msg = body["message"].as_str().unwrap();
        assert!(!msg.contains("connection refused"));
        assert!(body["support_code"].as_str().unwrap().len() == 8);
    }

    #[test]
    fn service_errors_map_onto_http_statuses() {
        let cases = [
            (ServiceError::InvalidInput("x".into()), 400),
            (ServiceError::NotFound("x".into()), 404),
            (ServiceError::Conflict("x".into()), 409),
            (ServiceError::StorageUnavailable("x".into()), 503),
            (ServiceError::Persistence("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }
}
