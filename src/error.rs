// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::is_development;

/// HTTP API error with a stable machine-readable `code` for client-side
/// branching. Every failure serializes as
/// `{"success": false, "error": {"code": ..., "message": ...}}`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { code: &'static str, message: String },

    // 401 Unauthorized
    Unauthorized { code: &'static str, message: String },

    // 403 Forbidden
    Forbidden { code: &'static str, message: String },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error; holds the internal detail, which is never
    // sent to clients outside the development diagnostic mode
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest { .. } => 400,
            ApiError::Unauthorized { .. } => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::Unauthorized { message, .. } => message,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(_) => "An error occurred while processing your request",
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => code,
            ApiError::Unauthorized { code, .. } => code,
            ApiError::Forbidden { code, .. } => code,
            ApiError::NotFound(_) => "not-found",
            ApiError::Conflict(_) => "conflict",
            ApiError::InternalServerError(_) => "internal-error",
            ApiError::ServiceUnavailable(_) => "service-unavailable",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });

        // Internal detail only in the development diagnostic mode
        if is_development!() {
            if let ApiError::InternalServerError(detail) = self {
                body["error"]["detail"] = json!(detail);
            }
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: "invalid-request",
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            code: "auth/forbidden",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        use crate::auth::AuthError;
        match err {
            AuthError::MissingSecret => {
                tracing::error!("JWT secret not configured");
                ApiError::internal_server_error("Authentication is not configured")
            }
            other => ApiError::unauthorized(other.code(), other.to_string()),
        }
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        use crate::store::StoreError;
        match err {
            StoreError::InvalidRole(value) => ApiError::BadRequest {
                code: "invalid-role",
                message: format!("Invalid role value: '{}'", value),
            },
            StoreError::UserNotFound(id) => {
                ApiError::not_found(format!("User '{}' not found", id))
            }
            StoreError::Database(e) => {
                // Don't expose internal storage errors to clients
                tracing::error!("Claims store database error: {}", e);
                ApiError::internal_server_error(e.to_string())
            }
            StoreError::Serialization(e) => {
                tracing::error!("Claims blob serialization error: {}", e);
                ApiError::internal_server_error(e.to_string())
            }
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

    #[test]
    fn error_envelope_shape() {
        let err = ApiError::unauthorized("auth/no-token", "No bearer token provided");
        let body = err.to_json();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("auth/no-token"));
        assert_eq!(body["error"]["message"], json!("No bearer token provided"));
    }

    #[test]
    fn internal_detail_is_not_the_client_message() {
        let err = ApiError::internal_server_error("pg: connection refused at 10.0.0.3");
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("10.0.0.3"));
    }

    #[test]
    fn invalid_role_echoes_the_value() {
        let err: ApiError = crate::store::StoreError::InvalidRole("deacon".to_string()).into();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains("deacon"));
    }
}
