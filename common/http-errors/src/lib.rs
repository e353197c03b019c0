use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Shared client-facing error taxonomy. Every variant carries a stable
/// machine-readable code, surfaced both in the JSON body and in the
/// `X-Error-Code` response header consumed by the error-metrics middleware.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized { trace_id: Option<Uuid> },
    ForbiddenMissingRole { role: &'static str, trace_id: Option<Uuid> },
    Forbidden { trace_id: Option<Uuid> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Conflict { code: &'static str, trace_id: Option<Uuid> },
    /// External dependency rejected or failed the call; safe for the caller to retry.
    BadGateway { trace_id: Option<Uuid>, message: Option<String> },
    /// Operator-actionable configuration problem (missing/placeholder credentials).
    Config { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized { trace_id: None }
    }
    pub fn forbidden() -> Self {
        Self::Forbidden { trace_id: None }
    }
    pub fn bad_request(code: &'static str) -> Self {
        Self::BadRequest { code, trace_id: None, message: None }
    }
    pub fn bad_request_with<M: Into<String>>(code: &'static str, message: M) -> Self {
        Self::BadRequest { code, trace_id: None, message: Some(message.into()) }
    }
    pub fn not_found(code: &'static str) -> Self {
        Self::NotFound { code, trace_id: None }
    }
    pub fn conflict(code: &'static str) -> Self {
        Self::Conflict { code, trace_id: None }
    }
    pub fn bad_gateway<M: Into<String>>(message: M) -> Self {
        Self::BadGateway { trace_id: None, message: Some(message.into()) }
    }
    pub fn config<M: Into<String>>(code: &'static str, message: M) -> Self {
        Self::Config { code, trace_id: None, message: Some(message.into()) }
    }
    /// Internal failure with a generic client-facing message. Callers log
    /// the underlying error with context before constructing this.
    pub fn internal(trace_id: Option<Uuid>) -> Self {
        Self::Internal { trace_id, message: Some("internal error".to_string()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body, error_code) = match self {
            ApiError::Unauthorized { trace_id } => (
                StatusCode::UNAUTHORIZED,
                ErrorBody { code: "unauthorized".into(), missing_role: None, trace_id, message: None },
                "unauthorized",
            ),
            ApiError::ForbiddenMissingRole { role, trace_id } => (
                StatusCode::FORBIDDEN,
                ErrorBody { code: "missing_role".into(), missing_role: Some(role.into()), trace_id, message: None },
                "missing_role",
            ),
            ApiError::Forbidden { trace_id } => (
                StatusCode::FORBIDDEN,
                ErrorBody { code: "forbidden".into(), missing_role: None, trace_id, message: None },
                "forbidden",
            ),
            ApiError::BadRequest { code, trace_id, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody { code: code.into(), missing_role: None, trace_id, message },
                code,
            ),
            ApiError::NotFound { code, trace_id } => (
                StatusCode::NOT_FOUND,
                ErrorBody { code: code.into(), missing_role: None, trace_id, message: None },
                code,
            ),
            ApiError::Conflict { code, trace_id } => (
                StatusCode::CONFLICT,
                ErrorBody { code: code.into(), missing_role: None, trace_id, message: None },
                code,
            ),
            ApiError::BadGateway { trace_id, message } => (
                StatusCode::BAD_GATEWAY,
                ErrorBody { code: "gateway_rejected".into(), missing_role: None, trace_id, message },
                "gateway_rejected",
            ),
            ApiError::Config { code, trace_id, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { code: code.into(), missing_role: None, trace_id, message },
                code,
            ),
            ApiError::Internal { trace_id, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { code: "internal_error".into(), missing_role: None, trace_id, message },
                "internal_error",
            ),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
