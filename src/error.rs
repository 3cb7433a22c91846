//! # 错误处理模块
//!
//! 定义了处理器返回的错误类型，以及带 CORS 头的 JSON 响应辅助函数。
//! 所有响应（包括预检和错误）都携带同一组 CORS 头。

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// 每个响应都带上的头部
pub fn cors_headers() -> [(header::HeaderName, HeaderValue); 4] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ),
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ),
    ]
}

/// API 错误枚举
#[derive(Debug)]
pub enum ApiError {
    /// 405 - 只接受 POST
    MethodNotAllowed,
    /// 404 - 路径不存在
    NotFound,
    /// 400 - 缺少字段或字段无效
    BadRequest(String),
    /// 401 - 密码错误
    Unauthorized(String),
    /// 413 - 请求体超过上限
    PayloadTooLarge,
    /// 500 - 服务端缺少必要配置（如 MASTER_PASSWORD）
    Configuration(String),
    /// 500 - 未预期的错误；`details` 仅在开发模式下填充内部信息
    Internal {
        error: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Configuration(_) | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::MethodNotAllowed => "Method not allowed. Use POST.",
            ApiError::NotFound => "Not found",
            ApiError::PayloadTooLarge => "Request body too large",
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Configuration(msg) => msg.as_str(),
            ApiError::Internal { error, .. } => error.as_str(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            ApiError::NotFound => write!(f, "Not Found"),
            ApiError::PayloadTooLarge => write!(f, "Payload Too Large"),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            ApiError::Internal { error, details } => match details {
                Some(details) => write!(f, "Internal Error: {} ({})", error, details),
                None => write!(f, "Internal Error: {}", error),
            },
        }
    }
}

impl std::error::Error for ApiError {}

/// 将错误包装为 `{success:false, error, details?}`
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.message(),
        });
        if let ApiError::Internal {
            details: Some(details),
            ..
        } = &self
        {
            body["details"] = json!(details);
        }

        json_response(self.status(), &body)
    }
}

// ============================================================================
// 响应辅助函数
// ============================================================================

/// 带 CORS 头的 JSON 响应
pub fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(text) => (status, cors_headers(), text).into_response(),
        Err(e) => {
            tracing::error!("failed to serialize response body: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                cors_headers(),
                r#"{"success":false,"error":"Internal server error"}"#,
            )
                .into_response()
        }
    }
}

/// CORS 预检响应
///
/// 状态码 200，空响应体，不解析请求体。
pub fn preflight_response() -> Response {
    (StatusCode::OK, cors_headers(), "").into_response()
}
