//! # HTTP 处理器模块
//!
//! 定义了所有 HTTP 请求处理器和路由。
//! - `auth` - 密码校验与音频地址
//! - `reaction` - 接收留言
//! - `admin` - 运维接口（查看、清空留言），只挂在独立的监听地址上

pub mod admin;
pub mod auth;
pub mod reaction;

pub use admin::{clear_reactions_handler, list_reactions_handler};
pub use auth::authenticate_handler;
pub use reaction::save_reaction_handler;

use crate::error::{preflight_response, ApiError};
use crate::state::{AppState, RequestMeta};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 对外接口允许的最大请求体（字节）
///
/// 超长留言会在保存时截断，所以这里只防止明显异常的请求。
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// 对外路由
///
/// 所有方法都交给处理器，由处理器自己处理预检和 405。
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/authenticate", any(authenticate_handler))
        .route("/api/save-reaction", any(save_reaction_handler))
        // 兼容旧前端的函数路径
        .route("/.netlify/functions/authenticate", any(authenticate_handler))
        .route("/.netlify/functions/save-reaction", any(save_reaction_handler))
        .fallback(fallback_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 运维路由
pub fn admin_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/reactions",
            get(list_reactions_handler).delete(clear_reactions_handler),
        )
        .with_state(state)
}

/// 任意路径上的预检都直接放行，其余请求返回 404
async fn fallback_handler(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight_response();
    }
    ApiError::NotFound.into_response()
}

/// 预检和方法检查
///
/// 返回 `Some` 时处理器直接返回该响应，不再解析请求体。
pub(crate) fn guard_method(method: &Method) -> Option<Response> {
    if method == Method::OPTIONS {
        Some(preflight_response())
    } else if method != Method::POST {
        Some(ApiError::MethodNotAllowed.into_response())
    } else {
        None
    }
}

/// 请求体读取或解析失败的原因
#[derive(Debug)]
pub(crate) enum BodyError {
    /// 超过 `MAX_BODY_BYTES`
    TooLarge,
    /// 读取请求体失败
    Unreadable(BytesRejection),
    /// 不是合法 JSON
    Malformed(serde_json::Error),
    /// 顶层为 `null`，无法读取任何字段
    Null,
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::TooLarge => {
                write!(f, "request body exceeds {} bytes", MAX_BODY_BYTES)
            }
            BodyError::Unreadable(e) => write!(f, "{}", e.body_text()),
            BodyError::Malformed(e) => write!(f, "{}", e),
            BodyError::Null => write!(f, "Cannot read properties of null"),
        }
    }
}

impl std::error::Error for BodyError {}

impl BodyError {
    /// 转换为响应错误：超长为 413，其余按服务端错误处理
    pub(crate) fn into_api_error(self, error: &str, details: Option<String>) -> ApiError {
        match self {
            BodyError::TooLarge => ApiError::PayloadTooLarge,
            _ => ApiError::Internal {
                error: error.to_string(),
                details,
            },
        }
    }
}

/// 解析 JSON 请求体，空请求体视为 `{}`
///
/// 顶层为 `null` 时无法读取字段，按解析失败处理；其他非对象值没有任何字段。
pub(crate) fn parse_body(body: Result<Bytes, BytesRejection>) -> Result<Value, BodyError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            BodyError::TooLarge
        } else {
            BodyError::Unreadable(rejection)
        }
    })?;

    if body.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_slice(&body).map_err(BodyError::Malformed)? {
        Value::Null => Err(BodyError::Null),
        value => Ok(value),
    }
}

/// 按 JavaScript 的真值规则判断字段
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 从 X-Forwarded-For（取第一跳）或 Client-IP 中取客户端 IP
fn get_client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| header_str(headers, "client-ip").map(str::to_string))
}

/// 收集请求来源信息，缺失的字段记为 "unknown"
pub(crate) fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let defaults = RequestMeta::default();
    RequestMeta {
        ip: get_client_ip(headers).unwrap_or(defaults.ip),
        user_agent: header_str(headers, "user-agent")
            .map(str::to_string)
            .unwrap_or(defaults.user_agent),
        referer: header_str(headers, "referer")
            .map(str::to_string)
            .unwrap_or(defaults.referer),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[tokio::test]
    async fn test_preflight_on_any_path() {
        for uri in [
            "/api/authenticate",
            "/api/save-reaction",
            "/.netlify/functions/authenticate",
            "/somewhere/else",
        ] {
            let app = router(state_with(&[]));
            let response = send(app, Method::OPTIONS, uri, &[], "not json").await;
            assert_eq!(response.status, StatusCode::OK, "{}", uri);
            assert!(response.body.is_empty());
            assert_cors(&response.headers);
        }
    }

    #[tokio::test]
    async fn test_non_post_methods_rejected() {
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            for uri in ["/api/authenticate", "/api/save-reaction"] {
                let app = router(state_with(&[]));
                let response = send(app, method.clone(), uri, &[], "").await;
                assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
                assert_cors(&response.headers);
                assert_eq!(
                    response.json(),
                    json!({"success": false, "error": "Method not allowed. Use POST."})
                );
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = router(state_with(&[]));
        let response = send(app, Method::POST, "/nope", &[], "{}").await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json()["success"], json!(false));
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!("yes"))));
        assert!(is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
    }

    fn body(text: &'static str) -> Result<Bytes, BytesRejection> {
        Ok(Bytes::from_static(text.as_bytes()))
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(body("")).unwrap(), json!({}));
        assert_eq!(parse_body(body(r#"{"a":1}"#)).unwrap(), json!({"a": 1}));
        assert_eq!(parse_body(body(r#""text""#)).unwrap(), json!("text"));
        assert!(matches!(parse_body(body("{oops")), Err(BodyError::Malformed(_))));
        assert!(matches!(parse_body(body("null")), Err(BodyError::Null)));
        assert!(matches!(parse_body(body(" null ")), Err(BodyError::Null)));
    }

    #[tokio::test]
    async fn test_preflight_with_oversized_body() {
        let huge = "x".repeat(MAX_BODY_BYTES + 1);
        for uri in ["/api/authenticate", "/api/save-reaction"] {
            let app = router(state_with(&[]));
            let response = send(app, Method::OPTIONS, uri, &[], &huge).await;
            assert_eq!(response.status, StatusCode::OK, "{}", uri);
            assert!(response.body.is_empty());
            assert_cors(&response.headers);
        }
    }

    #[tokio::test]
    async fn test_oversized_post_is_json_413() {
        let huge = format!(r#"{{"reaction":"{}"}}"#, "x".repeat(MAX_BODY_BYTES));
        for uri in ["/api/authenticate", "/api/save-reaction"] {
            let app = router(state_with(&[]));
            let response = send(app, Method::POST, uri, &[], &huge).await;
            assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE, "{}", uri);
            assert_cors(&response.headers);
            assert_eq!(
                response.json(),
                json!({"success": false, "error": "Request body too large"})
            );
        }
    }

    #[test]
    fn test_request_meta() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_meta(&headers).ip, "unknown");

        headers.insert("client-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(request_meta(&headers).ip, "10.0.0.9");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));
        headers.insert("referer", HeaderValue::from_static("https://x.com/"));
        let meta = request_meta(&headers);
        assert_eq!(meta.ip, "203.0.113.7");
        assert_eq!(meta.user_agent, "curl/8.0");
        assert_eq!(meta.referer, "https://x.com/");
    }
}
