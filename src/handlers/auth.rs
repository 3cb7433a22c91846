use super::{guard_method, header_str, is_truthy, parse_body};
use crate::config::{is_development, AuthConfig, FALLBACK_SITE_URL};
use crate::error::{json_response, ApiError};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode},
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;

/// Authenticate response body (success cases only; failures go through `ApiError`)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AuthResponse {
    pub fn new() -> Self {
        Self {
            success: true,
            audio_url: None,
            message: None,
        }
    }

    pub fn with_audio_url(mut self, url: String) -> Self {
        self.audio_url = Some(url);
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

impl Default for AuthResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Base URL used to absolutize site-relative audio paths.
///
/// Configured site URL first, then `<proto>://<host>` from the request,
/// then a fixed placeholder.
pub fn resolve_site_url(config: &AuthConfig, headers: &HeaderMap) -> String {
    if let Some(site) = &config.site_url {
        return site.clone();
    }
    match header_str(headers, "host") {
        Some(host) => {
            let proto = header_str(headers, "x-forwarded-proto").unwrap_or("https");
            format!("{}://{}", proto, host)
        }
        None => FALLBACK_SITE_URL.to_string(),
    }
}

/// Prefix site-relative paths with the base URL; anything else is returned as-is
pub fn resolve_audio_url(audio_url: &str, site_url: &str) -> String {
    if audio_url.starts_with('/') {
        format!("{}{}", site_url, audio_url)
    } else {
        audio_url.to_string()
    }
}

/// Handler for /api/authenticate
pub async fn authenticate_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    if let Some(response) = guard_method(&method) {
        return Ok(response);
    }

    let provider = state.config.as_ref();
    let data = parse_body(body).map_err(|e| {
        tracing::error!("authentication error: {}", e);
        let details = if is_development(provider) {
            e.to_string()
        } else {
            "Contact support".to_string()
        };
        e.into_api_error("Authentication failed due to server error", Some(details))
    })?;

    let config = AuthConfig::load(provider);

    if is_truthy(data.get("getAudio")) {
        let site_url = resolve_site_url(&config, &headers);
        let audio_url = resolve_audio_url(&config.audio_url, &site_url);
        tracing::info!(
            audio_url = %config.audio_url,
            final_audio_url = %audio_url,
            site_url = %site_url,
            "audio URL requested"
        );

        let response = AuthResponse::new()
            .with_audio_url(audio_url)
            .with_message("Audio URL retrieved successfully");
        return Ok(json_response(StatusCode::OK, &response));
    }

    let password = match data.get("password").and_then(|v| v.as_str()) {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::BadRequest("Password is required".to_string())),
    };

    let masked: String = password.chars().take(3).collect();
    tracing::info!(
        has_master_password = config.master_password.is_some(),
        input_length = password.chars().count(),
        input_first_chars = %format!("{}...", masked),
        "password check"
    );

    let Some(master_password) = config.master_password.as_deref() else {
        tracing::error!("MASTER_PASSWORD environment variable is not set");
        return Err(ApiError::Configuration(
            "Server configuration error. Please contact administrator.".to_string(),
        ));
    };

    // byte-for-byte, plain comparison
    if password == master_password {
        tracing::info!("password authentication succeeded");
        let response = AuthResponse::new()
            .with_message("Authentication successful! Preparing your surprise...");
        Ok(json_response(StatusCode::OK, &response))
    } else {
        tracing::info!("password authentication failed");
        Err(ApiError::Unauthorized("Oops! Try Again!!".to_string()))
    }
}
