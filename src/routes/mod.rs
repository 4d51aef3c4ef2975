/**
 * Routes Module
 * API route handlers plus the shared response envelope and auth guard
 */

pub mod admin;
pub mod auth;
pub mod banner;
pub mod blog;
pub mod client;
pub mod dashboard;
pub mod enquiry;
pub mod health;
pub mod newsletter;
pub mod project;
pub mod review;
pub mod upload;
pub mod voucher;
pub mod work;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::routes::auth::{verify_access_token, Claims};

/// Uniform response envelope. `data` is present only on success payloads,
/// `error` only on failures in non-production mode.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT").map(|e| e == "production").unwrap_or(false)
}

/// Build a success envelope response.
pub fn success_response<T: Serialize>(
    status: StatusCode,
    message: &str,
    data: Option<T>,
) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            message: message.to_string(),
            data,
            error: None,
        }),
    )
        .into_response()
}

/// Build a failure envelope response with no extra detail.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Envelope::<()> {
            success: false,
            message: message.to_string(),
            data: None,
            error: None,
        }),
    )
        .into_response()
}

/// Build a failure envelope carrying the underlying error detail.
/// The detail string is suppressed in production mode.
pub fn error_response_with(
    status: StatusCode,
    message: &str,
    detail: impl std::fmt::Display,
) -> Response {
    let error = if is_production() {
        None
    } else {
        Some(detail.to_string())
    };
    (
        status,
        Json(Envelope::<()> {
            success: false,
            message: message.to_string(),
            data: None,
            error,
        }),
    )
        .into_response()
}

/// The 503 returned by every handler that needs a database before the pool
/// is initialized.
pub fn db_unavailable() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Database not available")
}

const MSG_TOKEN_MISSING: &str = "Access denied. Token required.";
const MSG_TOKEN_EXPIRED: &str = "Session expired. Please log in again.";
const MSG_TOKEN_INVALID: &str = "Invalid authentication token.";

/// Name of the session cookie set on login.
pub const SESSION_COOKIE: &str = "admin_token";

/// Pull the session token from the `admin_token` cookie or the
/// `Authorization: Bearer` header, cookie first.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
        });

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// Verify the request's session token and hand the decoded claims to the
/// handler. Missing, expired and malformed tokens each get their own 401
/// message so clients know whether to re-login or retry.
pub fn require_auth(headers: &HeaderMap) -> Result<Claims, Response> {
    let token = match extract_session_token(headers) {
        Some(t) => t,
        None => {
            return Err(error_response(StatusCode::UNAUTHORIZED, MSG_TOKEN_MISSING));
        }
    };

    match verify_access_token(&token) {
        Ok(claims) => Ok(claims),
        Err(e) => {
            let message = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => MSG_TOKEN_EXPIRED,
                _ => MSG_TOKEN_INVALID,
            };
            tracing::debug!("Token verification failed: {}", e);
            Err(error_response(StatusCode::UNAUTHORIZED, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_success_envelope_omits_absent_data() {
        let body = serde_json::to_string(&Envelope::<()> {
            success: true,
            message: "ok".to_string(),
            data: None,
            error: None,
        })
        .unwrap();
        assert_eq!(body, r#"{"success":true,"message":"ok"}"#);
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_token=abc123"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_token_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_extract_token_none_when_absent() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn test_require_auth_missing_token_message() {
        let headers = HeaderMap::new();
        assert!(require_auth(&headers).is_err());
    }

    #[test]
    fn test_require_auth_rejects_garbage_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not.a.jwt"),
        );
        assert!(require_auth(&headers).is_err());
    }
}
