/**
 * Authentication Routes
 * JWT session auth (login, change password, check status, logout) and the
 * password-reset token lifecycle (request, verify, consume)
 */
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{self, models::Admin};
use crate::mail::{self, templates::Template};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
    SESSION_COOKIE,
};

// ============================================================================
// Configuration
// ============================================================================

lazy_static::lazy_static! {
    /// JWT signing secret from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());

    /// Session token lifetime in minutes
    pub static ref JWT_EXPIRY_MINUTES: i64 = std::env::var("JWT_EXPIRY_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    /// Public site URL used to build reset links
    pub static ref FRONTEND_URL: String = std::env::var("FRONTEND_URL")
        .unwrap_or_else(|_| "http://localhost:5173".to_string());
}

/// Reset links die 10 minutes after issue.
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Raw reset token length; 64 alphanumeric chars is well past 256 bits.
const RESET_TOKEN_LEN: usize = 64;

const MSG_INVALID_ACCOUNT: &str = "Invalid account details.";
const MSG_INCORRECT_PASSWORD: &str = "The password entered is incorrect.";
const MSG_LOGIN_SUCCESS: &str = "Login successful. Welcome back!";

// ============================================================================
// Types
// ============================================================================

/// JWT claims carried by the session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // Admin ID
    pub email: String, // Admin email
    pub role: String,  // Admin role
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResetTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenStatus {
    pub valid: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a signed session token for an admin.
pub fn create_access_token(
    admin_id: &str,
    email: &str,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::minutes(*JWT_EXPIRY_MINUTES);

    let claims = Claims {
        sub: admin_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

/// Verify and decode a session token.
pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Generate a raw reset token. Only its hash ever reaches the database.
fn generate_reset_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), RESET_TOKEN_LEN)
}

/// Hash a reset token for storage using SHA-256.
/// Using a cryptographic hash is important because the hash is stored
/// in the database and could be a target for pre-image attacks if a
/// non-cryptographic function (e.g. DefaultHasher) were used instead.
fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// bcrypt-hash a password off the async executor.
async fn hash_password(password: String) -> Result<String, ()> {
    match tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST)).await {
        Ok(Ok(h)) => Ok(h),
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            Err(())
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            Err(())
        }
    }
}

/// Compare a password against a stored bcrypt hash off the async executor.
async fn verify_password(password: String, password_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify(&password, &password_hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT").map(|e| e == "production").unwrap_or(false)
}

fn session_cookie(token: &str) -> String {
    let secure = if is_production() { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Strict; Max-Age={}{}",
        SESSION_COOKIE,
        token,
        *JWT_EXPIRY_MINUTES * 60,
        secure
    )
}

fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0",
        SESSION_COOKIE
    )
}

fn attach_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

async fn fetch_admin_by_id(pool: &sqlx::PgPool, id: Uuid) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        r#"SELECT id, name, email, phone, img, password_hash, role, created_at, updated_at
           FROM admins WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

// ============================================================================
// Session Handlers
// ============================================================================

/// POST /api/auth/login
/// Authenticate an admin, set the session cookie and return the sanitized
/// account.
pub async fn login(Json(payload): Json<LoginRequest>) -> Response {
    if payload.email.is_empty() || payload.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email and password are required");
    }

    if !payload.email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let admin = match sqlx::query_as::<_, Admin>(
        r#"SELECT id, name, email, phone, img, password_hash, role, created_at, updated_at
           FROM admins WHERE LOWER(email) = LOWER($1)"#,
    )
    .bind(&payload.email)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            tracing::warn!("Login attempt for unknown account: {}", payload.email);
            return error_response(StatusCode::UNAUTHORIZED, MSG_INVALID_ACCOUNT);
        }
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while logging in",
                e,
            );
        }
    };

    if !verify_password(payload.password, admin.password_hash.clone()).await {
        tracing::warn!("Failed login attempt for: {}", admin.email);
        return error_response(StatusCode::UNAUTHORIZED, MSG_INCORRECT_PASSWORD);
    }

    let token = match create_access_token(&admin.id.to_string(), &admin.email, &admin.role) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to create session token: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token");
        }
    };

    tracing::info!("Successful login for admin: {}", admin.email);

    let cookie = session_cookie(&token);
    let response = success_response(StatusCode::OK, MSG_LOGIN_SUCCESS, Some(admin));
    attach_cookie(response, &cookie)
}

/// POST /api/auth/change_password
/// Change the authenticated admin's password after re-checking the old one.
pub async fn change_password(
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Response {
    let claims = match require_auth(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Both old and new passwords are required",
        );
    }

    if payload.new_password.len() < 6 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters long",
        );
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let admin_id = match claims.sub.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::UNAUTHORIZED, "Invalid authentication token."),
    };

    let admin = match fetch_admin_by_id(pool.as_ref(), admin_id).await {
        Ok(Some(admin)) => admin,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            tracing::error!("Database error during password change: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password change failed.",
                e,
            );
        }
    };

    if !verify_password(payload.old_password, admin.password_hash.clone()).await {
        return error_response(StatusCode::BAD_REQUEST, MSG_INCORRECT_PASSWORD);
    }

    let new_hash = match hash_password(payload.new_password).await {
        Ok(h) => h,
        Err(()) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process password")
        }
    };

    match sqlx::query("UPDATE admins SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(&new_hash)
        .bind(admin.id)
        .execute(pool.as_ref())
        .await
    {
        Ok(_) => success_response::<()>(StatusCode::OK, "Password changed successfully.", None),
        Err(e) => {
            tracing::error!("Failed to persist new password: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Password change failed.", e)
        }
    }
}

/// GET /api/auth/check_login
/// Report whether the caller's session is still valid and return the account.
pub async fn check_login(headers: HeaderMap) -> Response {
    let claims = match require_auth(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let admin_id = match claims.sub.parse::<Uuid>() {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::UNAUTHORIZED, "Invalid authentication token."),
    };

    match fetch_admin_by_id(pool.as_ref(), admin_id).await {
        Ok(Some(admin)) => success_response(StatusCode::OK, "Already logged in", Some(admin)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            tracing::error!("Database error during login check: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Server error", e)
        }
    }
}

/// POST /api/auth/logout
/// Clear the session cookie. Idempotent.
pub async fn logout(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let response = success_response::<()>(StatusCode::OK, "Logged out successfully", None);
    attach_cookie(response, &clear_session_cookie())
}

// ============================================================================
// Password-Reset Handlers
// ============================================================================

/// POST /api/auth/forgot_password
/// Issue a fresh single-use reset token and mail it as a link. Any prior
/// tokens for the account are invalidated first. Mail failure is logged,
/// never surfaced; a failed insert is a 500.
pub async fn forgot_password(Json(payload): Json<ForgotPasswordRequest>) -> Response {
    if payload.email.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email is required");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let admin = match sqlx::query_as::<_, Admin>(
        r#"SELECT id, name, email, phone, img, password_hash, role, created_at, updated_at
           FROM admins WHERE LOWER(email) = LOWER($1)"#,
    )
    .bind(&payload.email)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(admin)) => admin,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Account not found"),
        Err(e) => {
            tracing::error!("Database error during reset request: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send reset link",
                e,
            );
        }
    };

    let raw_token = generate_reset_token();
    let token_hash = hash_reset_token(&raw_token);
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    // Invalidate prior links before storing the new one.
    if let Err(e) = sqlx::query("DELETE FROM password_resets WHERE admin_id = $1")
        .bind(admin.id)
        .execute(pool.as_ref())
        .await
    {
        tracing::error!("Failed to clear old reset requests: {}", e);
        return error_response_with(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send reset link",
            e,
        );
    }

    if let Err(e) = sqlx::query(
        "INSERT INTO password_resets (admin_id, token_hash, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(admin.id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(pool.as_ref())
    .await
    {
        tracing::error!("Failed to store reset request: {}", e);
        return error_response_with(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send reset link",
            e,
        );
    }

    // The raw token leaves the process exactly once, inside this link.
    let reset_link = format!("{}/reset-password/{}", FRONTEND_URL.as_str(), raw_token);
    let outcome = mail::send(
        &admin.email,
        "Reset your password",
        Template::PasswordReset { reset_link },
    )
    .await;
    if !outcome.success {
        tracing::warn!("Reset email delivery failed for {}", admin.email);
    }

    success_response::<()>(StatusCode::OK, "Password reset email sent successfully", None)
}

/// POST /api/auth/verify_reset_token
/// Non-destructive check that a reset link is still good.
pub async fn verify_reset_token(Json(payload): Json<VerifyResetTokenRequest>) -> Response {
    if payload.token.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Token is required");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let token_hash = hash_reset_token(&payload.token);

    match sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM password_resets WHERE token_hash = $1 AND expires_at > now())",
    )
    .bind(&token_hash)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(valid) => {
            let message = if valid {
                "Reset token is valid"
            } else {
                "Invalid or expired reset token"
            };
            success_response(StatusCode::OK, message, Some(ResetTokenStatus { valid }))
        }
        Err(e) => {
            tracing::error!("Database error during token verification: {}", e);
            error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Token verification failed",
                e,
            )
        }
    }
}

/// POST /api/auth/reset_password
/// Consume a reset token: set the new password and burn every outstanding
/// token for the account.
pub async fn reset_password(Json(payload): Json<ResetPasswordRequest>) -> Response {
    if payload.token.is_empty() || payload.new_password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Token and new password are required");
    }

    if payload.new_password.len() < 6 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters long",
        );
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let token_hash = hash_reset_token(&payload.token);

    // Expiry is checked here at read time; a stale row that the purge has
    // not caught yet must never validate.
    let admin_id = match sqlx::query_scalar::<_, Uuid>(
        "SELECT admin_id FROM password_resets WHERE token_hash = $1 AND expires_at > now()",
    )
    .bind(&token_hash)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(id)) => id,
        Ok(None) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid or expired reset token")
        }
        Err(e) => {
            tracing::error!("Database error during password reset: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password reset failed",
                e,
            );
        }
    };

    let admin = match fetch_admin_by_id(pool.as_ref(), admin_id).await {
        Ok(Some(admin)) => admin,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            tracing::error!("Database error during password reset: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password reset failed",
                e,
            );
        }
    };

    let new_hash = match hash_password(payload.new_password).await {
        Ok(h) => h,
        Err(()) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process password")
        }
    };

    if let Err(e) =
        sqlx::query("UPDATE admins SET password_hash = $1, updated_at = now() WHERE id = $2")
            .bind(&new_hash)
            .bind(admin.id)
            .execute(pool.as_ref())
            .await
    {
        tracing::error!("Failed to persist reset password: {}", e);
        return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Password reset failed", e);
    }

    // Burn every outstanding token for the account, not just the one used.
    if let Err(e) = sqlx::query("DELETE FROM password_resets WHERE admin_id = $1")
        .bind(admin.id)
        .execute(pool.as_ref())
        .await
    {
        tracing::error!("Failed to purge consumed reset tokens: {}", e);
    }

    let outcome = mail::send(
        &admin.email,
        "Your password was changed",
        Template::PasswordChanged {
            name: admin.name.clone(),
        },
    )
    .await;
    if !outcome.success {
        tracing::warn!("Password-changed email delivery failed for {}", admin.email);
    }

    success_response::<()>(StatusCode::OK, "Password reset successful", None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn auth_router() -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/change_password", post(change_password))
            .route("/api/auth/check_login", get(check_login))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/forgot_password", post(forgot_password))
            .route("/api/auth/verify_reset_token", post(verify_reset_token))
            .route("/api/auth/reset_password", post(reset_password))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    #[test]
    fn test_reset_token_hash_is_deterministic_hex() {
        let a = hash_reset_token("some-raw-token");
        let b = hash_reset_token("some-raw-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_raw_token_never_matches_stored_form() {
        let raw = generate_reset_token();
        assert_eq!(raw.len(), RESET_TOKEN_LEN);
        assert_ne!(raw, hash_reset_token(&raw));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_access_token_roundtrip() {
        let token = create_access_token("some-id", "admin@example.com", "admin").unwrap();
        let claims = verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "some-id");
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        assert!(verify_access_token("invalid.jwt.token").is_err());
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "".to_string(),
                password: "secret123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_invalid_email_format_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "no-at-sign".to_string(),
                password: "secret123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_forgot_password_requires_email() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/forgot_password",
            &ForgotPasswordRequest {
                email: "".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_reset_token_requires_token() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/verify_reset_token",
            &VerifyResetTokenRequest {
                token: "".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_password_requires_both_fields() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/reset_password",
            &ResetPasswordRequest {
                token: "sometoken".to_string(),
                new_password: "".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_password_rejects_short_password() {
        let (status, bytes) = post_json(
            auth_router(),
            "/api/auth/reset_password",
            &ResetPasswordRequest {
                token: "sometoken".to_string(),
                new_password: "abc".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_change_password_requires_auth() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/change_password",
            &ChangePasswordRequest {
                old_password: "old".to_string(),
                new_password: "newpassword".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_check_login_without_token_returns_unauthorized() {
        let req = Request::get("/api/auth/check_login")
            .body(Body::empty())
            .unwrap();
        let res = auth_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok123");
        assert!(cookie.starts_with("admin_token=tok123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        let cleared = clear_session_cookie();
        assert!(cleared.contains("Max-Age=0"));
    }
}
