/**
 * Admin Routes
 * CRUD for admin accounts; deletion notifies the removed account by mail
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use bcrypt::{hash, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Admin};
use crate::mail::{self, templates::Template};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const VALID_ROLES: &[&str] = &["admin", "superadmin"];

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub img: Option<String>,
}

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

/// POST /api/admin - Create an admin account
pub async fn create_admin(Json(payload): Json<CreateAdminRequest>) -> Response {
    if payload.email.trim().is_empty()
        || payload.password.trim().is_empty()
        || payload.name.trim().is_empty()
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Email, name, and password are required.",
        );
    }

    if !payload.email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    if payload.password.len() < 6 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters long",
        );
    }

    let role = payload.role.unwrap_or_else(|| "admin".to_string());
    if !VALID_ROLES.contains(&role.as_str()) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid role");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    // Duplicate email is a conflict, reported before the expensive hash.
    match sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM admins WHERE LOWER(email) = LOWER($1))",
    )
    .bind(&payload.email)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(true) => {
            return error_response(
                StatusCode::CONFLICT,
                "An account with this email address already exists.",
            );
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check existing admins: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Admin could not be added.",
                e,
            );
        }
    }

    let password_hash = match hash_password(payload.password).await {
        Ok(h) => h,
        Err(()) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process password")
        }
    };

    match sqlx::query_as::<_, Admin>(
        r#"
        INSERT INTO admins (name, email, phone, img, password_hash, role)
        VALUES ($1, LOWER($2), $3, $4, $5, $6)
        RETURNING id, name, email, phone, img, password_hash, role, created_at, updated_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(payload.phone.unwrap_or_default())
    .bind(&payload.img)
    .bind(&password_hash)
    .bind(&role)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(admin) => {
            tracing::info!("Admin account created: {}", admin.email);
            success_response(StatusCode::CREATED, "Admin successfully added.", Some(admin))
        }
        Err(e) => {
            if e.to_string().contains("unique") || e.to_string().contains("duplicate key") {
                return error_response(
                    StatusCode::CONFLICT,
                    "An account with this email address already exists.",
                );
            }
            tracing::error!("Failed to create admin: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Admin could not be added.", e)
        }
    }
}

/// GET /api/admin/{id} - Fetch one admin (auth required)
pub async fn get_admin(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Admin>(
        r#"SELECT id, name, email, phone, img, password_hash, role, created_at, updated_at
           FROM admins WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(admin)) => {
            success_response(StatusCode::OK, "Admin retrieved successfully.", Some(admin))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Admin not found."),
        Err(e) => {
            tracing::error!("Database error fetching admin: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve admin.", e)
        }
    }
}

/// PUT /api/admin/{id} - Update an admin (auth required)
pub async fn update_admin(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdminRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if let Some(role) = payload.role.as_deref() {
        if !VALID_ROLES.contains(&role) {
            return error_response(StatusCode::BAD_REQUEST, "Invalid role");
        }
    }

    if let Some(email) = payload.email.as_deref() {
        if !email.contains('@') {
            return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
        }
    }

    if let Some(password) = payload.password.as_deref() {
        if password.len() < 6 {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Password must be at least 6 characters long",
            );
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match sqlx::query_as::<_, Admin>(
        r#"SELECT id, name, email, phone, img, password_hash, role, created_at, updated_at
           FROM admins WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(admin)) => admin,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Admin not found."),
        Err(e) => {
            tracing::error!("Database error fetching admin: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Admin update failed.", e);
        }
    };

    let password_hash = match payload.password {
        Some(password) => match hash_password(password).await {
            Ok(h) => h,
            Err(()) => {
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process password",
                )
            }
        },
        None => existing.password_hash.clone(),
    };

    let name = payload.name.unwrap_or(existing.name);
    let email = payload.email.map(|e| e.to_lowercase()).unwrap_or(existing.email);
    let phone = payload.phone.unwrap_or(existing.phone);
    let img = payload.img.or(existing.img);
    let role = payload.role.unwrap_or(existing.role);

    match sqlx::query_as::<_, Admin>(
        r#"
        UPDATE admins
        SET name = $1, email = $2, phone = $3, img = $4, password_hash = $5, role = $6,
            updated_at = now()
        WHERE id = $7
        RETURNING id, name, email, phone, img, password_hash, role, created_at, updated_at
        "#,
    )
    .bind(&name)
    .bind(&email)
    .bind(&phone)
    .bind(&img)
    .bind(&password_hash)
    .bind(&role)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(admin) => success_response(StatusCode::OK, "Admin updated successfully.", Some(admin)),
        Err(e) => {
            if e.to_string().contains("unique") || e.to_string().contains("duplicate key") {
                return error_response(
                    StatusCode::CONFLICT,
                    "An account with this email address already exists.",
                );
            }
            tracing::error!("Failed to update admin: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Admin update failed.", e)
        }
    }
}

/// DELETE /api/admin/{id} - Remove an admin (auth required)
/// A missing record is a plain 404 and sends nothing; on success the removed
/// account gets a best-effort notification mail.
pub async fn delete_admin(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let deleted = match sqlx::query_as::<_, Admin>(
        r#"DELETE FROM admins WHERE id = $1
           RETURNING id, name, email, phone, img, password_hash, role, created_at, updated_at"#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(admin)) => admin,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Admin not found."),
        Err(e) => {
            tracing::error!("Failed to delete admin: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Admin deletion failed.",
                e,
            );
        }
    };

    tracing::info!("Admin account deleted: {}", deleted.email);

    let outcome = mail::send(
        &deleted.email,
        "Your admin account was removed",
        Template::AccountRemoved {
            name: deleted.name.clone(),
        },
    )
    .await;
    if !outcome.success {
        tracing::warn!("Account-removed email delivery failed for {}", deleted.email);
    }

    success_response::<()>(StatusCode::OK, "Admin deleted successfully.", None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn admin_router() -> Router {
        Router::new()
            .route("/api/admin", post(create_admin))
            .route(
                "/api/admin/{id}",
                get(get_admin).put(update_admin).delete(delete_admin),
            )
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

    #[tokio::test]
    async fn test_create_admin_requires_fields() {
        let (status, _) = post_json(
            admin_router(),
            "/api/admin",
            &CreateAdminRequest {
                name: "".to_string(),
                email: "a@b.c".to_string(),
                password: "secret123".to_string(),
                phone: None,
                role: None,
                img: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_admin_rejects_unknown_role() {
        let (status, _) = post_json(
            admin_router(),
            "/api/admin",
            &CreateAdminRequest {
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                password: "secret123".to_string(),
                phone: None,
                role: Some("owner".to_string()),
                img: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_admin_requires_auth() {
        let req = Request::get(format!("/api/admin/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let res = admin_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_admin_requires_auth() {
        let req = Request::delete(format!("/api/admin/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let res = admin_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
