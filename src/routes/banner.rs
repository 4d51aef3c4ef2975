/**
 * Banner Routes
 * CRUD for homepage banners with app-enforced position uniqueness
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Banner};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_POSITION_EXISTS: &str = "A banner already occupies this position";
const MSG_BANNER_NOT_FOUND: &str = "Banner not found";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBannerRequest {
    pub name: String,
    pub description: String,
    pub img: String,
    pub position: i32,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBannerRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub img: Option<String>,
    pub position: Option<i32>,
    pub time: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// POST /api/banner - Create a banner (auth required)
pub async fn create_banner(
    headers: HeaderMap,
    Json(payload): Json<CreateBannerRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.name.trim().is_empty()
        || payload.description.trim().is_empty()
        || payload.img.trim().is_empty()
    {
        return error_response(StatusCode::BAD_REQUEST, "All fields are required");
    }

    if payload.position < 1 {
        return error_response(StatusCode::BAD_REQUEST, "Position must be at least 1");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    // Reject a taken position before inserting.
    match sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM banners WHERE position = $1)")
        .bind(payload.position)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(true) => return error_response(StatusCode::CONFLICT, MSG_POSITION_EXISTS),
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check banner position: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add banner", e);
        }
    }

    match sqlx::query_as::<_, Banner>(
        r#"
        INSERT INTO banners (name, description, img, position, time, is_active)
        VALUES ($1, $2, $3, $4, COALESCE($5, now()), COALESCE($6, true))
        RETURNING id, name, description, img, position, time, is_active, created_at, updated_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.description.trim())
    .bind(payload.img.trim())
    .bind(payload.position)
    .bind(payload.time)
    .bind(payload.is_active)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(banner) => {
            success_response(StatusCode::CREATED, "Banner added successfully", Some(banner))
        }
        Err(e) => {
            // The unique index is the last line of defense against a
            // concurrent insert racing the existence check.
            if e.to_string().contains("unique") || e.to_string().contains("duplicate key") {
                return error_response(StatusCode::CONFLICT, MSG_POSITION_EXISTS);
            }
            tracing::error!("Failed to create banner: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add banner", e)
        }
    }
}

/// GET /api/banner - List banners ordered by position (public)
pub async fn list_banners() -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Banner>(
        r#"SELECT id, name, description, img, position, time, is_active, created_at, updated_at
           FROM banners ORDER BY position ASC"#,
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(banners) => {
            success_response(StatusCode::OK, "Banners fetched successfully", Some(banners))
        }
        Err(e) => {
            tracing::error!("Failed to fetch banners: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch banners", e)
        }
    }
}

/// GET /api/banner/{id} - Fetch one banner (auth required)
pub async fn get_banner(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Banner>(
        r#"SELECT id, name, description, img, position, time, is_active, created_at, updated_at
           FROM banners WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(banner)) => {
            success_response(StatusCode::OK, "Banner fetched successfully", Some(banner))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_BANNER_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch banner: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch banner", e)
        }
    }
}

/// PUT /api/banner/{id} - Update a banner (auth required)
/// Moving to a position held by a different banner is a conflict; keeping
/// the current position is fine.
pub async fn update_banner(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBannerRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if let Some(position) = payload.position {
        if position < 1 {
            return error_response(StatusCode::BAD_REQUEST, "Position must be at least 1");
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    if let Some(position) = payload.position {
        match sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM banners WHERE position = $1 AND id <> $2)",
        )
        .bind(position)
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
        {
            Ok(true) => return error_response(StatusCode::CONFLICT, MSG_POSITION_EXISTS),
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Failed to check banner position: {}", e);
                return error_response_with(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update banner",
                    e,
                );
            }
        }
    }

    match sqlx::query_as::<_, Banner>(
        r#"
        UPDATE banners
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            img = COALESCE($3, img),
            position = COALESCE($4, position),
            time = COALESCE($5, time),
            is_active = COALESCE($6, is_active),
            updated_at = now()
        WHERE id = $7
        RETURNING id, name, description, img, position, time, is_active, created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.img)
    .bind(payload.position)
    .bind(payload.time)
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(banner)) => {
            success_response(StatusCode::OK, "Banner updated successfully", Some(banner))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_BANNER_NOT_FOUND),
        Err(e) => {
            if e.to_string().contains("unique") || e.to_string().contains("duplicate key") {
                return error_response(StatusCode::CONFLICT, MSG_POSITION_EXISTS);
            }
            tracing::error!("Failed to update banner: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update banner", e)
        }
    }
}

/// DELETE /api/banner/{id} - Delete a banner (auth required)
pub async fn delete_banner(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Banner>(
        r#"DELETE FROM banners WHERE id = $1
           RETURNING id, name, description, img, position, time, is_active, created_at, updated_at"#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(banner)) => {
            success_response(StatusCode::OK, "Banner deleted successfully", Some(banner))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_BANNER_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete banner: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete banner", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn banner_router() -> Router {
        Router::new()
            .route("/api/banner", post(create_banner).get(list_banners))
            .route(
                "/api/banner/{id}",
                get(get_banner).put(update_banner).delete(delete_banner),
            )
    }

    #[tokio::test]
    async fn test_create_banner_requires_auth() {
        let body = serde_json::json!({
            "name": "Hero",
            "description": "Main hero banner",
            "img": "https://cdn/banner.jpg",
            "position": 1
        });
        let req = Request::post("/api/banner")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = banner_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_banner_rejects_zero_position() {
        let token =
            crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        let body = serde_json::json!({
            "name": "Hero",
            "description": "Main hero banner",
            "img": "https://cdn/banner.jpg",
            "position": 0
        });
        let req = Request::post("/api/banner")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = banner_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_banners_without_db_returns_unavailable() {
        let req = Request::get("/api/banner").body(Body::empty()).unwrap();
        let res = banner_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
