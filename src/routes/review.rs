/**
 * Review Routes
 * CRUD for customer reviews. is_verified is recomputed from the clients
 * table on every save and is not assignable from request bodies.
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, models::Review};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_REVIEW_NOT_FOUND: &str = "Review not found";
const MAX_COMMENT: usize = 500;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Note: no is_verified field; a caller cannot set it.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub company_name: Option<String>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub verified: Option<bool>,
}

/// A review is verified when its email appears in some client's email list
/// or its company matches some client's company list. Companies are stored
/// lowercase, so the comparison is case-insensitive.
async fn derive_verified(
    pool: &PgPool,
    user_email: &str,
    company_name: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let email = user_email.to_lowercase();
    let company = company_name.map(|c| c.to_lowercase()).unwrap_or_default();
    sqlx::query_scalar(
        r#"SELECT EXISTS(
               SELECT 1 FROM clients
               WHERE $1 = ANY(emails) OR ($2 <> '' AND $2 = ANY(companies))
           )"#,
    )
    .bind(&email)
    .bind(&company)
    .fetch_one(pool)
    .await
}

const REVIEW_COLUMNS: &str =
    "id, user_name, user_email, company_name, rating, comment, is_verified, created_at, updated_at";

/// POST /api/review - Submit a review (public)
pub async fn create_review(Json(payload): Json<CreateReviewRequest>) -> Response {
    if payload.user_name.trim().is_empty() || payload.user_email.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Name and email are required");
    }

    if !payload.user_email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    if !(1..=5).contains(&payload.rating) {
        return error_response(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5");
    }

    if payload.comment.as_deref().map(str::len).unwrap_or(0) > MAX_COMMENT {
        return error_response(StatusCode::BAD_REQUEST, "Comment cannot exceed 500 characters");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let user_email = payload.user_email.trim().to_lowercase();
    let company_name = payload
        .company_name
        .as_deref()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    let is_verified = match derive_verified(pool.as_ref(), &user_email, company_name.as_deref())
        .await
    {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to derive review verification: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add review", e);
        }
    };

    match sqlx::query_as::<_, Review>(&format!(
        r#"
        INSERT INTO reviews (user_name, user_email, company_name, rating, comment, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(payload.user_name.trim())
    .bind(&user_email)
    .bind(&company_name)
    .bind(payload.rating)
    .bind(payload.comment.as_deref().map(str::trim))
    .bind(is_verified)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(review) => {
            success_response(StatusCode::CREATED, "Review added successfully", Some(review))
        }
        Err(e) => {
            tracing::error!("Failed to create review: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add review", e)
        }
    }
}

/// GET /api/review?verified=true|false - List reviews, newest first (public)
pub async fn list_reviews(Query(query): Query<ReviewListQuery>) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let result = match query.verified {
        Some(verified) => {
            sqlx::query_as::<_, Review>(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews WHERE is_verified = $1 ORDER BY created_at DESC"
            ))
            .bind(verified)
            .fetch_all(pool.as_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, Review>(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC"
            ))
            .fetch_all(pool.as_ref())
            .await
        }
    };

    match result {
        Ok(reviews) => {
            success_response(StatusCode::OK, "Reviews fetched successfully", Some(reviews))
        }
        Err(e) => {
            tracing::error!("Failed to fetch reviews: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch reviews", e)
        }
    }
}

/// PUT /api/review/{id} - Update a review (auth required)
/// An edit that changes user_email or company_name can flip is_verified;
/// that is the derivation working as intended.
pub async fn update_review(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if let Some(rating) = payload.rating {
        if !(1..=5).contains(&rating) {
            return error_response(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5");
        }
    }

    if payload.comment.as_deref().map(str::len).unwrap_or(0) > MAX_COMMENT {
        return error_response(StatusCode::BAD_REQUEST, "Comment cannot exceed 500 characters");
    }

    if let Some(email) = payload.user_email.as_deref() {
        if !email.contains('@') {
            return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(review)) => review,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, MSG_REVIEW_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch review: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update review",
                e,
            );
        }
    };

    let user_name = payload.user_name.unwrap_or(existing.user_name);
    let user_email = payload
        .user_email
        .map(|e| e.trim().to_lowercase())
        .unwrap_or(existing.user_email);
    let company_name = payload
        .company_name
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .or(existing.company_name);
    let rating = payload.rating.unwrap_or(existing.rating);
    let comment = payload.comment.or(existing.comment);

    let is_verified = match derive_verified(pool.as_ref(), &user_email, company_name.as_deref())
        .await
    {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to derive review verification: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update review",
                e,
            );
        }
    };

    match sqlx::query_as::<_, Review>(&format!(
        r#"
        UPDATE reviews
        SET user_name = $1, user_email = $2, company_name = $3, rating = $4,
            comment = $5, is_verified = $6, updated_at = now()
        WHERE id = $7
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(&user_name)
    .bind(&user_email)
    .bind(&company_name)
    .bind(rating)
    .bind(&comment)
    .bind(is_verified)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(review) => success_response(StatusCode::OK, "Review updated successfully", Some(review)),
        Err(e) => {
            tracing::error!("Failed to update review: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update review", e)
        }
    }
}

/// DELETE /api/review/{id} - Delete a review (auth required)
pub async fn delete_review(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) => {
            if result.rows_affected() == 0 {
                return error_response(StatusCode::NOT_FOUND, MSG_REVIEW_NOT_FOUND);
            }
            success_response::<()>(StatusCode::OK, "Review deleted successfully", None)
        }
        Err(e) => {
            tracing::error!("Failed to delete review: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete review", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn review_router() -> Router {
        Router::new()
            .route("/api/review", post(create_review).get(list_reviews))
            .route(
                "/api/review/{id}",
                axum::routing::put(update_review).delete(delete_review),
            )
    }

    #[tokio::test]
    async fn test_create_review_rejects_out_of_range_rating() {
        let body = serde_json::json!({
            "userName": "Sam",
            "userEmail": "sam@example.com",
            "rating": 6
        });
        let req = Request::post("/api/review")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = review_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_review_rejects_long_comment() {
        let body = serde_json::json!({
            "userName": "Sam",
            "userEmail": "sam@example.com",
            "rating": 4,
            "comment": "x".repeat(600)
        });
        let req = Request::post("/api/review")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = review_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_review_requires_auth() {
        let body = serde_json::json!({ "rating": 3 });
        let req = Request::put(format!("/api/review/{}", Uuid::new_v4()))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = review_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_update_request_has_no_verified_field() {
        // A caller trying to force isVerified gets it silently dropped.
        let parsed: UpdateReviewRequest =
            serde_json::from_str(r#"{"rating": 4, "isVerified": true}"#).unwrap();
        assert_eq!(parsed.rating, Some(4));
        let back = serde_json::to_value(&parsed).unwrap();
        assert!(back.get("isVerified").is_none());
    }
}
