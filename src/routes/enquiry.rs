/**
 * Enquiry Routes
 * Public contact-form intake with best-effort notification mails; admin
 * listing marks an enquiry opened on its first fetch by id
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Enquiry};
use crate::mail::{self, templates::Template};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_ENQUIRY_NOT_FOUND: &str = "Enquiry not found";
const MAX_MESSAGE: usize = 1000;

lazy_static::lazy_static! {
    /// Inbox that receives enquiry notifications
    static ref ADMIN_EMAIL: String = std::env::var("ADMIN_EMAIL")
        .or_else(|_| std::env::var("MAIL_USER"))
        .unwrap_or_default();
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnquiryRequest {
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: String,
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnquiryRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub message: Option<String>,
}

const ENQUIRY_COLUMNS: &str = "id, name, email, phone, company_name, message, is_opened, \
                               opened_at, created_at, updated_at";

/// POST /api/enquiry - Submit an enquiry (public)
/// The record is the transaction; both notification mails are best-effort.
pub async fn create_enquiry(Json(payload): Json<CreateEnquiryRequest>) -> Response {
    if payload.email.trim().is_empty() || payload.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email and message are required");
    }

    if !payload.email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    if payload.message.len() > MAX_MESSAGE {
        return error_response(StatusCode::BAD_REQUEST, "Message cannot exceed 1000 characters");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let enquiry = match sqlx::query_as::<_, Enquiry>(&format!(
        r#"
        INSERT INTO enquiries (name, email, phone, company_name, message)
        VALUES ($1, LOWER($2), $3, $4, $5)
        RETURNING {ENQUIRY_COLUMNS}
        "#
    ))
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.trim())
    .bind(payload.company_name.trim())
    .bind(payload.message.trim())
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(enquiry) => enquiry,
        Err(e) => {
            tracing::error!("Failed to create enquiry: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add enquiry", e);
        }
    };

    if !ADMIN_EMAIL.is_empty() {
        let display_name = if enquiry.name.is_empty() {
            "User".to_string()
        } else {
            enquiry.name.clone()
        };
        let outcome = mail::send(
            &ADMIN_EMAIL,
            &format!("New enquiry from {}", display_name),
            Template::EnquiryNotification {
                name: enquiry.name.clone(),
                email: enquiry.email.clone(),
                phone: enquiry.phone.clone(),
                company: enquiry.company_name.clone(),
                message: enquiry.message.clone(),
            },
        )
        .await;
        if !outcome.success {
            tracing::warn!("Enquiry notification mail failed for enquiry {}", enquiry.id);
        }
    }

    let ack = mail::send(
        &enquiry.email,
        "Thanks for contacting us!",
        Template::EnquiryAck {
            name: enquiry.name.clone(),
        },
    )
    .await;
    if !ack.success {
        tracing::warn!("Enquiry acknowledgement mail failed for {}", enquiry.email);
    }

    success_response(StatusCode::CREATED, "Enquiry submitted successfully", Some(enquiry))
}

/// GET /api/enquiry - List enquiries, newest first (auth required)
pub async fn list_enquiries(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Enquiry>(&format!(
        "SELECT {ENQUIRY_COLUMNS} FROM enquiries ORDER BY created_at DESC"
    ))
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(enquiries) => {
            success_response(StatusCode::OK, "Enquiries fetched successfully", Some(enquiries))
        }
        Err(e) => {
            tracing::error!("Failed to fetch enquiries: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch enquiries", e)
        }
    }
}

/// GET /api/enquiry/{id} - Fetch one enquiry (auth required)
/// The first fetch stamps opened_at and flips is_opened, exactly once.
pub async fn get_enquiry(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    // One conditional update covers both the first read and repeats; the
    // WHERE clause keeps opened_at frozen after the first stamp.
    if let Err(e) = sqlx::query(
        "UPDATE enquiries SET is_opened = true, opened_at = now(), updated_at = now()
         WHERE id = $1 AND is_opened = false",
    )
    .bind(id)
    .execute(pool.as_ref())
    .await
    {
        tracing::error!("Failed to mark enquiry opened: {}", e);
    }

    match sqlx::query_as::<_, Enquiry>(&format!(
        "SELECT {ENQUIRY_COLUMNS} FROM enquiries WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(enquiry)) => {
            success_response(StatusCode::OK, "Enquiries fetched successfully", Some(enquiry))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_ENQUIRY_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch enquiry: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch enquiries", e)
        }
    }
}

/// PUT /api/enquiry/{id} - Update an enquiry (auth required)
pub async fn update_enquiry(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEnquiryRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if let Some(message) = payload.message.as_deref() {
        if message.len() > MAX_MESSAGE {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Message cannot exceed 1000 characters",
            );
        }
    }

    if let Some(email) = payload.email.as_deref() {
        if !email.contains('@') {
            return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Enquiry>(&format!(
        r#"
        UPDATE enquiries
        SET name = COALESCE($1, name),
            email = COALESCE(LOWER($2), email),
            phone = COALESCE($3, phone),
            company_name = COALESCE($4, company_name),
            message = COALESCE($5, message),
            updated_at = now()
        WHERE id = $6
        RETURNING {ENQUIRY_COLUMNS}
        "#
    ))
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.company_name)
    .bind(&payload.message)
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(enquiry)) => {
            success_response(StatusCode::OK, "Enquiry updated successfully", Some(enquiry))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_ENQUIRY_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to update enquiry: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update enquiry", e)
        }
    }
}

/// DELETE /api/enquiry/{id} - Delete an enquiry (auth required)
pub async fn delete_enquiry(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Enquiry>(&format!(
        "DELETE FROM enquiries WHERE id = $1 RETURNING {ENQUIRY_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(enquiry)) => {
            success_response(StatusCode::OK, "Enquiry deleted successfully", Some(enquiry))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_ENQUIRY_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete enquiry: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete enquiry", e)
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

    fn enquiry_router() -> Router {
        Router::new()
            .route("/api/enquiry", post(create_enquiry).get(list_enquiries))
            .route("/api/enquiry/{id}", axum::routing::get(get_enquiry))
    }

    #[tokio::test]
    async fn test_create_enquiry_requires_email_and_message() {
        let body = serde_json::json!({ "email": "", "message": "" });
        let req = Request::post("/api/enquiry")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = enquiry_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_enquiry_rejects_long_message() {
        let body = serde_json::json!({
            "email": "sam@example.com",
            "message": "x".repeat(1100)
        });
        let req = Request::post("/api/enquiry")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = enquiry_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_enquiries_requires_auth() {
        let req = Request::get("/api/enquiry").body(Body::empty()).unwrap();
        let res = enquiry_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_enquiry_requires_auth() {
        let req = Request::get(format!("/api/enquiry/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let res = enquiry_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
