/**
 * Voucher Routes
 * CRUD for promotional vouchers; creating one fans the voucher template out
 * to the whole subscriber list in paced batches
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Voucher};
use crate::mail::{self, templates::Template};
use crate::routes::auth::FRONTEND_URL;
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_VOUCHER_NOT_FOUND: &str = "Voucher not found";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVoucherRequest {
    pub title: String,
    #[serde(default)]
    pub img: Vec<String>,
    #[serde(default)]
    pub heading: Vec<String>,
    pub msg: Vec<String>,
}

/// Query-string encode an email for the unsubscribe link.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

const VOUCHER_COLUMNS: &str = "id, title, img, heading, msg, created_at, updated_at";

/// POST /api/voucher - Create a voucher and broadcast it (auth required)
/// The voucher row is the transaction; the fan-out is best-effort and its
/// failures are only logged.
pub async fn create_voucher(
    headers: HeaderMap,
    Json(payload): Json<CreateVoucherRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.title.trim().is_empty() || payload.msg.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Title and message are required.");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let voucher = match sqlx::query_as::<_, Voucher>(&format!(
        r#"
        INSERT INTO vouchers (title, img, heading, msg)
        VALUES ($1, $2, $3, $4)
        RETURNING {VOUCHER_COLUMNS}
        "#
    ))
    .bind(payload.title.trim())
    .bind(&payload.img)
    .bind(&payload.heading)
    .bind(&payload.msg)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(voucher) => voucher,
        Err(e) => {
            tracing::error!("Failed to create voucher: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add voucher", e);
        }
    };

    let recipients = match sqlx::query_scalar::<_, String>(
        "SELECT email FROM newsletter_subscribers ORDER BY subscribed_at",
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(emails) => emails,
        Err(e) => {
            tracing::error!("Failed to load subscriber list: {}", e);
            Vec::new()
        }
    };

    if recipients.is_empty() {
        tracing::warn!("No subscribers found. Voucher saved but no emails sent.");
        return success_response(
            StatusCode::CREATED,
            "Voucher added (no subscribers found)",
            Some(voucher),
        );
    }

    let subject = format!("{} - {} update", voucher.title, mail::templates::SITE_NAME);
    let title = voucher.title.clone();
    let heading = voucher.heading.first().cloned().unwrap_or_default();
    let message = voucher.msg.first().cloned().unwrap_or_default();
    let images = voucher.img.clone();
    let website_url = FRONTEND_URL.clone();

    let report = mail::send_bulk(
        &recipients,
        mail::BULK_BATCH_SIZE,
        mail::BULK_BATCH_DELAY,
        |to| {
            let subject = subject.clone();
            let template = Template::Voucher {
                title: title.clone(),
                heading: heading.clone(),
                message: message.clone(),
                images: images.clone(),
                website_url: website_url.clone(),
                unsubscribe_url: format!(
                    "{}/unsubscribe?email={}",
                    website_url,
                    encode_query_value(&to)
                ),
            };
            async move { mail::send(&to, &subject, template).await }
        },
    )
    .await;

    tracing::info!(
        "Voucher broadcast finished: {} of {} delivered in {} batches",
        report.delivered,
        report.attempted,
        report.batches
    );

    success_response(
        StatusCode::CREATED,
        "Voucher added and emails sent successfully",
        Some(voucher),
    )
}

/// GET /api/voucher - List vouchers, newest first (auth required)
pub async fn list_vouchers(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Voucher>(&format!(
        "SELECT {VOUCHER_COLUMNS} FROM vouchers ORDER BY created_at DESC"
    ))
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(vouchers) => {
            success_response(StatusCode::OK, "Voucher list fetched successfully", Some(vouchers))
        }
        Err(e) => {
            tracing::error!("Failed to fetch vouchers: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch vouchers", e)
        }
    }
}

/// GET /api/voucher/{id} - Fetch one voucher (auth required)
pub async fn get_voucher(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Voucher>(&format!(
        "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(voucher)) => {
            success_response(StatusCode::OK, "Voucher fetched successfully", Some(voucher))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_VOUCHER_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch voucher: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch voucher", e)
        }
    }
}

/// DELETE /api/voucher/{id} - Delete a voucher (auth required)
pub async fn delete_voucher(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM vouchers WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) => {
            if result.rows_affected() == 0 {
                return error_response(StatusCode::NOT_FOUND, MSG_VOUCHER_NOT_FOUND);
            }
            success_response::<()>(StatusCode::OK, "Voucher deleted successfully", None)
        }
        Err(e) => {
            tracing::error!("Failed to delete voucher: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete voucher", e)
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

    fn voucher_router() -> Router {
        Router::new().route("/api/voucher", post(create_voucher).get(list_vouchers))
    }

    fn bearer() -> String {
        let token = crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn test_query_value_encoding() {
        assert_eq!(encode_query_value("user@example.com"), "user%40example.com");
        assert_eq!(encode_query_value("plain"), "plain");
    }

    #[tokio::test]
    async fn test_create_voucher_requires_auth() {
        let body = serde_json::json!({ "title": "Offer", "msg": ["Hello"] });
        let req = Request::post("/api/voucher")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = voucher_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_voucher_requires_title_and_message() {
        let body = serde_json::json!({ "title": "  ", "msg": [] });
        let req = Request::post("/api/voucher")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = voucher_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
