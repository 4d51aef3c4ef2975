/**
 * Newsletter Routes
 * Public signup with a welcome mail, admin listing with per-day stats and
 * bulk removal
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Subscriber};
use crate::mail::{self, templates::Template};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSubscribersRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberListData {
    pub total: i64,
    pub subscribers: Vec<Subscriber>,
    pub daily_stats: Vec<DailyStat>,
}

/// POST /api/newsletter - Subscribe an email address (public)
pub async fn add_subscriber(Json(payload): Json<SubscribeRequest>) -> Response {
    if payload.email.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Subscriber email is required");
    }

    if !payload.email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let email = payload.email.trim().to_lowercase();

    match sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM newsletter_subscribers WHERE email = $1)",
    )
    .bind(&email)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(true) => return error_response(StatusCode::CONFLICT, "Email already subscribed"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check subscriber: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to subscribe user",
                e,
            );
        }
    }

    let subscriber = match sqlx::query_as::<_, Subscriber>(
        r#"INSERT INTO newsletter_subscribers (email) VALUES ($1)
           RETURNING id, email, subscribed_at"#,
    )
    .bind(&email)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(subscriber) => subscriber,
        Err(e) => {
            if e.to_string().contains("unique") || e.to_string().contains("duplicate key") {
                return error_response(StatusCode::CONFLICT, "Email already subscribed");
            }
            tracing::error!("Failed to add subscriber: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to subscribe user",
                e,
            );
        }
    };

    let outcome = mail::send(
        &subscriber.email,
        "Welcome to the newsletter!",
        Template::NewsletterWelcome,
    )
    .await;
    if !outcome.success {
        tracing::warn!("Welcome mail delivery failed for {}", subscriber.email);
    }

    success_response(StatusCode::CREATED, "Subscribed successfully", Some(subscriber))
}

/// GET /api/newsletter - Subscriber list with totals and daily signup stats
/// (auth required)
pub async fn list_subscribers(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let subscribers = match sqlx::query_as::<_, Subscriber>(
        "SELECT id, email, subscribed_at FROM newsletter_subscribers ORDER BY subscribed_at DESC",
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(subscribers) => subscribers,
        Err(e) => {
            tracing::error!("Failed to fetch subscribers: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch subscribers",
                e,
            );
        }
    };

    let daily_stats = match sqlx::query_as::<_, (String, i64)>(
        r#"SELECT to_char(subscribed_at, 'YYYY-MM-DD') AS date, COUNT(*) AS count
           FROM newsletter_subscribers
           GROUP BY 1
           ORDER BY 1 DESC"#,
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(rows) => rows
            .into_iter()
            .map(|(date, count)| DailyStat { date, count })
            .collect(),
        Err(e) => {
            tracing::error!("Failed to fetch subscriber stats: {}", e);
            Vec::new()
        }
    };

    let data = SubscriberListData {
        total: subscribers.len() as i64,
        subscribers,
        daily_stats,
    };

    success_response(StatusCode::OK, "Subscribers fetched successfully", Some(data))
}

/// DELETE /api/newsletter - Remove one or many subscribers by id
/// (auth required)
pub async fn delete_subscribers(
    headers: HeaderMap,
    Json(payload): Json<DeleteSubscribersRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.ids.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No subscriber IDs provided");
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM newsletter_subscribers WHERE id = ANY($1)")
        .bind(&payload.ids)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) => {
            let deleted = result.rows_affected();
            if deleted == 0 {
                return error_response(StatusCode::NOT_FOUND, "No subscribers found to delete");
            }
            success_response::<()>(
                StatusCode::OK,
                &format!("{} subscriber(s) deleted successfully", deleted),
                None,
            )
        }
        Err(e) => {
            tracing::error!("Failed to delete subscribers: {}", e);
            error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete subscribers",
                e,
            )
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

    fn newsletter_router() -> Router {
        Router::new().route(
            "/api/newsletter",
            post(add_subscriber)
                .get(list_subscribers)
                .delete(delete_subscribers),
        )
    }

    fn bearer() -> String {
        let token = crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        format!("Bearer {}", token)
    }

    #[tokio::test]
    async fn test_subscribe_requires_email() {
        let body = serde_json::json!({ "email": "" });
        let req = Request::post("/api/newsletter")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = newsletter_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_invalid_email() {
        let body = serde_json::json!({ "email": "nope" });
        let req = Request::post("/api/newsletter")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = newsletter_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_subscribers_requires_ids() {
        let body = serde_json::json!({ "ids": [] });
        let req = Request::delete("/api/newsletter")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = newsletter_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_subscribers_requires_auth() {
        let req = Request::get("/api/newsletter").body(Body::empty()).unwrap();
        let res = newsletter_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
