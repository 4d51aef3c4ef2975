/**
 * Dashboard Routes
 * Aggregated collection counts for the admin overview
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::db;
use crate::routes::{db_unavailable, error_response_with, require_auth, success_response};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCounts {
    pub verified: i64,
    pub unverified: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryCounts {
    pub opened: i64,
    pub unopened: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub banners: i64,
    pub blogs: i64,
    pub clients: i64,
    pub works: i64,
    pub projects: i64,
    pub reviews: ReviewCounts,
    pub enquiries: EnquiryCounts,
    pub subscribers: i64,
}

async fn count_table(pool: &PgPool, table: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
}

async fn count_where(pool: &PgPool, table: &str, predicate: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE {}", table, predicate))
        .fetch_one(pool)
        .await
}

/// GET /api/dashboard - Collection totals plus review/enquiry splits
/// (auth required)
pub async fn get_stats(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };
    let pool = pool.as_ref();

    let counts = tokio::try_join!(
        count_table(pool, "banners"),
        count_table(pool, "blogs"),
        count_table(pool, "clients"),
        count_table(pool, "works"),
        count_table(pool, "projects"),
        count_where(pool, "reviews", "is_verified = true"),
        count_where(pool, "reviews", "is_verified = false"),
        count_where(pool, "enquiries", "is_opened = true"),
        count_where(pool, "enquiries", "is_opened = false"),
        count_table(pool, "newsletter_subscribers"),
    );

    let (
        banners,
        blogs,
        clients,
        works,
        projects,
        verified,
        unverified,
        opened,
        unopened,
        subscribers,
    ) = match counts {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to gather dashboard stats: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch dashboard stats",
                e,
            );
        }
    };

    let stats = DashboardStats {
        banners,
        blogs,
        clients,
        works,
        projects,
        reviews: ReviewCounts {
            verified,
            unverified,
            total: verified + unverified,
        },
        enquiries: EnquiryCounts {
            opened,
            unopened,
            total: opened + unopened,
        },
        subscribers,
    };

    success_response(StatusCode::OK, "Dashboard data fetched successfully", Some(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn dashboard_router() -> Router {
        Router::new().route("/api/dashboard", get(get_stats))
    }

    #[tokio::test]
    async fn test_dashboard_requires_auth() {
        let req = Request::get("/api/dashboard").body(Body::empty()).unwrap();
        let res = dashboard_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_stats_serialization_shape() {
        let stats = DashboardStats {
            banners: 1,
            blogs: 2,
            clients: 3,
            works: 4,
            projects: 5,
            reviews: ReviewCounts {
                verified: 1,
                unverified: 2,
                total: 3,
            },
            enquiries: EnquiryCounts {
                opened: 0,
                unopened: 4,
                total: 4,
            },
            subscribers: 9,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["reviews"]["total"], 3);
        assert_eq!(json["enquiries"]["unopened"], 4);
        assert_eq!(json["subscribers"], 9);
    }
}
