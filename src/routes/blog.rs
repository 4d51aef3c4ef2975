/**
 * Blog Routes
 * CRUD API endpoints for blog posts (auth required)
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    self,
    models::{Blog, BlogSection},
};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MAX_SHORT_DESCRIPTION: usize = 250;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    pub name: String,
    pub image: String,
    pub short_description: String,
    #[serde(default)]
    pub sections: Vec<BlogSection>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub short_description: Option<String>,
    pub sections: Option<Vec<BlogSection>>,
    pub is_active: Option<bool>,
}

/// Section content may carry markup from the editor; strip anything unsafe.
fn sanitize_sections(sections: Vec<BlogSection>) -> Vec<BlogSection> {
    sections
        .into_iter()
        .map(|section| BlogSection {
            content: section.content.map(|c| ammonia::clean(&c)),
            ..section
        })
        .collect()
}

/// POST /api/blog - Create a blog post
pub async fn create_blog(headers: HeaderMap, Json(payload): Json<CreateBlogRequest>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.name.trim().is_empty()
        || payload.image.trim().is_empty()
        || payload.short_description.trim().is_empty()
    {
        return error_response(StatusCode::BAD_REQUEST, "All fields are required");
    }

    if payload.short_description.len() > MAX_SHORT_DESCRIPTION {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Short description cannot exceed 250 characters",
        );
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sections = match serde_json::to_value(sanitize_sections(payload.sections)) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to encode blog sections: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid blog sections");
        }
    };

    match sqlx::query_as::<_, Blog>(
        r#"
        INSERT INTO blogs (name, image, short_description, sections, is_active)
        VALUES ($1, $2, $3, $4, COALESCE($5, true))
        RETURNING id, name, image, short_description, sections, is_active, created_at, updated_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.image.trim())
    .bind(payload.short_description.trim())
    .bind(&sections)
    .bind(payload.is_active)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(blog) => success_response(StatusCode::CREATED, "Blog added successfully.", Some(blog)),
        Err(e) => {
            tracing::error!("Failed to create blog: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add blog.", e)
        }
    }
}

/// GET /api/blog - List blog posts, newest first
pub async fn list_blogs(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Blog>(
        r#"SELECT id, name, image, short_description, sections, is_active, created_at, updated_at
           FROM blogs ORDER BY created_at DESC"#,
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(blogs) => success_response(StatusCode::OK, "Blogs fetched successfully.", Some(blogs)),
        Err(e) => {
            tracing::error!("Failed to fetch blogs: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch blogs.", e)
        }
    }
}

/// PUT /api/blog/{id} - Update a blog post
pub async fn update_blog(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if let Some(short_description) = payload.short_description.as_deref() {
        if short_description.len() > MAX_SHORT_DESCRIPTION {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Short description cannot exceed 250 characters",
            );
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sections = match payload.sections {
        Some(sections) => match serde_json::to_value(sanitize_sections(sections)) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Failed to encode blog sections: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Invalid blog sections");
            }
        },
        None => None,
    };

    match sqlx::query_as::<_, Blog>(
        r#"
        UPDATE blogs
        SET name = COALESCE($1, name),
            image = COALESCE($2, image),
            short_description = COALESCE($3, short_description),
            sections = COALESCE($4, sections),
            is_active = COALESCE($5, is_active),
            updated_at = now()
        WHERE id = $6
        RETURNING id, name, image, short_description, sections, is_active, created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.short_description)
    .bind(&sections)
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(blog)) => success_response(StatusCode::OK, "Blog updated successfully.", Some(blog)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Blog not found"),
        Err(e) => {
            tracing::error!("Failed to update blog: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update blog.", e)
        }
    }
}

/// DELETE /api/blog/{id} - Delete a blog post
pub async fn delete_blog(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM blogs WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) => {
            if result.rows_affected() == 0 {
                return error_response(StatusCode::NOT_FOUND, "Blog not found");
            }
            success_response::<()>(StatusCode::OK, "Blog deleted successfully.", None)
        }
        Err(e) => {
            tracing::error!("Failed to delete blog: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete blog.", e)
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

    fn blog_router() -> Router {
        Router::new()
            .route("/api/blog", post(create_blog).get(list_blogs))
            .route(
                "/api/blog/{id}",
                axum::routing::put(update_blog).delete(delete_blog),
            )
    }

    fn bearer() -> String {
        let token = crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        format!("Bearer {}", token)
    }

    #[tokio::test]
    async fn test_create_blog_requires_auth() {
        let body = serde_json::json!({
            "name": "Post",
            "image": "https://cdn/x.jpg",
            "shortDescription": "short"
        });
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = blog_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_blog_rejects_long_short_description() {
        let body = serde_json::json!({
            "name": "Post",
            "image": "https://cdn/x.jpg",
            "shortDescription": "x".repeat(300)
        });
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = blog_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_sanitize_sections_strips_scripts() {
        let sections = sanitize_sections(vec![BlogSection {
            heading: Some("Intro".to_string()),
            content: Some("<p>hello</p><script>alert(1)</script>".to_string()),
            image: None,
        }]);
        let content = sections[0].content.as_deref().unwrap();
        assert!(content.contains("<p>hello</p>"));
        assert!(!content.contains("script"));
    }
}
