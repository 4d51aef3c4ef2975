/**
 * Work Routes
 * CRUD for case-study work items; a work may exist unlinked or reference
 * one project
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    self,
    models::{Work, WorkInfo},
};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_INVALID_PROJECT: &str = "Invalid project reference";
const MSG_WORK_NOT_FOUND: &str = "Work not found";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkRequest {
    pub title: String,
    pub info: Vec<WorkInfo>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkRequest {
    pub title: Option<String>,
    pub info: Option<Vec<WorkInfo>>,
    pub project_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

fn validate_info(info: &[WorkInfo]) -> Result<(), &'static str> {
    if info.is_empty() {
        return Err("All fields are required");
    }
    for block in info {
        if block.heading.trim().is_empty()
            || block.details.trim().is_empty()
            || block.image.trim().is_empty()
        {
            return Err("Work info entries need heading, details and image");
        }
    }
    Ok(())
}

async fn project_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

const WORK_COLUMNS: &str = "id, title, info, project_id, is_active, created_at, updated_at";

/// POST /api/work - Create a work item (auth required)
pub async fn create_work(headers: HeaderMap, Json(payload): Json<CreateWorkRequest>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.title.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "All fields are required");
    }

    if let Err(msg) = validate_info(&payload.info) {
        return error_response(StatusCode::BAD_REQUEST, msg);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    if let Some(project_id) = payload.project_id {
        match project_exists(pool.as_ref(), project_id).await {
            Ok(true) => {}
            Ok(false) => return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_PROJECT),
            Err(e) => {
                tracing::error!("Failed to validate project reference: {}", e);
                return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add work", e);
            }
        }
    }

    let info = match serde_json::to_value(&payload.info) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to encode work info: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid work info");
        }
    };

    match sqlx::query_as::<_, Work>(&format!(
        r#"
        INSERT INTO works (title, info, project_id, is_active)
        VALUES ($1, $2, $3, COALESCE($4, true))
        RETURNING {WORK_COLUMNS}
        "#
    ))
    .bind(payload.title.trim())
    .bind(&info)
    .bind(payload.project_id)
    .bind(payload.is_active)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(work) => success_response(StatusCode::CREATED, "Work added successfully", Some(work)),
        Err(e) => {
            tracing::error!("Failed to create work: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add work", e)
        }
    }
}

/// GET /api/work - List works, newest first (public)
pub async fn list_works() -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Work>(&format!(
        "SELECT {WORK_COLUMNS} FROM works ORDER BY created_at DESC"
    ))
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(works) => success_response(StatusCode::OK, "Works fetched successfully", Some(works)),
        Err(e) => {
            tracing::error!("Failed to fetch works: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch works", e)
        }
    }
}

/// GET /api/work/{id} - Fetch one work item (public)
pub async fn get_work(Path(id): Path<Uuid>) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Work>(&format!("SELECT {WORK_COLUMNS} FROM works WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool.as_ref())
        .await
    {
        Ok(Some(work)) => success_response(StatusCode::OK, "Work fetched successfully", Some(work)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_WORK_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch work: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch work", e)
        }
    }
}

/// PUT /api/work/{id} - Update a work item (auth required)
pub async fn update_work(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWorkRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if let Some(info) = payload.info.as_deref() {
        if let Err(msg) = validate_info(info) {
            return error_response(StatusCode::BAD_REQUEST, msg);
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    if let Some(project_id) = payload.project_id {
        match project_exists(pool.as_ref(), project_id).await {
            Ok(true) => {}
            Ok(false) => return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_PROJECT),
            Err(e) => {
                tracing::error!("Failed to validate project reference: {}", e);
                return error_response_with(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update work",
                    e,
                );
            }
        }
    }

    let info = match payload.info {
        Some(info) => match serde_json::to_value(&info) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Failed to encode work info: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Invalid work info");
            }
        },
        None => None,
    };

    match sqlx::query_as::<_, Work>(&format!(
        r#"
        UPDATE works
        SET title = COALESCE($1, title),
            info = COALESCE($2, info),
            project_id = COALESCE($3, project_id),
            is_active = COALESCE($4, is_active),
            updated_at = now()
        WHERE id = $5
        RETURNING {WORK_COLUMNS}
        "#
    ))
    .bind(&payload.title)
    .bind(&info)
    .bind(payload.project_id)
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(work)) => success_response(StatusCode::OK, "Work updated successfully", Some(work)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_WORK_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to update work: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update work", e)
        }
    }
}

/// DELETE /api/work/{id} - Delete a work item (auth required)
/// Projects listing the work drop the reference.
pub async fn delete_work(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM works WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) => {
            if result.rows_affected() == 0 {
                return error_response(StatusCode::NOT_FOUND, MSG_WORK_NOT_FOUND);
            }
            if let Err(e) =
                sqlx::query("UPDATE projects SET work_ids = array_remove(work_ids, $1) WHERE $1 = ANY(work_ids)")
                    .bind(id)
                    .execute(pool.as_ref())
                    .await
            {
                tracing::error!("Failed to drop work reference from projects: {}", e);
            }
            success_response::<()>(StatusCode::OK, "Work deleted successfully", None)
        }
        Err(e) => {
            tracing::error!("Failed to delete work: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete work", e)
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

    fn work_router() -> Router {
        Router::new().route("/api/work", post(create_work).get(list_works))
    }

    fn bearer() -> String {
        let token = crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn test_info_validation_requires_complete_entries() {
        assert!(validate_info(&[]).is_err());
        assert!(validate_info(&[WorkInfo {
            heading: "H".to_string(),
            details: "".to_string(),
            image: "i.jpg".to_string(),
        }])
        .is_err());
        assert!(validate_info(&[WorkInfo {
            heading: "H".to_string(),
            details: "D".to_string(),
            image: "i.jpg".to_string(),
        }])
        .is_ok());
    }

    #[tokio::test]
    async fn test_create_work_requires_auth() {
        let body = serde_json::json!({
            "title": "Rebrand",
            "info": [{"heading": "H", "details": "D", "image": "i.jpg"}]
        });
        let req = Request::post("/api/work")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = work_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_work_rejects_empty_info() {
        let body = serde_json::json!({
            "title": "Rebrand",
            "info": []
        });
        let req = Request::post("/api/work")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = work_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
