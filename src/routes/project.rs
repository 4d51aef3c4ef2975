/**
 * Project Routes
 * CRUD for showcase projects. Every save re-resolves the referenced client
 * and refreshes the denormalized snapshot; embedded works are persisted
 * first and only their ids are stored on the project.
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    self,
    models::{Client, Project, WorkInfo},
};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_INVALID_CLIENT: &str = "Invalid client reference";
const MSG_INVALID_WORK: &str = "Invalid work reference";
const MSG_PROJECT_NOT_FOUND: &str = "Project not found";
const MAX_SHORT_DESCRIPTION: usize = 250;

lazy_static::lazy_static! {
    static ref URL_REGEX: Regex =
        Regex::new(r"^(https?://)?[\w.-]+\.[a-zA-Z]{2,}(/\S*)?$").unwrap();
}

fn is_valid_url(url: &str) -> bool {
    URL_REGEX.is_match(url)
}

/// A work description embedded in a project save. Persisted as its own
/// work row before the project stores the resulting id.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedWork {
    pub title: String,
    pub info: Vec<WorkInfo>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub image: String,
    pub short_description: String,
    pub url: String,
    pub client_id: Uuid,
    #[serde(default)]
    pub work_ids: Vec<Uuid>,
    #[serde(default)]
    pub works: Vec<EmbeddedWork>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub short_description: Option<String>,
    pub url: Option<String>,
    pub client_id: Option<Uuid>,
    pub work_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub works: Vec<EmbeddedWork>,
    pub is_active: Option<bool>,
}

/// The client fields copied onto a project at save time.
struct ClientSnapshot {
    client_name: String,
    client_email: Option<String>,
    company_name: Option<String>,
}

fn snapshot_of(client: &Client) -> ClientSnapshot {
    ClientSnapshot {
        client_name: client.name.clone(),
        client_email: client.emails.first().cloned(),
        company_name: client.companies.first().cloned(),
    }
}

async fn resolve_client(pool: &PgPool, client_id: Uuid) -> Result<Option<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>(
        r#"SELECT id, name, companies, emails, phones, is_active, created_at, updated_at
           FROM clients WHERE id = $1"#,
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await
}

/// All supplied work ids must resolve to existing rows.
async fn all_works_exist(pool: &PgPool, ids: &[Uuid]) -> Result<bool, sqlx::Error> {
    if ids.is_empty() {
        return Ok(true);
    }
    let distinct: std::collections::HashSet<&Uuid> = ids.iter().collect();
    let found: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT id) FROM works WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(pool)
            .await?;
    Ok(found as usize == distinct.len())
}

fn validate_embedded(work: &EmbeddedWork) -> Result<(), &'static str> {
    if work.title.trim().is_empty() {
        return Err("Work title is required");
    }
    if work.info.is_empty() {
        return Err("Work info is required");
    }
    for block in &work.info {
        if block.heading.trim().is_empty()
            || block.details.trim().is_empty()
            || block.image.trim().is_empty()
        {
            return Err("Work info entries need heading, details and image");
        }
    }
    Ok(())
}

/// Persist embedded work descriptions, returning the new ids. Any failure
/// reports the ids created so far so the caller can compensate.
async fn insert_embedded_works(
    pool: &PgPool,
    works: &[EmbeddedWork],
) -> Result<Vec<Uuid>, (Vec<Uuid>, sqlx::Error)> {
    let mut created = Vec::with_capacity(works.len());
    for work in works {
        let info = serde_json::to_value(&work.info).unwrap_or_else(|_| serde_json::json!([]));
        match sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO works (title, info) VALUES ($1, $2) RETURNING id",
        )
        .bind(work.title.trim())
        .bind(&info)
        .fetch_one(pool)
        .await
        {
            Ok(id) => created.push(id),
            Err(e) => return Err((created, e)),
        }
    }
    Ok(created)
}

/// Best-effort removal of works created during a save that later failed.
async fn remove_orphan_works(pool: &PgPool, ids: &[Uuid]) {
    if ids.is_empty() {
        return;
    }
    if let Err(e) = sqlx::query("DELETE FROM works WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await
    {
        tracing::error!("Failed to clean up orphaned works {:?}: {}", ids, e);
    }
}

/// Point the linked works back at the project; unlink works that used to
/// belong to it but are no longer listed.
async fn sync_work_links(pool: &PgPool, project_id: Uuid, work_ids: &[Uuid]) {
    if let Err(e) = sqlx::query(
        "UPDATE works SET project_id = NULL, updated_at = now()
         WHERE project_id = $1 AND NOT (id = ANY($2))",
    )
    .bind(project_id)
    .bind(work_ids)
    .execute(pool)
    .await
    {
        tracing::error!("Failed to unlink removed works: {}", e);
    }

    if work_ids.is_empty() {
        return;
    }
    if let Err(e) = sqlx::query(
        "UPDATE works SET project_id = $1, updated_at = now() WHERE id = ANY($2)",
    )
    .bind(project_id)
    .bind(work_ids)
    .execute(pool)
    .await
    {
        tracing::error!("Failed to link works to project {}: {}", project_id, e);
    }
}

const PROJECT_COLUMNS: &str = "id, name, image, short_description, url, client_id, client_name, \
                               client_email, company_name, work_ids, is_active, created_at, updated_at";

/// POST /api/project - Create a project (auth required)
pub async fn create_project(
    headers: HeaderMap,
    Json(payload): Json<CreateProjectRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.name.trim().is_empty()
        || payload.image.trim().is_empty()
        || payload.short_description.trim().is_empty()
        || payload.url.trim().is_empty()
    {
        return error_response(StatusCode::BAD_REQUEST, "All fields are required");
    }

    if payload.short_description.len() > MAX_SHORT_DESCRIPTION {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Short description cannot exceed 250 characters",
        );
    }

    if !is_valid_url(payload.url.trim()) {
        return error_response(StatusCode::BAD_REQUEST, "Please enter a valid URL");
    }

    for work in &payload.works {
        if let Err(msg) = validate_embedded(work) {
            return error_response(StatusCode::BAD_REQUEST, msg);
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    // Resolving the client gates everything else; its fields are copied
    // onto the project at this save.
    let client = match resolve_client(pool.as_ref(), payload.client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_CLIENT),
        Err(e) => {
            tracing::error!("Failed to resolve client: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add project", e);
        }
    };

    match all_works_exist(pool.as_ref(), &payload.work_ids).await {
        Ok(true) => {}
        Ok(false) => return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_WORK),
        Err(e) => {
            tracing::error!("Failed to validate work references: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add project", e);
        }
    }

    // Embedded works land first; the project stores only their ids.
    let created_ids = match insert_embedded_works(pool.as_ref(), &payload.works).await {
        Ok(ids) => ids,
        Err((created, e)) => {
            tracing::error!("Failed to persist embedded work: {}", e);
            remove_orphan_works(pool.as_ref(), &created).await;
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add project", e);
        }
    };

    let mut work_ids = payload.work_ids.clone();
    work_ids.extend(&created_ids);

    let snapshot = snapshot_of(&client);

    let inserted = sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects
            (name, image, short_description, url, client_id, client_name, client_email,
             company_name, work_ids, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, true))
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(payload.name.trim())
    .bind(payload.image.trim())
    .bind(payload.short_description.trim())
    .bind(payload.url.trim())
    .bind(client.id)
    .bind(&snapshot.client_name)
    .bind(&snapshot.client_email)
    .bind(&snapshot.company_name)
    .bind(&work_ids)
    .bind(payload.is_active)
    .fetch_one(pool.as_ref())
    .await;

    match inserted {
        Ok(project) => {
            sync_work_links(pool.as_ref(), project.id, &work_ids).await;
            success_response(StatusCode::CREATED, "Project added successfully", Some(project))
        }
        Err(e) => {
            // The embedded works were created for this save only; take them
            // back out rather than leaving unreconciled rows behind.
            remove_orphan_works(pool.as_ref(), &created_ids).await;
            tracing::error!("Failed to create project: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add project", e)
        }
    }
}

/// GET /api/project - List projects, newest first (auth required)
pub async fn list_projects(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
    ))
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(projects) => {
            success_response(StatusCode::OK, "Projects fetched successfully", Some(projects))
        }
        Err(e) => {
            tracing::error!("Failed to fetch projects: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch projects", e)
        }
    }
}

/// GET /api/project/{id} - Fetch one project (auth required)
pub async fn get_project(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(project)) => {
            success_response(StatusCode::OK, "Project fetched successfully", Some(project))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_PROJECT_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch project: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch project", e)
        }
    }
}

/// PUT /api/project/{id} - Update a project (auth required)
/// The client snapshot refreshes on every save, whether or not client_id
/// changed.
pub async fn update_project(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
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

    if let Some(url) = payload.url.as_deref() {
        if !is_valid_url(url.trim()) {
            return error_response(StatusCode::BAD_REQUEST, "Please enter a valid URL");
        }
    }

    for work in &payload.works {
        if let Err(msg) = validate_embedded(work) {
            return error_response(StatusCode::BAD_REQUEST, msg);
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(project)) => project,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, MSG_PROJECT_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch project: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update project",
                e,
            );
        }
    };

    let client_id = payload.client_id.unwrap_or(existing.client_id);
    let client = match resolve_client(pool.as_ref(), client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_CLIENT),
        Err(e) => {
            tracing::error!("Failed to resolve client: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update project",
                e,
            );
        }
    };

    let base_work_ids = payload.work_ids.unwrap_or_else(|| existing.work_ids.clone());
    match all_works_exist(pool.as_ref(), &base_work_ids).await {
        Ok(true) => {}
        Ok(false) => return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_WORK),
        Err(e) => {
            tracing::error!("Failed to validate work references: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update project",
                e,
            );
        }
    }

    let created_ids = match insert_embedded_works(pool.as_ref(), &payload.works).await {
        Ok(ids) => ids,
        Err((created, e)) => {
            tracing::error!("Failed to persist embedded work: {}", e);
            remove_orphan_works(pool.as_ref(), &created).await;
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update project",
                e,
            );
        }
    };

    let mut work_ids = base_work_ids;
    work_ids.extend(&created_ids);

    let snapshot = snapshot_of(&client);

    let updated = sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects
        SET name = COALESCE($1, name),
            image = COALESCE($2, image),
            short_description = COALESCE($3, short_description),
            url = COALESCE($4, url),
            client_id = $5,
            client_name = $6,
            client_email = $7,
            company_name = $8,
            work_ids = $9,
            is_active = COALESCE($10, is_active),
            updated_at = now()
        WHERE id = $11
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.short_description)
    .bind(payload.url.as_deref().map(str::trim))
    .bind(client.id)
    .bind(&snapshot.client_name)
    .bind(&snapshot.client_email)
    .bind(&snapshot.company_name)
    .bind(&work_ids)
    .bind(payload.is_active)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await;

    match updated {
        Ok(project) => {
            sync_work_links(pool.as_ref(), project.id, &work_ids).await;
            success_response(StatusCode::OK, "Project updated successfully", Some(project))
        }
        Err(e) => {
            remove_orphan_works(pool.as_ref(), &created_ids).await;
            tracing::error!("Failed to update project: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update project", e)
        }
    }
}

/// DELETE /api/project/{id} - Delete a project (auth required)
/// Linked works survive, unlinked.
pub async fn delete_project(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let deleted = match sqlx::query_as::<_, Project>(&format!(
        "DELETE FROM projects WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(project)) => project,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, MSG_PROJECT_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete project: {}", e);
            return error_response_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete project",
                e,
            );
        }
    };

    if let Err(e) = sqlx::query(
        "UPDATE works SET project_id = NULL, updated_at = now() WHERE project_id = $1",
    )
    .bind(id)
    .execute(pool.as_ref())
    .await
    {
        tracing::error!("Failed to unlink works of deleted project: {}", e);
    }

    success_response(StatusCode::OK, "Project deleted successfully", Some(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn project_router() -> Router {
        Router::new().route("/api/project", post(create_project).get(list_projects))
    }

    fn bearer() -> String {
        let token = crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("example.com/path"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_embedded_work_validation() {
        let incomplete = EmbeddedWork {
            title: "Rebrand".to_string(),
            info: vec![],
        };
        assert!(validate_embedded(&incomplete).is_err());

        let complete = EmbeddedWork {
            title: "Rebrand".to_string(),
            info: vec![WorkInfo {
                heading: "Phase 1".to_string(),
                details: "Discovery".to_string(),
                image: "https://cdn/p1.jpg".to_string(),
            }],
        };
        assert!(validate_embedded(&complete).is_ok());
    }

    #[test]
    fn test_snapshot_takes_first_email_and_company() {
        let client = Client {
            id: Uuid::new_v4(),
            name: "Jordan".to_string(),
            companies: vec!["acme".to_string(), "beta".to_string()],
            emails: vec!["jordan@acme.com".to_string()],
            phones: vec![],
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let snapshot = snapshot_of(&client);
        assert_eq!(snapshot.client_name, "Jordan");
        assert_eq!(snapshot.client_email.as_deref(), Some("jordan@acme.com"));
        assert_eq!(snapshot.company_name.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn test_create_project_requires_auth() {
        let body = serde_json::json!({
            "name": "Site",
            "image": "https://cdn/x.jpg",
            "shortDescription": "short",
            "url": "https://example.com",
            "clientId": Uuid::new_v4()
        });
        let req = Request::post("/api/project")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = project_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_project_rejects_bad_url() {
        let body = serde_json::json!({
            "name": "Site",
            "image": "https://cdn/x.jpg",
            "shortDescription": "short",
            "url": "not a url",
            "clientId": Uuid::new_v4()
        });
        let req = Request::post("/api/project")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = project_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
