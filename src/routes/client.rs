/**
 * Client Routes
 * CRUD for client records; companies and emails are stored lowercase so
 * review verification can match case-insensitively
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Client};
use crate::routes::{
    db_unavailable, error_response, error_response_with, require_auth, success_response,
};

const MSG_CLIENT_NOT_FOUND: &str = "Client not found";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub name: String,
    pub companies: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub companies: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
    pub phones: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Trim, lowercase and drop empty entries.
fn normalize_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn normalize_phones(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// POST /api/client - Create a client (auth required)
pub async fn create_client(
    headers: HeaderMap,
    Json(payload): Json<CreateClientRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Client name is required");
    }

    let companies = normalize_list(payload.companies);
    if companies.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "At least one company is required");
    }

    let emails = normalize_list(payload.emails);
    if let Some(bad) = emails.iter().find(|e| !e.contains('@')) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid email address: {}", bad),
        );
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (name, companies, emails, phones, is_active)
        VALUES ($1, $2, $3, $4, COALESCE($5, true))
        RETURNING id, name, companies, emails, phones, is_active, created_at, updated_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&companies)
    .bind(&emails)
    .bind(normalize_phones(payload.phones))
    .bind(payload.is_active)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(client) => {
            success_response(StatusCode::CREATED, "Client added successfully", Some(client))
        }
        Err(e) => {
            tracing::error!("Failed to create client: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add client", e)
        }
    }
}

/// GET /api/client - List clients, newest first (auth required)
pub async fn list_clients(headers: HeaderMap) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Client>(
        r#"SELECT id, name, companies, emails, phones, is_active, created_at, updated_at
           FROM clients ORDER BY created_at DESC"#,
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(clients) => {
            success_response(StatusCode::OK, "Client(s) fetched successfully", Some(clients))
        }
        Err(e) => {
            tracing::error!("Failed to fetch clients: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch clients", e)
        }
    }
}

/// GET /api/client/{id} - Fetch one client (auth required)
pub async fn get_client(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Client>(
        r#"SELECT id, name, companies, emails, phones, is_active, created_at, updated_at
           FROM clients WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(client)) => {
            success_response(StatusCode::OK, "Client(s) fetched successfully", Some(client))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_CLIENT_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch client: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch clients", e)
        }
    }
}

/// PUT /api/client/{id} - Update a client (auth required)
/// Edits do not ripple into project snapshots; those refresh on the next
/// project save.
pub async fn update_client(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let companies = payload.companies.map(normalize_list);
    if let Some(companies) = &companies {
        if companies.is_empty() {
            return error_response(StatusCode::BAD_REQUEST, "At least one company is required");
        }
    }

    let emails = payload.emails.map(normalize_list);
    if let Some(emails) = &emails {
        if let Some(bad) = emails.iter().find(|e| !e.contains('@')) {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid email address: {}", bad),
            );
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients
        SET name = COALESCE($1, name),
            companies = COALESCE($2, companies),
            emails = COALESCE($3, emails),
            phones = COALESCE($4, phones),
            is_active = COALESCE($5, is_active),
            updated_at = now()
        WHERE id = $6
        RETURNING id, name, companies, emails, phones, is_active, created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(&companies)
    .bind(&emails)
    .bind(payload.phones.map(normalize_phones))
    .bind(payload.is_active)
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(client)) => {
            success_response(StatusCode::OK, "Client updated successfully", Some(client))
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, MSG_CLIENT_NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to update client: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update client", e)
        }
    }
}

/// DELETE /api/client/{id} - Delete a client (auth required)
pub async fn delete_client(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) => {
            if result.rows_affected() == 0 {
                return error_response(StatusCode::NOT_FOUND, MSG_CLIENT_NOT_FOUND);
            }
            success_response::<()>(StatusCode::OK, "Client deleted successfully", None)
        }
        Err(e) => {
            tracing::error!("Failed to delete client: {}", e);
            error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete client", e)
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

    fn client_router() -> Router {
        Router::new().route("/api/client", post(create_client).get(list_clients))
    }

    fn bearer() -> String {
        let token = crate::routes::auth::create_access_token("some-id", "a@b.c", "admin").unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn test_normalize_list_lowercases_and_trims() {
        let normalized = normalize_list(vec![
            "  Acme Corp ".to_string(),
            "".to_string(),
            "BETA LLC".to_string(),
        ]);
        assert_eq!(normalized, vec!["acme corp", "beta llc"]);
    }

    #[tokio::test]
    async fn test_create_client_requires_company() {
        let body = serde_json::json!({
            "name": "Jordan",
            "companies": []
        });
        let req = Request::post("/api/client")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = client_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_client_rejects_bad_email() {
        let body = serde_json::json!({
            "name": "Jordan",
            "companies": ["Acme"],
            "emails": ["not-an-email"]
        });
        let req = Request::post("/api/client")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = client_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_clients_requires_auth() {
        let req = Request::get("/api/client").body(Body::empty()).unwrap();
        let res = client_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
