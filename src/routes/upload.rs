/**
 * Image Routes
 * Multipart asset uploads to the object store and deletion by public URL
 */
use axum::{
    extract::Multipart,
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::routes::{error_response, error_response_with, require_auth, success_response};

const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const MAX_FILES_PER_REQUEST: usize = 10;

/// Directory backing the object store
static UPLOAD_DIR: Lazy<String> =
    Lazy::new(|| std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));

/// Public URL prefix mapped to the upload directory
static PUBLIC_UPLOAD_BASE: Lazy<String> =
    Lazy::new(|| std::env::var("PUBLIC_UPLOAD_BASE").unwrap_or_else(|_| "/uploads".to_string()));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImagesRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedImages {
    pub deleted: Vec<String>,
}

/// Sniff the payload type from its magic bytes. Declared content types are
/// not trusted.
fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        // PDF: 25 50 44 46 ("%PDF")
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        _ => None,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Storage key from a public URL: everything after the upload base.
fn key_from_url(url: &str) -> Option<String> {
    let base = PUBLIC_UPLOAD_BASE.trim_end_matches('/');
    let key = url.split_once(&format!("{}/", base)).map(|(_, k)| k)?;
    // Reject traversal and empty keys.
    if key.is_empty() || key.contains("..") || key.contains('/') || key.contains('\\') {
        return None;
    }
    Some(key.to_string())
}

/// POST /api/image - Upload up to 10 images/PDFs (auth required)
/// All parts are validated before any byte is written.
pub async fn upload_images(headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    // Collect and validate every part first.
    let mut pending: Vec<(String, &'static str, axum::body::Bytes)> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Multipart error: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Invalid multipart data");
            }
        };

        let original_name = field.file_name().unwrap_or("unknown").to_string();

        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Failed to read upload bytes: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Failed to read file data");
            }
        };

        if bytes.is_empty() {
            return error_response(StatusCode::BAD_REQUEST, "Empty file");
        }

        if bytes.len() > MAX_FILE_SIZE {
            return error_response(StatusCode::BAD_REQUEST, "File too large. Maximum size is 5MB.");
        }

        let mime = match sniff_content_type(&bytes) {
            Some(mime) => mime,
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Invalid file type. Only images and PDFs are allowed.",
                );
            }
        };

        pending.push((original_name, mime, bytes));

        if pending.len() > MAX_FILES_PER_REQUEST {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Too many files. Maximum is 10 per request.",
            );
        }
    }

    if pending.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No files provided");
    }

    let upload_path = PathBuf::from(UPLOAD_DIR.as_str());
    if let Err(e) = tokio::fs::create_dir_all(&upload_path).await {
        tracing::error!("Failed to create upload directory: {}", e);
        return error_response_with(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to initialize upload directory",
            e,
        );
    }

    let mut uploaded = Vec::with_capacity(pending.len());

    for (original_name, mime, bytes) in pending {
        let filename = format!("{}.{}", Uuid::new_v4(), extension_for(mime));
        let file_path = upload_path.join(&filename);

        if let Err(e) = tokio::fs::write(&file_path, &bytes).await {
            tracing::error!("Failed to write upload file: {}", e);
            return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed", e);
        }

        tracing::info!("Asset uploaded: {} ({} bytes)", filename, bytes.len());

        uploaded.push(UploadedFile {
            url: format!("{}/{}", PUBLIC_UPLOAD_BASE.trim_end_matches('/'), filename),
            name: original_name,
            mime_type: mime.to_string(),
            size: bytes.len(),
        });
    }

    success_response(StatusCode::OK, "File(s) uploaded successfully", Some(uploaded))
}

/// DELETE /api/image - Remove assets by their public URLs (auth required)
/// Unknown keys are tolerated; already-missing objects count as deleted.
pub async fn delete_images(
    headers: HeaderMap,
    Json(payload): Json<DeleteImagesRequest>,
) -> Response {
    if let Err(resp) = require_auth(&headers) {
        return resp;
    }

    if payload.urls.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No URLs provided");
    }

    let keys: Vec<String> = payload
        .urls
        .iter()
        .filter_map(|url| key_from_url(url))
        .collect();

    if keys.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid URL(s)");
    }

    let upload_path = PathBuf::from(UPLOAD_DIR.as_str());
    let mut deleted = Vec::with_capacity(keys.len());

    for key in keys {
        let file_path = upload_path.join(&key);
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => {
                tracing::info!("Asset deleted: {}", key);
                deleted.push(key);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Already gone; deletion is idempotent.
                deleted.push(key);
            }
            Err(e) => {
                tracing::error!("Failed to delete asset {}: {}", key, e);
                return error_response_with(StatusCode::INTERNAL_SERVER_ERROR, "Delete failed", e);
            }
        }
    }

    success_response(
        StatusCode::OK,
        "File(s) deleted successfully",
        Some(DeletedImages { deleted }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_accepts_images_and_pdf() {
        assert_eq!(sniff_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(
            sniff_content_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some("image/png")
        );
        assert_eq!(sniff_content_type(b"%PDF-1.7"), Some("application/pdf"));
        assert_eq!(sniff_content_type(b"hello world"), None);
        assert_eq!(sniff_content_type(&[]), None);
    }

    #[test]
    fn test_key_extraction_from_url() {
        assert_eq!(
            key_from_url("https://cdn.example.com/uploads/abc.jpg").as_deref(),
            Some("abc.jpg")
        );
        assert_eq!(key_from_url("/uploads/def.png").as_deref(), Some("def.png"));
        assert_eq!(key_from_url("https://cdn.example.com/other/abc.jpg"), None);
    }

    #[test]
    fn test_key_extraction_rejects_traversal() {
        assert_eq!(key_from_url("/uploads/../etc/passwd"), None);
        assert_eq!(key_from_url("/uploads/"), None);
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("application/pdf"), "pdf");
    }
}
