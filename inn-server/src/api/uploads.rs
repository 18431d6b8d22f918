//! File uploads (round 3 proof screenshots, team avatars)
//!
//! The body is the raw file. `Content-Type` picks the format and must match
//! the file's magic bytes; `X-File-Name` is optional.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use inn_common::db::Upload;
use inn_common::time::now_rfc3339;

use super::auth::{require_admin, require_team, session_team_id};
use crate::db::{teams, uploads};
use crate::session::Session;
use crate::{ApiError, ApiResult, AppState};

/// Largest accepted upload (5 MiB)
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Upload kinds a team may send
pub const UPLOAD_KINDS: [&str; 2] = ["round3-proof", "avatar"];

const FILE_NAME_HEADER: &str = "x-file-name";

/// Accepted formats: (content type, extension, magic bytes)
const FORMATS: [(&str, &str, &[u8]); 3] = [
    ("image/png", "png", b"\x89PNG\r\n\x1a\n"),
    ("image/jpeg", "jpg", b"\xff\xd8\xff"),
    ("application/pdf", "pdf", b"%PDF-"),
];

/// Look up the format for a `Content-Type` value (parameters ignored)
fn format_for(content_type: &str) -> Option<(&'static str, &'static str, &'static [u8])> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    };
    FORMATS.iter().copied().find(|(mime, _, _)| *mime == essence)
}

/// Keep the last path component, drop control characters, cap the length
fn sanitize_file_name(raw: Option<&str>, extension: &str) -> String {
    let name: String = raw
        .unwrap_or("")
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_control())
        .take(255)
        .collect();
    let name = name.trim();

    if name.is_empty() || name == "." || name == ".." {
        format!("upload.{}", extension)
    } else {
        name.to_string()
    }
}

/// POST /api/uploads/:kind
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<(StatusCode, Json<Upload>)> {
    let team_id = session_team_id(&session)?.to_string();

    if !UPLOAD_KINDS.contains(&kind.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Unknown upload kind '{}' (expected {})",
            kind,
            UPLOAD_KINDS.join(" or ")
        )));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let (mime, extension, magic) = format_for(content_type).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unsupported content type '{}' (expected PNG, JPEG or PDF)",
            content_type
        ))
    })?;

    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > MAX_UPLOAD_BYTES) {
        return Err(too_large());
    }

    let bytes = axum::body::to_bytes(body, MAX_UPLOAD_BYTES)
        .await
        .map_err(|_| too_large())?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Upload body is empty".to_string()));
    }
    if !bytes.starts_with(magic) {
        return Err(ApiError::BadRequest(format!(
            "File content does not match {}",
            mime
        )));
    }

    let file_name = sanitize_file_name(
        headers.get(FILE_NAME_HEADER).and_then(|v| v.to_str().ok()),
        extension,
    );

    let id = Uuid::new_v4().to_string();
    let team_dir = state.uploads_dir.join(&team_id);
    let stored_path = team_dir.join(format!("{}.{}", id, extension));

    tokio::fs::create_dir_all(&team_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Create upload directory failed: {}", e)))?;
    tokio::fs::write(&stored_path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Write upload failed: {}", e)))?;

    let upload = Upload {
        id,
        team_id: team_id.clone(),
        kind,
        file_name,
        content_type: mime.to_string(),
        size_bytes: bytes.len() as i64,
        stored_path: stored_path.to_string_lossy().to_string(),
        created_at: now_rfc3339(),
    };

    if let Err(e) = uploads::insert_upload(&state.db, &upload).await {
        if let Err(remove_err) = tokio::fs::remove_file(&stored_path).await {
            warn!("Could not remove orphaned upload {}: {}", stored_path.display(), remove_err);
        }
        return Err(e.into());
    }

    info!(
        team_id = %team_id,
        kind = %upload.kind,
        size_bytes = upload.size_bytes,
        "File uploaded"
    );
    Ok((StatusCode::CREATED, Json(upload)))
}

fn too_large() -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "Uploads are limited to {} MiB",
        MAX_UPLOAD_BYTES / (1024 * 1024)
    ))
}

/// GET /api/uploads
pub async fn list_own_uploads(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Upload>>> {
    let team_id = session_team_id(&session)?;
    Ok(Json(uploads::list_uploads(&state.db, team_id).await?))
}

/// GET /api/uploads/team/:team_id
pub async fn list_team_uploads(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<Vec<Upload>>> {
    teams::require_team(&state.db, &team_id).await?;
    Ok(Json(uploads::list_uploads(&state.db, &team_id).await?))
}

/// Build upload routes
pub fn upload_routes(state: AppState) -> Router<AppState> {
    let team = Router::new()
        .route("/api/uploads", get(list_own_uploads))
        .route("/api/uploads/:kind", post(upload_file))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_team));

    let admin = Router::new()
        .route("/api/uploads/team/:team_id", get(list_team_uploads))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    team.merge(admin)
}
