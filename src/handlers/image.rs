use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::state::AppState;
use crate::utils::response::ApiError;

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[utoipa::path(
    get,
    path = "/illust/{id}/page/{index}",
    responses(
        (status = 200, description = "Raw image bytes for one page"),
        (status = 404, description = "Page not found")
    ),
    params(
        ("id" = i64, Path, description = "Illustration ID"),
        ("index" = i64, Path, description = "Zero-based page index")
    )
)]
pub async fn get_page_image(
    State(state): State<AppState>,
    Path((id, index)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let file_path: Option<(String,)> = sqlx::query_as(
        "SELECT file_path FROM page WHERE illust_id = ? AND page_index = ?",
    )
    .bind(id)
    .bind(index)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let file_path = match file_path {
        Some((p,)) => p,
        None => return Err(ApiError::NotFound("Page not found".into())),
    };

    let bytes = match tokio::fs::read(&file_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // row exists but the file was removed out of band
            return Err(ApiError::NotFound("Page file missing on disk".into()));
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&file_path))],
        bytes,
    )
        .into_response())
}
