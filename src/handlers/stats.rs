use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::utils::response::{ApiError, ApiResponse};

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct Stats {
    pub illusts: i64,
    pub authors: i64,
    pub tags: i64,
    pub pages: i64,
    pub r18_illusts: i64,
}

#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Collection totals", body = Object)
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Stats>>, ApiError> {
    let stats = sqlx::query_as::<sqlx::Sqlite, Stats>(
        "SELECT
         (SELECT COUNT(*) FROM illust) as illusts,
         (SELECT COUNT(*) FROM author) as authors,
         (SELECT COUNT(*) FROM tag) as tags,
         (SELECT COUNT(*) FROM page) as pages,
         (SELECT COUNT(*) FROM illust WHERE r18 = 1) as r18_illusts",
    )
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(stats)))
}
