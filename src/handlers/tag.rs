use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::state::AppState;
use crate::utils::response::{ApiError, ApiResponse};

#[derive(Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagQuery {
    pub search: Option<String>,
    pub size: Option<i64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TagWithCount {
    pub id: i64,
    pub name: String,
    pub translated_name: Option<String>,
    pub illust_count: i64,
}

#[utoipa::path(
    get,
    path = "/tag",
    params(TagQuery),
    responses(
        (status = 200, description = "List tags with usage counts", body = Object)
    )
)]
pub async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<ApiResponse<Vec<TagWithCount>>>, ApiError> {
    let size = query.size.unwrap_or(100);
    if size < 1 {
        return Err(ApiError::BadRequest("size must be positive".into()));
    }

    let mut sql = String::from(
        "SELECT t.id, t.name, t.translated_name, COUNT(it.illust_id) as illust_count
         FROM tag t JOIN illust_tag it ON it.tag_id = t.id",
    );
    if query.search.is_some() {
        sql.push_str(" WHERE t.name LIKE ? OR t.translated_name LIKE ?");
    }
    sql.push_str(" GROUP BY t.id ORDER BY illust_count DESC, t.name LIMIT ?");

    let mut q = sqlx::query_as::<sqlx::Sqlite, TagWithCount>(&sql);
    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", search.to_lowercase());
        q = q.bind(pattern.clone()).bind(pattern);
    }
    q = q.bind(size);

    let tags = q
        .fetch_all(&state.pool)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(tags)))
}
