use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Page, Tag};
use crate::state::AppState;
use crate::utils::response::{ApiError, ApiResponse};

#[derive(Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IllustQuery {
    pub size: Option<i64>,
    pub page: Option<i64>,
    pub tag: Option<String>,
    pub author: Option<i64>,
    pub text: Option<String>,
    pub include_r18: Option<bool>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct IllustListItem {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub author_name: String,
    pub uploaded_at: chrono::NaiveDateTime,
    pub page_count: i64,
    pub bookmarks: i64,
    pub r18: bool,
}

#[utoipa::path(
    get,
    path = "/illust",
    params(IllustQuery),
    responses(
        (status = 200, description = "List downloaded illustrations", body = Object)
    )
)]
pub async fn list_illusts(
    State(state): State<AppState>,
    Query(query): Query<IllustQuery>,
) -> Result<Json<ApiResponse<Vec<IllustListItem>>>, ApiError> {
    let size = query.size.unwrap_or(25);
    let page = query.page.unwrap_or(1);
    if size < 1 || page < 1 {
        return Err(ApiError::BadRequest("size and page must be positive".into()));
    }
    let offset = (page - 1) * size;

    let mut sql = String::from(
        "SELECT i.id, i.title, i.author_id, a.name as author_name,
         i.uploaded_at, i.page_count, i.bookmarks, i.r18
         FROM illust i JOIN author a ON a.id = i.author_id",
    );

    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(ref tag) = query.tag {
        clauses.push(
            "EXISTS (SELECT 1 FROM illust_tag it JOIN tag t ON t.id = it.tag_id
             WHERE it.illust_id = i.id AND t.name = ?)",
        );
        binds.push(tag.to_lowercase());
    }
    if let Some(author) = query.author {
        clauses.push("i.author_id = ?");
        binds.push(author.to_string());
    }
    if let Some(ref text) = query.text {
        clauses.push("i.title LIKE ?");
        binds.push(format!("%{}%", text));
    }
    if !query.include_r18.unwrap_or(false) {
        clauses.push("i.r18 = 0");
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY i.uploaded_at DESC LIMIT ? OFFSET ?");

    let mut q = sqlx::query_as::<sqlx::Sqlite, IllustListItem>(&sql);
    for bind in &binds {
        q = q.bind(bind);
    }
    q = q.bind(size).bind(offset);

    let illusts = q
        .fetch_all(&state.pool)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(illusts)))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct IllustRow {
    pub id: i64,
    pub title: String,
    pub caption: Option<String>,
    pub author_id: i64,
    pub author_name: String,
    pub uploaded_at: chrono::NaiveDateTime,
    pub views: i64,
    pub bookmarks: i64,
    pub page_count: i64,
    pub lewd_level: i64,
    pub r18: bool,
    pub is_bookmarked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct IllustDetail {
    #[serde(flatten)]
    pub illust: IllustRow,
    pub tags: Vec<Tag>,
    pub pages: Vec<Page>,
}

#[utoipa::path(
    get,
    path = "/illust/{id}",
    responses(
        (status = 200, description = "Get illustration details", body = Object),
        (status = 404, description = "Illustration not found")
    ),
    params(
        ("id" = i64, Path, description = "Illustration ID")
    )
)]
pub async fn get_illust(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<IllustDetail>>, ApiError> {
    let illust = sqlx::query_as::<sqlx::Sqlite, IllustRow>(
        "SELECT i.id, i.title, i.caption, i.author_id, a.name as author_name,
         i.uploaded_at, i.views, i.bookmarks, i.page_count, i.lewd_level,
         i.r18, i.is_bookmarked
         FROM illust i JOIN author a ON a.id = i.author_id WHERE i.id = ?",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let illust = match illust {
        Some(i) => i,
        None => return Err(ApiError::NotFound("Illustration not found".into())),
    };

    let tags = sqlx::query_as::<sqlx::Sqlite, Tag>(
        "SELECT t.id, t.name, t.translated_name FROM tag t
         JOIN illust_tag it ON it.tag_id = t.id WHERE it.illust_id = ? ORDER BY t.name",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let pages = sqlx::query_as::<sqlx::Sqlite, Page>(
        "SELECT id, illust_id, page_index, file_path FROM page
         WHERE illust_id = ? ORDER BY page_index",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::success(IllustDetail {
        illust,
        tags,
        pages,
    })))
}

#[utoipa::path(
    delete,
    path = "/illust/{id}",
    responses(
        (status = 200, description = "Illustration deleted", body = Object),
        (status = 404, description = "Illustration not found")
    ),
    params(
        ("id" = i64, Path, description = "Illustration ID")
    )
)]
pub async fn delete_illust(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    // row deletion cascades through illust_tag, page and download
    let result = sqlx::query("DELETE FROM illust WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Illustration not found".into()));
    }

    let dir = state.output_root.join("raw").join(id.to_string());
    if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(illust = id, "Failed to remove page files: {}", e);
        }
    }

    Ok(Json(ApiResponse::success_null()))
}
