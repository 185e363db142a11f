use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Illust {
    pub id: i64,
    pub title: String,
    pub caption: Option<String>,
    pub author_id: i64,
    pub uploaded_at: chrono::NaiveDateTime,
    pub views: i64,
    pub bookmarks: i64,
    pub page_count: i64,
    pub lewd_level: i64,
    pub r18: bool,
    pub is_bookmarked: bool,
}
