use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Page {
    pub id: i64,
    pub illust_id: i64,
    pub page_index: i64,
    pub file_path: String,
}
