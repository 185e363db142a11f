use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub translated_name: Option<String>,
}
