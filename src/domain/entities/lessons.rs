use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::lessons;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = lessons)]
pub struct LessonEntity {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub video_duration_sec: Option<i32>,
    pub content: Option<String>,
    pub resources: serde_json::Value,
    pub order_index: i32,
    pub is_free: bool,
    pub is_active: bool,
}
