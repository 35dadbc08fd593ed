use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::lesson_progress;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = lesson_progress)]
pub struct LessonProgressEntity {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub watch_time_sec: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lesson_progress)]
pub struct InsertLessonProgressEntity {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub watch_time_sec: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = lesson_progress)]
pub struct UpdateLessonProgressEntity {
    pub is_completed: bool,
    pub watch_time_sec: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_watched_at: DateTime<Utc>,
}
