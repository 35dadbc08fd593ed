use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::lessons::LessonEntity,
    value_objects::progress::LessonProgressModel,
};

/// A lesson together with the course it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonWithCourse {
    pub lesson: LessonEntity,
    pub course_id: Uuid,
    pub course_slug: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LessonDto {
    pub id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub course_slug: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub video_duration_sec: Option<i32>,
    pub content: Option<String>,
    pub resources: serde_json::Value,
    pub order_index: i32,
    pub is_free: bool,
}

impl From<LessonWithCourse> for LessonDto {
    fn from(value: LessonWithCourse) -> Self {
        let lesson = value.lesson;
        Self {
            id: lesson.id,
            module_id: lesson.module_id,
            course_id: value.course_id,
            course_slug: value.course_slug,
            title: lesson.title,
            description: lesson.description,
            video_url: lesson.video_url,
            video_duration_sec: lesson.video_duration_sec,
            content: lesson.content,
            resources: lesson.resources,
            order_index: lesson.order_index,
            is_free: lesson.is_free,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LessonViewDto {
    pub lesson: LessonDto,
    pub progress: Option<LessonProgressModel>,
}
