use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::courses::CourseEntity,
    value_objects::{
        catalog::{CourseFilter, ModuleWithLessons},
        lessons::LessonWithCourse,
    },
};

/// Read access to the course tree. Only active courses, modules and lessons are visible.
#[async_trait]
#[automock]
pub trait CourseRepository {
    async fn list_active(&self, filter: CourseFilter) -> Result<Vec<CourseEntity>>;
    async fn distinct_categories(&self) -> Result<Vec<String>>;
    async fn distinct_levels(&self) -> Result<Vec<String>>;
    async fn search(&self, query: String, limit: i64) -> Result<Vec<CourseEntity>>;
    async fn featured(&self, limit: i64) -> Result<Vec<CourseEntity>>;
    async fn find_active_by_slug(&self, slug: String) -> Result<Option<CourseEntity>>;
    async fn find_active_by_id(&self, course_id: Uuid) -> Result<Option<CourseEntity>>;
    async fn list_modules_with_lessons(&self, course_id: Uuid) -> Result<Vec<ModuleWithLessons>>;
    async fn count_lessons(&self, course_id: Uuid) -> Result<i64>;
    async fn count_enrollments(&self, course_id: Uuid) -> Result<i64>;
    async fn find_lesson(&self, lesson_id: Uuid) -> Result<Option<LessonWithCourse>>;
}
