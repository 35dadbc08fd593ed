use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::lesson_progress::LessonProgressEntity,
    value_objects::progress::{
        ProgressSnapshot, RecentLessonActivity, RecordLessonProgressCommand,
    },
};

#[async_trait]
#[automock]
pub trait LessonProgressRepository {
    /// Merges one progress report and recomputes the course percentage in a single transaction.
    async fn record(&self, command: RecordLessonProgressCommand) -> Result<ProgressSnapshot>;
    async fn ensure_started(
        &self,
        enrollment_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<LessonProgressEntity>;
    async fn list_by_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<LessonProgressEntity>>;
    async fn recent_for_user(&self, user_id: Uuid, limit: i64)
    -> Result<Vec<RecentLessonActivity>>;
    /// Completed lessons of the enrollment's course, counting active lessons only.
    async fn count_completed(&self, enrollment_id: Uuid) -> Result<i64>;
}
