use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{courses::CourseEntity, enrollments::EnrollmentEntity},
    value_objects::enrollments::EnrollmentChange,
};

#[async_trait]
#[automock]
pub trait EnrollmentRepository {
    async fn find_active(&self, user_id: Uuid, course_id: Uuid)
    -> Result<Option<EnrollmentEntity>>;
    /// Most recent enrollment for the pair, active or not.
    async fn find_latest(&self, user_id: Uuid, course_id: Uuid)
    -> Result<Option<EnrollmentEntity>>;
    /// Creates or reactivates the enrollment so exactly one active row exists.
    async fn grant(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<(EnrollmentEntity, EnrollmentChange)>;
    async fn list_active_course_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
    async fn list_active_with_courses(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(EnrollmentEntity, CourseEntity)>>;
}
