use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::enrollments::EnrollmentEntity, value_objects::catalog::CourseSummaryDto,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percentage: f64,
    pub is_active: bool,
    pub is_completed: bool,
}

impl From<EnrollmentEntity> for EnrollmentModel {
    fn from(entity: EnrollmentEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            course_id: entity.course_id,
            enrolled_at: entity.enrolled_at,
            is_completed: entity.completed_at.is_some(),
            completed_at: entity.completed_at,
            progress_percentage: entity.progress_percentage,
            is_active: entity.is_active,
        }
    }
}

/// What granting access to a course has to do with the user's latest enrollment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentAction {
    Create,
    Reactivate(Uuid),
    KeepActive(Uuid),
}

pub fn enrollment_action(existing: Option<&EnrollmentEntity>) -> EnrollmentAction {
    match existing {
        Some(enrollment) if enrollment.is_active => EnrollmentAction::KeepActive(enrollment.id),
        Some(enrollment) => EnrollmentAction::Reactivate(enrollment.id),
        None => EnrollmentAction::Create,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentChange {
    Created,
    Reactivated,
    AlreadyActive,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EnrollOutcome {
    Enrolled { enrollment: EnrollmentModel },
    Reenrolled { enrollment: EnrollmentModel },
    PaymentRequired { course_id: Uuid, checkout_path: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrolledCourseDto {
    pub enrollment: EnrollmentModel,
    pub course: CourseSummaryDto,
}
