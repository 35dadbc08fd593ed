use serde::Serialize;

use crate::domain::value_objects::{
    catalog::{CourseSummaryDto, ModuleOutlineDto},
    enrollments::{EnrolledCourseDto, EnrollmentModel},
    progress::{LessonProgressModel, RecentLessonActivity},
    subscriptions::SubscriptionView,
};

pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardOverviewDto {
    pub enrollments: Vec<EnrolledCourseDto>,
    pub active_subscription: Option<SubscriptionView>,
    pub recent_activity: Vec<RecentLessonActivity>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrolledCourseDetailDto {
    pub course: CourseSummaryDto,
    pub enrollment: EnrollmentModel,
    pub modules: Vec<ModuleOutlineDto>,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub lesson_progress: Vec<LessonProgressModel>,
}
