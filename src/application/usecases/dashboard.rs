use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{
    repositories::{
        courses::CourseRepository, enrollments::EnrollmentRepository,
        lesson_progress::LessonProgressRepository, subscriptions::SubscriptionRepository,
    },
    value_objects::{
        catalog::{CourseSummaryDto, ModuleOutlineDto, total_lessons},
        dashboard::{DashboardOverviewDto, EnrolledCourseDetailDto, RECENT_ACTIVITY_LIMIT},
        enrollments::{EnrolledCourseDto, EnrollmentModel},
        enums::subscription_plans::SubscriptionPlan,
        progress::{LessonProgressModel, course_progress_percentage},
        subscriptions::{PlanDto, SubscriptionModel, SubscriptionOverviewDto},
    },
};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("course not found")]
    CourseNotFound,
    #[error("not enrolled in this course")]
    NotEnrolled,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DashboardError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            DashboardError::CourseNotFound => StatusCode::NOT_FOUND,
            DashboardError::NotEnrolled => StatusCode::FORBIDDEN,
            DashboardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, DashboardError>;

fn internal(user_id: Uuid, context: &'static str) -> impl FnOnce(anyhow::Error) -> DashboardError {
    move |err| {
        error!(%user_id, db_error = ?err, "dashboard: {context}");
        DashboardError::Internal(err)
    }
}

pub struct DashboardUseCase<C, E, L, S>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    course_repo: Arc<C>,
    enrollment_repo: Arc<E>,
    progress_repo: Arc<L>,
    subscription_repo: Arc<S>,
}

impl<C, E, L, S> DashboardUseCase<C, E, L, S>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(
        course_repo: Arc<C>,
        enrollment_repo: Arc<E>,
        progress_repo: Arc<L>,
        subscription_repo: Arc<S>,
    ) -> Self {
        Self {
            course_repo,
            enrollment_repo,
            progress_repo,
            subscription_repo,
        }
    }

    pub async fn overview(&self, user_id: Uuid) -> UseCaseResult<DashboardOverviewDto> {
        let now = Utc::now();

        let enrollments = self
            .enrollment_repo
            .list_active_with_courses(user_id)
            .await
            .map_err(internal(user_id, "failed to load enrollments"))?;
        let active_subscription = self
            .subscription_repo
            .find_active(user_id, now)
            .await
            .map_err(internal(user_id, "failed to load active subscription"))?
            .map(|sub| SubscriptionModel::from(sub).view_at(now));
        let recent_activity = self
            .progress_repo
            .recent_for_user(user_id, RECENT_ACTIVITY_LIMIT)
            .await
            .map_err(internal(user_id, "failed to load recent activity"))?;

        info!(
            %user_id,
            enrollment_count = enrollments.len(),
            has_subscription = active_subscription.is_some(),
            "dashboard: overview loaded"
        );

        Ok(DashboardOverviewDto {
            enrollments: enrollments
                .into_iter()
                .map(|(enrollment, course)| EnrolledCourseDto {
                    enrollment: EnrollmentModel::from(enrollment),
                    course: CourseSummaryDto::from(course),
                })
                .collect(),
            active_subscription,
            recent_activity,
        })
    }

    /// Progress is recomputed from lesson rows rather than trusted from the enrollment.
    pub async fn my_courses(&self, user_id: Uuid) -> UseCaseResult<Vec<EnrolledCourseDto>> {
        let enrollments = self
            .enrollment_repo
            .list_active_with_courses(user_id)
            .await
            .map_err(internal(user_id, "failed to load enrollments"))?;

        let mut courses = Vec::with_capacity(enrollments.len());
        for (enrollment, course) in enrollments {
            let total = self
                .course_repo
                .count_lessons(course.id)
                .await
                .map_err(internal(user_id, "failed to count lessons"))?;
            let completed = self
                .progress_repo
                .count_completed(enrollment.id)
                .await
                .map_err(internal(user_id, "failed to count completed lessons"))?;

            let mut enrollment = EnrollmentModel::from(enrollment);
            enrollment.progress_percentage = course_progress_percentage(completed, total);

            courses.push(EnrolledCourseDto {
                enrollment,
                course: CourseSummaryDto::from(course),
            });
        }

        Ok(courses)
    }

    pub async fn enrolled_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> UseCaseResult<EnrolledCourseDetailDto> {
        let course = self
            .course_repo
            .find_active_by_id(course_id)
            .await
            .map_err(internal(user_id, "failed to load course"))?
            .ok_or(DashboardError::CourseNotFound)?;

        let enrollment = self
            .enrollment_repo
            .find_active(user_id, course_id)
            .await
            .map_err(internal(user_id, "failed to load enrollment"))?
            .ok_or_else(|| {
                info!(%user_id, %course_id, "dashboard: course viewed without enrollment");
                DashboardError::NotEnrolled
            })?;

        let modules = self
            .course_repo
            .list_modules_with_lessons(course_id)
            .await
            .map_err(internal(user_id, "failed to load course outline"))?;
        let lesson_progress: Vec<LessonProgressModel> = self
            .progress_repo
            .list_by_enrollment(enrollment.id)
            .await
            .map_err(internal(user_id, "failed to load lesson progress"))?
            .into_iter()
            .map(LessonProgressModel::from)
            .collect();

        let outline_lessons: HashSet<Uuid> = modules
            .iter()
            .flat_map(|m| m.lessons.iter().map(|lesson| lesson.id))
            .collect();
        let completed_lessons = lesson_progress
            .iter()
            .filter(|p| p.is_completed && outline_lessons.contains(&p.lesson_id))
            .count();

        Ok(EnrolledCourseDetailDto {
            course: CourseSummaryDto::from(course),
            enrollment: EnrollmentModel::from(enrollment),
            total_lessons: total_lessons(&modules),
            modules: modules.into_iter().map(ModuleOutlineDto::from).collect(),
            completed_lessons,
            lesson_progress,
        })
    }

    pub async fn subscription(&self, user_id: Uuid) -> UseCaseResult<SubscriptionOverviewDto> {
        let now = Utc::now();
        let history: Vec<_> = self
            .subscription_repo
            .list_by_user(user_id)
            .await
            .map_err(internal(user_id, "failed to load subscriptions"))?
            .into_iter()
            .map(|sub| SubscriptionModel::from(sub).view_at(now))
            .collect();

        let current = history.iter().find(|view| view.is_active).cloned();

        Ok(SubscriptionOverviewDto {
            current,
            history,
            plans: SubscriptionPlan::ALL.into_iter().map(PlanDto::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{
            course_modules::CourseModuleEntity, courses::CourseEntity,
            enrollments::EnrollmentEntity, lesson_progress::LessonProgressEntity,
            lessons::LessonEntity, subscriptions::SubscriptionEntity,
        },
        repositories::{
            courses::MockCourseRepository, enrollments::MockEnrollmentRepository,
            lesson_progress::MockLessonProgressRepository,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::catalog::ModuleWithLessons,
    };
    use chrono::{DateTime, Duration};
    use mockall::predicate::eq;

    fn course() -> CourseEntity {
        let now = Utc::now();
        CourseEntity {
            id: Uuid::new_v4(),
            title: "Malware Analysis".to_string(),
            slug: "malware-analysis".to_string(),
            description: "Reverse engineering".to_string(),
            category: "analysis".to_string(),
            level: "advanced".to_string(),
            price_minor: 14_900,
            currency: "usd".to_string(),
            duration_hours: 30,
            thumbnail_url: None,
            trailer_url: None,
            prerequisites: None,
            learning_outcomes: None,
            instructor_name: None,
            is_active: true,
            is_premium: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn enrollment(user_id: Uuid, course_id: Uuid, stored_pct: f64) -> EnrollmentEntity {
        EnrollmentEntity {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            enrolled_at: Utc::now(),
            completed_at: None,
            progress_percentage: stored_pct,
            is_active: true,
        }
    }

    fn subscription(
        user_id: Uuid,
        status: &str,
        created_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan: "basic".to_string(),
            status: status.to_string(),
            starts_at: created_at,
            ends_at,
            provider_subscription_id: None,
            created_at,
        }
    }

    struct Mocks {
        courses: MockCourseRepository,
        enrollments: MockEnrollmentRepository,
        progress: MockLessonProgressRepository,
        subscriptions: MockSubscriptionRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                courses: MockCourseRepository::new(),
                enrollments: MockEnrollmentRepository::new(),
                progress: MockLessonProgressRepository::new(),
                subscriptions: MockSubscriptionRepository::new(),
            }
        }

        fn usecase(
            self,
        ) -> DashboardUseCase<
            MockCourseRepository,
            MockEnrollmentRepository,
            MockLessonProgressRepository,
            MockSubscriptionRepository,
        > {
            DashboardUseCase::new(
                Arc::new(self.courses),
                Arc::new(self.enrollments),
                Arc::new(self.progress),
                Arc::new(self.subscriptions),
            )
        }
    }

    #[tokio::test]
    async fn my_courses_recomputes_progress() {
        let user_id = Uuid::new_v4();
        let course = course();
        let course_id = course.id;
        let row = enrollment(user_id, course_id, 10.0);
        let enrollment_id = row.id;

        let mut mocks = Mocks::new();
        mocks
            .enrollments
            .expect_list_active_with_courses()
            .with(eq(user_id))
            .returning(move |_| {
                let pair = (row.clone(), course.clone());
                Box::pin(async move { Ok(vec![pair]) })
            });
        mocks
            .courses
            .expect_count_lessons()
            .with(eq(course_id))
            .returning(|_| Box::pin(async { Ok(4) }));
        mocks
            .progress
            .expect_count_completed()
            .with(eq(enrollment_id))
            .returning(|_| Box::pin(async { Ok(2) }));

        let courses = mocks.usecase().my_courses(user_id).await.unwrap();

        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].enrollment.progress_percentage, 50.0);
    }

    #[tokio::test]
    async fn enrolled_course_requires_enrollment() {
        let user_id = Uuid::new_v4();
        let course = course();
        let course_id = course.id;

        let mut mocks = Mocks::new();
        mocks.courses.expect_find_active_by_id().returning(move |_| {
            let course = course.clone();
            Box::pin(async move { Ok(Some(course)) })
        });
        mocks
            .enrollments
            .expect_find_active()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mocks.courses.expect_list_modules_with_lessons().never();

        let err = mocks
            .usecase()
            .enrolled_course(user_id, course_id)
            .await
            .unwrap_err();

        assert!(matches!(err, DashboardError::NotEnrolled));
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    fn outline(course_id: Uuid, lesson_count: usize) -> ModuleWithLessons {
        let module_id = Uuid::new_v4();
        ModuleWithLessons {
            module: CourseModuleEntity {
                id: module_id,
                course_id,
                title: "Foundations".to_string(),
                description: None,
                order_index: 1,
                is_active: true,
            },
            lessons: (1..=lesson_count)
                .map(|order_index| LessonEntity {
                    id: Uuid::new_v4(),
                    module_id,
                    title: format!("Lesson {order_index}"),
                    description: None,
                    video_url: None,
                    video_duration_sec: Some(600),
                    content: None,
                    resources: serde_json::json!([]),
                    order_index: order_index as i32,
                    is_free: false,
                    is_active: true,
                })
                .collect(),
        }
    }

    fn progress_row(
        enrollment_id: Uuid,
        lesson_id: Uuid,
        is_completed: bool,
    ) -> LessonProgressEntity {
        LessonProgressEntity {
            id: Uuid::new_v4(),
            enrollment_id,
            lesson_id,
            is_completed,
            watch_time_sec: 120,
            completed_at: is_completed.then(Utc::now),
            last_watched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn enrolled_course_counts_only_outlined_completed_lessons() {
        let user_id = Uuid::new_v4();
        let course = course();
        let course_id = course.id;
        let row = enrollment(user_id, course_id, 50.0);
        let enrollment_id = row.id;
        let module = outline(course_id, 2);
        let lesson_ids: Vec<Uuid> = module.lessons.iter().map(|lesson| lesson.id).collect();

        let mut mocks = Mocks::new();
        mocks.courses.expect_find_active_by_id().returning(move |_| {
            let course = course.clone();
            Box::pin(async move { Ok(Some(course)) })
        });
        mocks.enrollments.expect_find_active().returning(move |_, _| {
            let row = row.clone();
            Box::pin(async move { Ok(Some(row)) })
        });
        mocks
            .courses
            .expect_list_modules_with_lessons()
            .returning(move |_| {
                let module = module.clone();
                Box::pin(async move { Ok(vec![module]) })
            });
        mocks
            .progress
            .expect_list_by_enrollment()
            .with(eq(enrollment_id))
            .returning(move |enrollment_id| {
                // the last two rows belong to lessons no longer in the outline
                let rows = vec![
                    progress_row(enrollment_id, lesson_ids[0], true),
                    progress_row(enrollment_id, lesson_ids[1], false),
                    progress_row(enrollment_id, Uuid::new_v4(), true),
                    progress_row(enrollment_id, Uuid::new_v4(), true),
                ];
                Box::pin(async move { Ok(rows) })
            });

        let detail = mocks
            .usecase()
            .enrolled_course(user_id, course_id)
            .await
            .unwrap();

        assert_eq!(detail.total_lessons, 2);
        assert_eq!(detail.completed_lessons, 1);
        assert_eq!(detail.lesson_progress.len(), 4);
    }

    #[tokio::test]
    async fn subscription_overview_derives_current_from_history() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let lapsed = subscription(
            user_id,
            "active",
            now - Duration::days(60),
            now - Duration::days(30),
        );
        let current = subscription(
            user_id,
            "active",
            now - Duration::days(5),
            now + Duration::days(25),
        );
        let current_id = current.id;

        let mut mocks = Mocks::new();
        mocks
            .subscriptions
            .expect_list_by_user()
            .returning(move |_| {
                let rows = vec![current.clone(), lapsed.clone()];
                Box::pin(async move { Ok(rows) })
            });

        let overview = mocks.usecase().subscription(user_id).await.unwrap();

        assert_eq!(overview.history.len(), 2);
        assert!(!overview.history[1].is_active);
        let current = overview.current.unwrap();
        assert_eq!(current.subscription.id, current_id);
        assert!(current.days_remaining >= 24);
        assert_eq!(overview.plans.len(), 3);
    }

    #[tokio::test]
    async fn overview_ignores_expired_subscription() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks
            .enrollments
            .expect_list_active_with_courses()
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));
        mocks
            .subscriptions
            .expect_find_active()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mocks
            .progress
            .expect_recent_for_user()
            .with(eq(user_id), eq(RECENT_ACTIVITY_LIMIT))
            .returning(|_, _| Box::pin(async { Ok(Vec::new()) }));

        let overview = mocks.usecase().overview(user_id).await.unwrap();

        assert!(overview.active_subscription.is_none());
        assert!(overview.enrollments.is_empty());
    }
}
