use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::{
        courses::CourseRepository, enrollments::EnrollmentRepository,
        lesson_progress::LessonProgressRepository,
    },
    value_objects::{
        lessons::{LessonDto, LessonViewDto},
        progress::{
            LessonProgressModel, ProgressSnapshot, RecordLessonProgressCommand,
            RecordProgressModel,
        },
    },
};

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("watch_time must not be negative")]
    InvalidWatchTime,
    #[error("lesson not found")]
    LessonNotFound,
    #[error("not enrolled in this course")]
    NotEnrolled,
    #[error("enroll in the course to access this lesson")]
    EnrollmentRequired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ProgressError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ProgressError::InvalidWatchTime => StatusCode::BAD_REQUEST,
            ProgressError::LessonNotFound => StatusCode::NOT_FOUND,
            ProgressError::NotEnrolled | ProgressError::EnrollmentRequired => {
                StatusCode::FORBIDDEN
            }
            ProgressError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, ProgressError>;

pub struct ProgressUseCase<C, E, L>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
{
    course_repo: Arc<C>,
    enrollment_repo: Arc<E>,
    progress_repo: Arc<L>,
}

impl<C, E, L> ProgressUseCase<C, E, L>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
{
    pub fn new(course_repo: Arc<C>, enrollment_repo: Arc<E>, progress_repo: Arc<L>) -> Self {
        Self {
            course_repo,
            enrollment_repo,
            progress_repo,
        }
    }

    pub async fn record_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        report: RecordProgressModel,
    ) -> UseCaseResult<ProgressSnapshot> {
        if report.watch_time < 0 {
            warn!(%user_id, %lesson_id, watch_time = report.watch_time, "progress: negative watch time");
            return Err(ProgressError::InvalidWatchTime);
        }

        let lesson = self
            .course_repo
            .find_lesson(lesson_id)
            .await
            .map_err(|err| {
                error!(%lesson_id, db_error = ?err, "progress: failed to load lesson");
                ProgressError::Internal(err)
            })?
            .ok_or(ProgressError::LessonNotFound)?;

        let enrollment = self
            .enrollment_repo
            .find_active(user_id, lesson.course_id)
            .await
            .map_err(|err| {
                error!(%user_id, course_id = %lesson.course_id, db_error = ?err, "progress: failed to load enrollment");
                ProgressError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%user_id, course_id = %lesson.course_id, "progress: user is not enrolled");
                ProgressError::NotEnrolled
            })?;

        let snapshot = self
            .progress_repo
            .record(RecordLessonProgressCommand {
                enrollment_id: enrollment.id,
                course_id: lesson.course_id,
                lesson_id,
                watch_time_sec: report.watch_time,
                completed: report.is_completed,
                now: Utc::now(),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %lesson_id,
                    enrollment_id = %enrollment.id,
                    db_error = ?err,
                    "progress: failed to record progress"
                );
                ProgressError::Internal(err)
            })?;

        info!(
            %user_id,
            %lesson_id,
            enrollment_id = %enrollment.id,
            progress_percentage = snapshot.progress_percentage,
            lesson_completed = snapshot.lesson_completed,
            "progress: progress recorded"
        );

        Ok(snapshot)
    }

    /// Free lessons are open to everyone. Any other lesson needs an active enrollment,
    /// and opening it starts tracking without moving the course percentage.
    pub async fn open_lesson(
        &self,
        viewer: Option<Uuid>,
        lesson_id: Uuid,
    ) -> UseCaseResult<LessonViewDto> {
        let lesson = self
            .course_repo
            .find_lesson(lesson_id)
            .await
            .map_err(|err| {
                error!(%lesson_id, db_error = ?err, "progress: failed to load lesson");
                ProgressError::Internal(err)
            })?
            .ok_or(ProgressError::LessonNotFound)?;

        let enrollment = match viewer {
            Some(user_id) => self
                .enrollment_repo
                .find_active(user_id, lesson.course_id)
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "progress: failed to load enrollment");
                    ProgressError::Internal(err)
                })?,
            None => None,
        };

        let progress = match &enrollment {
            Some(enrollment) => Some(
                self.progress_repo
                    .ensure_started(enrollment.id, lesson_id)
                    .await
                    .map_err(|err| {
                        error!(enrollment_id = %enrollment.id, %lesson_id, db_error = ?err, "progress: failed to start lesson");
                        ProgressError::Internal(err)
                    })?,
            ),
            None if lesson.lesson.is_free => None,
            None => {
                info!(viewer = ?viewer, %lesson_id, "progress: lesson requires enrollment");
                return Err(ProgressError::EnrollmentRequired);
            }
        };

        Ok(LessonViewDto {
            lesson: LessonDto::from(lesson),
            progress: progress.map(LessonProgressModel::from),
        })
    }
}
