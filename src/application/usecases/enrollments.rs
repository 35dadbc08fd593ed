use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::usecases::checkout::course_checkout_path,
    domain::{
        repositories::{courses::CourseRepository, enrollments::EnrollmentRepository},
        value_objects::enrollments::{EnrollOutcome, EnrollmentChange, EnrollmentModel},
    },
};

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("course not found")]
    CourseNotFound,
    #[error("already enrolled in this course")]
    AlreadyEnrolled,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EnrollmentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            EnrollmentError::CourseNotFound => StatusCode::NOT_FOUND,
            EnrollmentError::AlreadyEnrolled => StatusCode::CONFLICT,
            EnrollmentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, EnrollmentError>;

pub struct EnrollmentUseCase<C, E>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    course_repo: Arc<C>,
    enrollment_repo: Arc<E>,
}

impl<C, E> EnrollmentUseCase<C, E>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    pub fn new(course_repo: Arc<C>, enrollment_repo: Arc<E>) -> Self {
        Self {
            course_repo,
            enrollment_repo,
        }
    }

    /// Free courses are granted directly, a lapsed enrollment is reactivated,
    /// and paid courses are routed to checkout without writing anything.
    pub async fn enroll(&self, user_id: Uuid, slug: String) -> UseCaseResult<EnrollOutcome> {
        info!(%user_id, %slug, "enrollments: enroll requested");

        let course = self
            .course_repo
            .find_active_by_slug(slug.clone())
            .await
            .map_err(|err| {
                error!(%slug, db_error = ?err, "enrollments: failed to load course");
                EnrollmentError::Internal(err)
            })?
            .ok_or(EnrollmentError::CourseNotFound)?;

        let latest = self
            .enrollment_repo
            .find_latest(user_id, course.id)
            .await
            .map_err(|err| {
                error!(%user_id, course_id = %course.id, db_error = ?err, "enrollments: failed to load enrollment");
                EnrollmentError::Internal(err)
            })?;

        match latest {
            Some(enrollment) if enrollment.is_active => {
                info!(%user_id, course_id = %course.id, "enrollments: already enrolled");
                return Err(EnrollmentError::AlreadyEnrolled);
            }
            Some(_) => {}
            None if course.is_free() => {}
            None => {
                info!(%user_id, course_id = %course.id, "enrollments: paid course needs checkout");
                return Ok(EnrollOutcome::PaymentRequired {
                    course_id: course.id,
                    checkout_path: course_checkout_path(course.id),
                });
            }
        }

        let (enrollment, change) = self
            .enrollment_repo
            .grant(user_id, course.id)
            .await
            .map_err(|err| {
                error!(%user_id, course_id = %course.id, db_error = ?err, "enrollments: failed to grant enrollment");
                EnrollmentError::Internal(err)
            })?;

        info!(
            %user_id,
            course_id = %course.id,
            enrollment_id = %enrollment.id,
            change = ?change,
            "enrollments: enrollment granted"
        );

        let enrollment = EnrollmentModel::from(enrollment);
        Ok(match change {
            EnrollmentChange::Reactivated => EnrollOutcome::Reenrolled { enrollment },
            EnrollmentChange::Created | EnrollmentChange::AlreadyActive => {
                EnrollOutcome::Enrolled { enrollment }
            }
        })
    }
}
