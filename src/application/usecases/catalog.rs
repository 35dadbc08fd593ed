use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{
    repositories::{courses::CourseRepository, enrollments::EnrollmentRepository},
    value_objects::{
        catalog::{
            CatalogPageDto, CourseDetailDto, CourseFilter, CourseSearchHitDto, CourseSummaryDto,
            SEARCH_RESULT_LIMIT,
        },
        enrollments::EnrollmentModel,
    },
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("course not found")]
    CourseNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CatalogError::CourseNotFound => StatusCode::NOT_FOUND,
            CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CatalogError>;

fn internal(context: &'static str) -> impl FnOnce(anyhow::Error) -> CatalogError {
    move |err| {
        error!(db_error = ?err, "catalog: {context}");
        CatalogError::Internal(err)
    }
}

pub struct CatalogUseCase<C, E>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    course_repo: Arc<C>,
    enrollment_repo: Arc<E>,
}

impl<C, E> CatalogUseCase<C, E>
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

    pub async fn list_courses(
        &self,
        filter: CourseFilter,
        viewer: Option<Uuid>,
    ) -> UseCaseResult<CatalogPageDto> {
        let filter = filter.normalized();
        debug!(filter = ?filter, viewer = ?viewer, "catalog: listing courses");

        let courses = self
            .course_repo
            .list_active(filter.clone())
            .await
            .map_err(internal("failed to list courses"))?;
        let categories = self
            .course_repo
            .distinct_categories()
            .await
            .map_err(internal("failed to load categories"))?;
        let levels = self
            .course_repo
            .distinct_levels()
            .await
            .map_err(internal("failed to load levels"))?;

        let enrolled_course_ids = match viewer {
            Some(user_id) => self
                .enrollment_repo
                .list_active_course_ids(user_id)
                .await
                .map_err(internal("failed to load enrolled course ids"))?,
            None => Vec::new(),
        };

        info!(course_count = courses.len(), "catalog: courses listed");

        Ok(CatalogPageDto {
            courses: courses.into_iter().map(CourseSummaryDto::from).collect(),
            categories,
            levels,
            enrolled_course_ids,
            filter,
        })
    }

    pub async fn search(&self, query: String) -> UseCaseResult<Vec<CourseSearchHitDto>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self
            .course_repo
            .search(query, SEARCH_RESULT_LIMIT)
            .await
            .map_err(internal("failed to search courses"))?;

        Ok(hits.into_iter().map(CourseSearchHitDto::from).collect())
    }

    pub async fn featured(&self, limit: i64) -> UseCaseResult<Vec<CourseSummaryDto>> {
        let courses = self
            .course_repo
            .featured(limit.clamp(1, 24))
            .await
            .map_err(internal("failed to load featured courses"))?;

        Ok(courses.into_iter().map(CourseSummaryDto::from).collect())
    }

    pub async fn course_detail(
        &self,
        slug: String,
        viewer: Option<Uuid>,
    ) -> UseCaseResult<CourseDetailDto> {
        let course = self
            .course_repo
            .find_active_by_slug(slug.clone())
            .await
            .map_err(internal("failed to load course"))?
            .ok_or_else(|| {
                info!(%slug, "catalog: course not found");
                CatalogError::CourseNotFound
            })?;

        let modules = self
            .course_repo
            .list_modules_with_lessons(course.id)
            .await
            .map_err(internal("failed to load course outline"))?;
        let enrollment_count = self
            .course_repo
            .count_enrollments(course.id)
            .await
            .map_err(internal("failed to count enrollments"))?;

        let enrollment = match viewer {
            Some(user_id) => self
                .enrollment_repo
                .find_active(user_id, course.id)
                .await
                .map_err(internal("failed to load viewer enrollment"))?
                .map(EnrollmentModel::from),
            None => None,
        };

        Ok(CourseDetailDto::new(course, modules, enrollment_count, enrollment))
    }
}
