use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;

use crate::{
    application::usecases::{catalog::CatalogUseCase, enrollments::EnrollmentUseCase},
    domain::{
        repositories::{courses::CourseRepository, enrollments::EnrollmentRepository},
        value_objects::{
            catalog::{CourseFilter, DEFAULT_FEATURED_LIMIT},
            enrollments::EnrollOutcome,
        },
    },
    infrastructure::{
        axum_http::{
            auth::{AuthUser, MaybeAuthUser},
            error_responses::AppError,
        },
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{courses::CoursePostgres, enrollments::EnrollmentPostgres},
        },
    },
};

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let course_repository = Arc::new(CoursePostgres::new(Arc::clone(&db_pool)));
    let enrollment_repository = Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool)));

    let catalog_usecase =
        CatalogUseCase::new(Arc::clone(&course_repository), Arc::clone(&enrollment_repository));
    let enrollment_usecase = EnrollmentUseCase::new(course_repository, enrollment_repository);

    let catalog = Router::new()
        .route("/", get(list_courses))
        .route("/featured", get(featured))
        .route("/search", get(search))
        .route("/:slug", get(course_detail))
        .with_state(Arc::new(catalog_usecase));

    let enrollment = Router::new()
        .route("/:slug/enroll", post(enroll))
        .with_state(Arc::new(enrollment_usecase));

    catalog.merge(enrollment)
}

pub async fn list_courses<C, E>(
    State(catalog_usecase): State<Arc<CatalogUseCase<C, E>>>,
    viewer: MaybeAuthUser,
    Query(filter): Query<CourseFilter>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let page = catalog_usecase
        .list_courses(filter, viewer.user_id())
        .await?;
    Ok(Json(page))
}

pub async fn featured<C, E>(
    State(catalog_usecase): State<Arc<CatalogUseCase<C, E>>>,
    Query(query): Query<FeaturedQuery>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let courses = catalog_usecase
        .featured(query.limit.unwrap_or(DEFAULT_FEATURED_LIMIT))
        .await?;
    Ok(Json(courses))
}

pub async fn search<C, E>(
    State(catalog_usecase): State<Arc<CatalogUseCase<C, E>>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let hits = catalog_usecase.search(query.q).await?;
    Ok(Json(hits))
}

pub async fn course_detail<C, E>(
    State(catalog_usecase): State<Arc<CatalogUseCase<C, E>>>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let detail = catalog_usecase
        .course_detail(slug, viewer.user_id())
        .await?;
    Ok(Json(detail))
}

pub async fn enroll<C, E>(
    State(enrollment_usecase): State<Arc<EnrollmentUseCase<C, E>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    info!(%user_id, %slug, "courses: enroll request received");
    let outcome = enrollment_usecase.enroll(user_id, slug).await?;

    let status = match &outcome {
        EnrollOutcome::Enrolled { .. } => StatusCode::CREATED,
        EnrollOutcome::Reenrolled { .. } => StatusCode::OK,
        EnrollOutcome::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
    };

    Ok((status, Json(outcome)))
}
