use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    application::usecases::dashboard::DashboardUseCase,
    domain::repositories::{
        courses::CourseRepository, enrollments::EnrollmentRepository,
        lesson_progress::LessonProgressRepository, subscriptions::SubscriptionRepository,
    },
    infrastructure::{
        axum_http::{auth::AuthUser, error_responses::AppError},
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                courses::CoursePostgres, enrollments::EnrollmentPostgres,
                lesson_progress::LessonProgressPostgres, subscriptions::SubscriptionPostgres,
            },
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let dashboard_usecase = DashboardUseCase::new(
        Arc::new(CoursePostgres::new(Arc::clone(&db_pool))),
        Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(LessonProgressPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route("/", get(overview))
        .route("/courses", get(my_courses))
        .route("/courses/:course_id", get(enrolled_course))
        .route("/subscription", get(subscription))
        .with_state(Arc::new(dashboard_usecase))
}

pub async fn overview<C, E, L, S>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<C, E, L, S>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    let overview = dashboard_usecase.overview(user_id).await?;
    Ok(Json(overview))
}

pub async fn my_courses<C, E, L, S>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<C, E, L, S>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    let courses = dashboard_usecase.my_courses(user_id).await?;
    Ok(Json(courses))
}

pub async fn enrolled_course<C, E, L, S>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<C, E, L, S>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    let detail = dashboard_usecase.enrolled_course(user_id, course_id).await?;
    Ok(Json(detail))
}

pub async fn subscription<C, E, L, S>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<C, E, L, S>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    let overview = dashboard_usecase.subscription(user_id).await?;
    Ok(Json(overview))
}
