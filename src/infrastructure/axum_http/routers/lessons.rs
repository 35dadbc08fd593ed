use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    application::usecases::progress::ProgressUseCase,
    domain::{
        repositories::{
            courses::CourseRepository, enrollments::EnrollmentRepository,
            lesson_progress::LessonProgressRepository,
        },
        value_objects::progress::RecordProgressModel,
    },
    infrastructure::{
        axum_http::{
            auth::{AuthUser, MaybeAuthUser},
            error_responses::AppError,
        },
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                courses::CoursePostgres, enrollments::EnrollmentPostgres,
                lesson_progress::LessonProgressPostgres,
            },
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let progress_usecase = ProgressUseCase::new(
        Arc::new(CoursePostgres::new(Arc::clone(&db_pool))),
        Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(LessonProgressPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route("/:lesson_id", get(open_lesson))
        .route("/:lesson_id/progress", post(record_progress))
        .with_state(Arc::new(progress_usecase))
}

pub async fn open_lesson<C, E, L>(
    State(progress_usecase): State<Arc<ProgressUseCase<C, E, L>>>,
    viewer: MaybeAuthUser,
    Path(lesson_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
{
    let view = progress_usecase
        .open_lesson(viewer.user_id(), lesson_id)
        .await?;
    Ok(Json(view))
}

pub async fn record_progress<C, E, L>(
    State(progress_usecase): State<Arc<ProgressUseCase<C, E, L>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(lesson_id): Path<Uuid>,
    Json(record_progress_model): Json<RecordProgressModel>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    L: LessonProgressRepository + Send + Sync + 'static,
{
    let snapshot = progress_usecase
        .record_progress(user_id, lesson_id, record_progress_model)
        .await?;
    Ok(Json(snapshot))
}
