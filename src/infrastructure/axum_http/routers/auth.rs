use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    application::usecases::auth::{AuthUseCase, SessionKeys},
    domain::{
        repositories::users::UserRepository,
        value_objects::users::{LoginModel, RegisterUserModel, UpdateProfileModel},
    },
    infrastructure::{
        axum_http::{auth::AuthUser, error_responses::AppError},
        postgres::{postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, session_keys: Arc<SessionKeys>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let auth_usecase = AuthUseCase::new(Arc::new(user_repository), session_keys);

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile).patch(update_profile))
        .with_state(Arc::new(auth_usecase))
}

pub async fn register<U>(
    State(auth_usecase): State<Arc<AuthUseCase<U>>>,
    Json(register_user_model): Json<RegisterUserModel>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let token = auth_usecase.register(register_user_model).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn login<U>(
    State(auth_usecase): State<Arc<AuthUseCase<U>>>,
    Json(login_model): Json<LoginModel>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let token = auth_usecase.login(login_model).await?;
    Ok(Json(token))
}

pub async fn profile<U>(
    State(auth_usecase): State<Arc<AuthUseCase<U>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let user = auth_usecase.profile(user_id).await?;
    Ok(Json(user))
}

pub async fn update_profile<U>(
    State(auth_usecase): State<Arc<AuthUseCase<U>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(update_profile_model): Json<UpdateProfileModel>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let user = auth_usecase
        .update_profile(user_id, update_profile_model)
        .await?;
    Ok(Json(user))
}
