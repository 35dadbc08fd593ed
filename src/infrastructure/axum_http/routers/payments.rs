use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        interfaces::payment_gateway::PaymentGateway,
        usecases::{
            checkout::{CheckoutSettings, CheckoutUseCase},
            reconciliation::ReconciliationUseCase,
        },
    },
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{
            courses::CourseRepository, enrollments::EnrollmentRepository,
            payments::PaymentRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::reconciliation::ReconcileResponseDto,
    },
    infrastructure::{
        axum_http::{
            auth::{AuthUser, MaybeAuthUser},
            error_responses::AppError,
        },
        payments::stripe_client::StripeClient,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                courses::CoursePostgres, enrollments::EnrollmentPostgres,
                payments::PaymentPostgres, subscriptions::SubscriptionPostgres,
            },
        },
    },
};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    session_id: Option<String>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    config: Arc<DotEnvyConfig>,
    payment_gateway: Arc<StripeClient>,
) -> Router {
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));

    let checkout_usecase = CheckoutUseCase::new(
        Arc::new(CoursePostgres::new(Arc::clone(&db_pool))),
        Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&payment_repository),
        Arc::clone(&payment_gateway),
        CheckoutSettings {
            public_base_url: config.checkout.public_base_url.clone(),
            currency: config.checkout.currency.clone(),
        },
    );
    let reconciliation_usecase = ReconciliationUseCase::new(payment_repository, payment_gateway);

    let checkout = Router::new()
        .route("/courses/:course_id/checkout", post(course_checkout))
        .route("/subscriptions/:plan/checkout", post(subscription_checkout))
        .route("/cancel", get(cancel))
        .with_state(Arc::new(checkout_usecase));

    let reconciliation = Router::new()
        .route("/success", get(success))
        .route("/webhook", post(webhook))
        .with_state(Arc::new(reconciliation_usecase));

    checkout.merge(reconciliation)
}

pub async fn course_checkout<C, E, S, P, G>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<C, E, S, P, G>>>,
    AuthUser { user_id, email }: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let checkout = checkout_usecase
        .course_checkout(user_id, email, course_id)
        .await?;
    Ok(Json(checkout))
}

pub async fn subscription_checkout<C, E, S, P, G>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<C, E, S, P, G>>>,
    AuthUser { user_id, email }: AuthUser,
    Path(plan): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let checkout = checkout_usecase
        .subscription_checkout(user_id, email, plan)
        .await?;
    Ok(Json(checkout))
}

pub async fn cancel(viewer: MaybeAuthUser) -> impl IntoResponse {
    info!(viewer = ?viewer.user_id(), "payments: checkout cancelled by user");
    Json(json!({
        "cancelled": true,
        "message": "Payment was cancelled.",
    }))
}

pub async fn success<P, G>(
    State(reconciliation_usecase): State<Arc<ReconciliationUseCase<P, G>>>,
    viewer: MaybeAuthUser,
    Query(query): Query<SuccessQuery>,
) -> Result<impl IntoResponse, AppError>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let session_id = query.session_id.unwrap_or_default();
    info!(
        viewer = ?viewer.user_id(),
        %session_id,
        "payments: success redirect received"
    );

    let outcome = reconciliation_usecase.reconcile_session(session_id).await?;
    Ok(Json(ReconcileResponseDto::from(outcome)))
}

pub async fn webhook<P, G>(
    State(reconciliation_usecase): State<Arc<ReconciliationUseCase<P, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let signature_header = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let ack = reconciliation_usecase
        .handle_webhook(body.to_vec(), signature_header)
        .await?;
    Ok(Json(ack))
}
