use crate::{
    application::usecases::auth::SessionKeys,
    config::{config_model::DotEnvyConfig, stage::Stage},
    infrastructure::{
        axum_http::{default_routers, routers},
        payments::stripe_client::StripeClient,
        postgres::postgres_connection::PgPoolSquad,
    },
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub fn app(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<Router> {
    let session_keys = Arc::new(SessionKeys::new(
        config.session.jwt_secret.clone(),
        config.session.ttl_seconds,
    ));
    let payment_gateway = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
    ));

    let api = Router::new()
        .route("/health-check", get(default_routers::health_check))
        .nest(
            "/auth",
            routers::auth::routes(Arc::clone(&db_pool), Arc::clone(&session_keys)),
        )
        .nest("/courses", routers::courses::routes(Arc::clone(&db_pool)))
        .nest("/dashboard", routers::dashboard::routes(Arc::clone(&db_pool)))
        .nest("/lessons", routers::lessons::routes(Arc::clone(&db_pool)))
        .nest(
            "/payments",
            routers::payments::routes(
                Arc::clone(&db_pool),
                Arc::clone(&config),
                payment_gateway,
            ),
        );

    let app = Router::new()
        .nest("/api/v1", api)
        .fallback(default_routers::not_found)
        .layer(Extension(session_keys))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (config.server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(cors_layer(&config)?)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Outside production any origin may call the API; production only admits the public base URL.
fn cors_layer(config: &DotEnvyConfig) -> Result<CorsLayer> {
    let origin = match config.stage {
        Stage::Production => {
            let public_origin = config
                .checkout
                .public_base_url
                .origin()
                .ascii_serialization();
            AllowOrigin::exact(HeaderValue::from_str(&public_origin)?)
        }
        Stage::Local | Stage::Development => AllowOrigin::from(Any),
    };

    Ok(CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(origin))
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let app = app(Arc::clone(&config), db_pool)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(stage = %config.stage, "Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
