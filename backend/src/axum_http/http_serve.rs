use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::{
        calendar::google_calendar::GoogleCalendarCatalog, email::resend_client::ResendClient,
        sanity::sanity_client::SanityClient,
    },
    payments::{intasend_client::IntaSendClient, stripe_client::StripeClient},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Every outbound client, constructed once at startup from validated
/// config. Routers clone what they need; nothing is built lazily.
pub struct AppClients {
    pub config: Arc<DotEnvyConfig>,
    pub sanity: Arc<SanityClient>,
    pub calendar: Arc<GoogleCalendarCatalog>,
    pub intasend: Arc<IntaSendClient>,
    pub stripe: Arc<StripeClient>,
    pub email: Arc<ResendClient>,
}

pub async fn start(config: Arc<DotEnvyConfig>, clients: Arc<AppClients>) -> Result<()> {
    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/webhooks/intasend",
            routers::intasend_webhook::routes(Arc::clone(&clients)),
        )
        .nest(
            "/api/v1/webhooks/stripe",
            routers::stripe_webhook::routes(Arc::clone(&clients)),
        )
        .nest(
            "/api/v1/enrollments",
            routers::enrollment_status::routes(Arc::clone(&clients)),
        )
        .nest(
            "/api/v1/checkout",
            routers::checkout::routes(Arc::clone(&clients)),
        )
        .nest(
            "/api/v1/masterclasses",
            routers::masterclasses::routes(Arc::clone(&clients)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any), // TODO Add the domain later
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdow_signal())
        .await?;

    Ok(())
}

async fn shutdow_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
