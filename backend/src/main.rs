use anyhow::Result;
use backend::axum_http::http_serve::{self, AppClients};
use backend::config::config_loader;
use crates::infra::{
    calendar::google_calendar::GoogleCalendarCatalog, email::resend_client::ResendClient,
    sanity::sanity_client::SanityClient,
};
use crates::payments::{intasend_client::IntaSendClient, stripe_client::StripeClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let outbound_timeout = Duration::from_secs(dotenvy_env.backend_server.outbound_timeout);

    let sanity = Arc::new(SanityClient::new(
        dotenvy_env.sanity.project_id.clone(),
        dotenvy_env.sanity.dataset.clone(),
        dotenvy_env.sanity.token.clone(),
        outbound_timeout,
    )?);
    let calendar = Arc::new(GoogleCalendarCatalog::new(
        dotenvy_env.calendar.calendar_id.clone(),
        dotenvy_env.calendar.service_account_email.clone(),
        dotenvy_env.calendar.private_key.clone(),
        outbound_timeout,
    )?);
    let intasend = Arc::new(IntaSendClient::new(
        dotenvy_env.intasend.api_base.clone(),
        dotenvy_env.intasend.publishable_key.clone(),
        dotenvy_env.intasend.secret_key.clone(),
        dotenvy_env.intasend.webhook_challenge.clone(),
        outbound_timeout,
    )?);
    let stripe = Arc::new(StripeClient::new(
        dotenvy_env.stripe.secret_key.clone(),
        dotenvy_env.stripe.webhook_secret.clone(),
        outbound_timeout,
    )?);
    let email = Arc::new(ResendClient::new(
        dotenvy_env.email.api_key.clone(),
        dotenvy_env.email.from_name.clone(),
        dotenvy_env.email.from_email.clone(),
        outbound_timeout,
    )?);
    info!("Provider clients have been constructed");

    let config = Arc::new(dotenvy_env);
    let clients = Arc::new(AppClients {
        config: Arc::clone(&config),
        sanity,
        calendar,
        intasend,
        stripe,
        email,
    });

    http_serve::start(config, clients).await?;

    Ok(())
}
