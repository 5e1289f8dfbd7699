mod alert;
mod config;
mod layer;

use anyhow::Result;
use config::ObservabilityConfig;
use layer::ErrorAlertLayer;
use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber: an env-filtered fmt layer plus,
/// when configured, an alert-webhook layer that forwards error events to an
/// operator channel.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = config.alert.as_ref().map(|alert| {
        ErrorAlertLayer::new(
            alert::AlertWebhook::new(alert.webhook_url.clone()),
            config.service_context.clone(),
        )
        .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
            alert.min_level,
        ))
    });

    // RUST_LOG overrides; the default keeps production at info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    info!(
        service = %config.service_context.service_name,
        environment = %config.service_context.environment,
        component = %config.service_context.component,
        alerts_enabled = config.alert.is_some(),
        "Observability initialized"
    );

    Ok(())
}
