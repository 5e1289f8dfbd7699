use std::env;
use tracing::Level;
use url::Url;

#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone)]
pub(crate) struct AlertConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alert: Option<AlertConfig>,
    /// Parsing problems captured here so they can be logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = env_string("STAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let service_context = ServiceContext {
            service_name,
            environment,
            component,
        };

        let (alert, warnings) = alert_from_env();

        Self {
            service_context,
            alert,
            warnings,
        }
    }
}

fn alert_from_env() -> (Option<AlertConfig>, Vec<String>) {
    let mut warnings = Vec::new();

    let enabled = env_bool("ALERT_NOTIFY_ENABLED").unwrap_or(true);
    let webhook_url_raw = env_string("ALERT_WEBHOOK_URL").filter(|v| !v.is_empty());

    if !enabled {
        return (None, warnings);
    }

    let Some(raw) = webhook_url_raw else {
        return (None, warnings);
    };

    let webhook_url = match Url::parse(&raw) {
        Ok(url) => url,
        Err(err) => {
            warnings.push(format!("ALERT_WEBHOOK_URL is not a valid URL: {err}"));
            return (None, warnings);
        }
    };

    let min_level = match env_string("ALERT_MIN_LEVEL") {
        None => Level::ERROR,
        Some(raw) => match raw.to_ascii_uppercase().parse::<Level>() {
            Ok(level) => level,
            Err(_) => {
                warnings.push(format!(
                    "ALERT_MIN_LEVEL '{raw}' is not a tracing level, defaulting to ERROR"
                ));
                Level::ERROR
            }
        },
    };

    (
        Some(AlertConfig {
            webhook_url,
            min_level,
        }),
        warnings,
    )
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}
