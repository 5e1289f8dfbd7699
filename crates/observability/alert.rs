use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use url::Url;

use super::config::ServiceContext;

/// One captured error event, flattened for the alert channel.
pub(crate) struct AlertEvent {
    pub(crate) level: String,
    pub(crate) target: String,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
}

/// Posts error events to a chat webhook. Delivery is best-effort: a failed
/// alert is itself only worth a log line.
#[derive(Clone)]
pub(crate) struct AlertWebhook {
    webhook_url: Url,
    client: Client,
}

impl AlertWebhook {
    pub(crate) fn new(webhook_url: Url) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .expect("reqwest client must build");

        Self {
            webhook_url,
            client,
        }
    }

    fn format_content(context: &ServiceContext, event: &AlertEvent) -> String {
        let mut lines = vec![format!(
            "**{}** `{}` `{}` `{}`",
            context.service_name, context.environment, context.component, event.level
        )];

        lines.push(format!("`{}`", event.target));

        if let Some(message) = event.message.as_ref().filter(|m| !m.trim().is_empty()) {
            lines.push(format!("> {}", message.trim()));
        }

        for (key, value) in &event.fields {
            lines.push(format!("- `{key}` = `{value}`"));
        }

        truncate(lines.join("\n"))
    }

    pub(crate) async fn send(&self, context: &ServiceContext, event: &AlertEvent) -> Result<()> {
        let content = Self::format_content(context, event);

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("alert webhook request timed out")
                } else {
                    anyhow!("alert webhook request failed")
                }
            })?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "alert webhook returned non-success status: {}",
            response.status()
        ))
    }
}

// Chat webhooks cap message length; keep alerts comfortably under it.
fn truncate(mut content: String) -> String {
    const LIMIT: usize = 2000;
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= LIMIT {
        return content;
    }

    let allowed = LIMIT.saturating_sub(SUFFIX.chars().count());
    let truncated: String = content.chars().take(allowed).collect();
    content.clear();
    content.push_str(&truncated);
    content.push_str(SUFFIX);
    content
}
