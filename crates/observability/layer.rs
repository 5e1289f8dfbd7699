use std::collections::BTreeMap;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use super::alert::{AlertEvent, AlertWebhook};
use super::config::ServiceContext;

/// Forwards matching events to the alert webhook. Sending happens on a
/// spawned task so the hot path never waits on the network; outside a
/// runtime (unit tests) the event is simply dropped.
#[derive(Clone)]
pub(crate) struct ErrorAlertLayer {
    webhook: AlertWebhook,
    service_context: ServiceContext,
}

impl ErrorAlertLayer {
    pub(crate) fn new(webhook: AlertWebhook, service_context: ServiceContext) -> Self {
        Self {
            webhook,
            service_context,
        }
    }
}

#[derive(Default)]
struct FieldMapVisitor {
    values: BTreeMap<String, String>,
}

impl Visit for FieldMapVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.values
            .insert(field.name().to_string(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.values
            .insert(field.name().to_string(), value.to_string());
    }
}

impl<S> Layer<S> for ErrorAlertLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldMapVisitor::default();
        event.record(&mut visitor);

        let message = visitor.values.remove("message");

        let alert_event = AlertEvent {
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message,
            fields: visitor.values,
        };

        let webhook = self.webhook.clone();
        let context = self.service_context.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = webhook.send(&context, &alert_event).await {
                    eprintln!("failed to deliver alert webhook: {err}");
                }
            });
        }
    }
}
