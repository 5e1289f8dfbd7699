use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use crate::domain::value_objects::{
    enums::{
        payment_outcomes::PaymentOutcome, payment_providers::PaymentProvider,
        product_types::ProductType,
    },
    payment_events::{CheckoutExtra, PaymentEvent},
};

use super::WebhookRejection;

type HmacSha256 = Hmac<Sha256>;

/// Minimal card-provider client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub customer: Option<String>,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            secret_key,
            webhook_secret,
        })
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!("Stripe API request failed: {} (status {})", context, status);
    }

    /// Creates a Checkout Session and returns its URL. The metadata map is
    /// round-tripped verbatim onto the session and comes back in the
    /// completion webhook.
    pub async fn create_checkout_session(
        &self,
        name: &str,
        amount_minor: i64,
        currency: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        // Stripe Checkout docs:
        // https://stripe.com/docs/payments/checkout
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                name.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                amount_minor.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        for (key, value) in metadata {
            body.push((format!("metadata[{}]", key), value));
        }

        let resp = self
            .http
            .post("https://api.stripe.com/v1/checkout/sessions")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))
    }

    /// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookRejection> {
        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest.to_string());
            }
        }

        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(WebhookRejection::SignatureInvalid);
        };

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| WebhookRejection::SignatureInvalid)?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature).map_err(|_| WebhookRejection::SignatureInvalid)?;

        if expected[..] != provided[..] {
            return Err(WebhookRejection::SignatureInvalid);
        }

        serde_json::from_slice(payload)
            .map_err(|err| WebhookRejection::MalformedPayload(err.to_string()))
    }

    /// Converts a verified event into a canonical [`PaymentEvent`].
    ///
    /// Only `checkout.session.completed` carries payment semantics here;
    /// every other kind is reported as unrecognized so the boundary can
    /// acknowledge it without touching the engine. The session metadata is
    /// the identifier source (this provider round-trips arbitrary
    /// key/values, so no reference decoding is needed), with the `api_ref`
    /// still carried as the fallback correlation handle.
    pub fn normalize_checkout_event(event: &StripeEvent) -> Result<PaymentEvent, WebhookRejection> {
        if event.type_ != "checkout.session.completed" {
            return Err(WebhookRejection::UnrecognizedEventKind(event.type_.clone()));
        }

        let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone())
            .map_err(|err| WebhookRejection::MalformedPayload(err.to_string()))?;

        let metadata = session.metadata.clone().unwrap_or_default();

        let is_masterclass = metadata.get("type").map(String::as_str) == Some("masterclass");
        let product_type = if is_masterclass {
            ProductType::Masterclass
        } else {
            ProductType::Course
        };

        let product_id = if is_masterclass {
            metadata.get("masterclass_id").cloned()
        } else {
            metadata.get("courseId").cloned()
        };
        let user_id = metadata
            .get("userId")
            .or_else(|| metadata.get("user_id"))
            .cloned();

        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return Err(WebhookRejection::MalformedPayload(
                "missing user id in session metadata".to_string(),
            ));
        };
        let Some(product_id) = product_id.filter(|id| !id.is_empty()) else {
            return Err(WebhookRejection::MalformedPayload(format!(
                "missing {} id in session metadata",
                product_type
            )));
        };

        let session_id = session
            .id
            .clone()
            .ok_or_else(|| WebhookRejection::MalformedPayload("missing session id".to_string()))?;

        // amount_total is in minor units.
        let net_amount = session.amount_total.unwrap_or(0) as f64 / 100.0;
        let currency = session
            .currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "USD".to_string());

        Ok(PaymentEvent {
            provider: PaymentProvider::Card,
            external_payment_id: session_id,
            outcome: PaymentOutcome::Succeeded,
            reference: metadata.get("api_ref").cloned().unwrap_or_default(),
            net_amount,
            currency,
            extra: Some(CheckoutExtra {
                product_type: Some(product_type),
                product_id: Some(product_id),
                product_title: metadata.get("masterclass_title").cloned(),
                user_id: Some(user_id),
            }),
            failure_reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WEBHOOK_SECRET: &str = "whsec_test123secret456";

    fn client() -> StripeClient {
        StripeClient::new(
            "sk_test_xxx".to_string(),
            WEBHOOK_SECRET.to_string(),
            Duration::from_secs(5),
        )
        .expect("client must build")
    }

    fn sign(payload: &[u8], secret: &str, timestamp: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn session_event(metadata: serde_json::Value) -> StripeEvent {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "mode": "payment",
                    "amount_total": 5000,
                    "currency": "usd",
                    "metadata": metadata,
                }
            }
        });
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let timestamp = "1700000000";
        let signature = sign(payload, WEBHOOK_SECRET, timestamp);
        let header = format!("t={},v1={}", timestamp, signature);

        let event = client()
            .verify_webhook_signature(payload, &header)
            .expect("valid signature should verify");
        assert_eq!(event.type_, "checkout.session.completed");
    }

    #[test]
    fn rejects_wrong_secret_signature() {
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let timestamp = "1700000000";
        let signature = sign(payload, "wrong_secret", timestamp);
        let header = format!("t={},v1={}", timestamp, signature);

        let err = client()
            .verify_webhook_signature(payload, &header)
            .unwrap_err();
        assert!(matches!(err, WebhookRejection::SignatureInvalid));
    }

    #[test]
    fn rejects_header_without_v1_part() {
        let err = client()
            .verify_webhook_signature(b"{}", "t=1700000000")
            .unwrap_err();
        assert!(matches!(err, WebhookRejection::SignatureInvalid));
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let timestamp = "1700000000";
        let signature = sign(payload, WEBHOOK_SECRET, timestamp);
        let header = format!("t={},v1={}", timestamp, signature);

        let err = client()
            .verify_webhook_signature(b"{\"tampered\":true}", &header)
            .unwrap_err();
        assert!(matches!(err, WebhookRejection::SignatureInvalid));
    }

    #[test]
    fn normalizes_masterclass_session() {
        let event = session_event(json!({
            "type": "masterclass",
            "masterclass_id": "mc42",
            "masterclass_title": "Advanced Rust",
            "user_id": "user_1",
            "api_ref": "masterclass-mc42-user_1-1700000000001",
        }));

        let normalized = StripeClient::normalize_checkout_event(&event).unwrap();
        assert_eq!(normalized.provider, PaymentProvider::Card);
        assert_eq!(normalized.outcome, PaymentOutcome::Succeeded);
        assert_eq!(normalized.external_payment_id, "cs_test_123");
        assert_eq!(normalized.net_amount, 50.0);
        assert_eq!(normalized.currency, "USD");

        let extra = normalized.extra.unwrap();
        assert_eq!(extra.product_type, Some(ProductType::Masterclass));
        assert_eq!(extra.product_id.as_deref(), Some("mc42"));
        assert_eq!(extra.product_title.as_deref(), Some("Advanced Rust"));
        assert_eq!(extra.user_id.as_deref(), Some("user_1"));
    }

    #[test]
    fn normalizes_course_session_with_camel_case_user_key() {
        let event = session_event(json!({
            "courseId": "abc123",
            "userId": "user_9f8e7d",
        }));

        let normalized = StripeClient::normalize_checkout_event(&event).unwrap();
        let extra = normalized.extra.unwrap();
        assert_eq!(extra.product_type, Some(ProductType::Course));
        assert_eq!(extra.product_id.as_deref(), Some("abc123"));
        assert_eq!(extra.user_id.as_deref(), Some("user_9f8e7d"));
    }

    #[test]
    fn masterclass_session_without_id_is_malformed() {
        let event = session_event(json!({
            "type": "masterclass",
            "user_id": "user_1",
        }));

        let err = StripeClient::normalize_checkout_event(&event).unwrap_err();
        assert!(matches!(err, WebhookRejection::MalformedPayload(_)));
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[test]
    fn session_without_user_id_is_malformed() {
        let event = session_event(json!({ "courseId": "abc123" }));
        let err = StripeClient::normalize_checkout_event(&event).unwrap_err();
        assert!(matches!(err, WebhookRejection::MalformedPayload(_)));
    }

    #[test]
    fn other_event_kinds_are_unrecognized() {
        let payload = json!({
            "id": "evt_2",
            "type": "invoice.payment_succeeded",
            "data": { "object": {} }
        });
        let event: StripeEvent = serde_json::from_value(payload).unwrap();

        let err = StripeClient::normalize_checkout_event(&event).unwrap_err();
        assert!(matches!(err, WebhookRejection::UnrecognizedEventKind(_)));
    }
}
