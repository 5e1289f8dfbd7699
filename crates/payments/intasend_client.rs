use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::value_objects::{
    enums::{
        payment_outcomes::PaymentOutcome, payment_providers::PaymentProvider,
        product_types::ProductType,
    },
    payment_events::{CheckoutExtra, PaymentEvent},
};

use super::WebhookRejection;

/// Mobile-money collection client built on reqwest.
///
/// Constructed once at startup from validated configuration and passed in
/// explicitly wherever it is needed; a missing credential is a startup
/// failure, not a silently-null client.
pub struct IntaSendClient {
    http: reqwest::Client,
    api_base: String,
    publishable_key: String,
    secret_key: String,
    webhook_challenge: String,
}

/// Request body for the hosted-checkout charge call.
#[derive(Debug, Serialize)]
pub struct ChargeRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub host: String,
    pub amount: f64,
    pub currency: String,
    pub api_ref: String,
    pub redirect_url: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ChargeResponse {
    pub id: Option<String>,
    pub url: String,
    pub api_ref: Option<String>,
}

/// Webhook wire shape. The provider posts the same body for every state
/// transition; `extra` is the optional structured side channel set up at
/// checkout time.
#[derive(Debug, Clone, Deserialize)]
pub struct IntaSendWebhookPayload {
    pub invoice_id: String,
    pub state: String,
    pub provider: Option<String>,
    pub net_amount: String,
    pub currency: String,
    pub value: Option<String>,
    pub account: Option<String>,
    pub api_ref: String,
    pub failed_reason: Option<String>,
    pub failed_code: Option<String>,
    pub challenge: String,
    pub extra: Option<IntaSendExtra>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntaSendExtra {
    pub product_id: Option<String>,
    pub product_title: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl IntaSendClient {
    pub fn new(
        api_base: String,
        publishable_key: String,
        secret_key: String,
        webhook_challenge: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_base,
            publishable_key,
            secret_key,
            webhook_challenge,
        })
    }

    /// Creates a hosted checkout and returns the redirect URL.
    pub async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse> {
        let resp = self
            .http
            .post(format!("{}/api/v1/checkout/", self.api_base))
            .header("X-IntaSend-Public-API-Key", &self.publishable_key)
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = %status,
                response_body = %body,
                api_ref = %request.api_ref,
                "intasend charge request failed"
            );
            anyhow::bail!("IntaSend charge request failed (status {})", status);
        }

        Ok(resp.json().await?)
    }

    /// Verifies the shared-secret challenge and converts the provider wire
    /// shape into a canonical [`PaymentEvent`].
    ///
    /// The challenge is a plain string equality check, which is all this
    /// provider offers; it is a weaker guarantee than the card provider's
    /// request signature.
    pub fn verify_and_normalize(
        &self,
        payload: IntaSendWebhookPayload,
    ) -> Result<PaymentEvent, WebhookRejection> {
        if payload.challenge != self.webhook_challenge {
            return Err(WebhookRejection::ChallengeInvalid);
        }

        let outcome = match payload.state.as_str() {
            "PENDING" => PaymentOutcome::Pending,
            "PROCESSING" => PaymentOutcome::Processing,
            "COMPLETE" => PaymentOutcome::Succeeded,
            "FAILED" => PaymentOutcome::Failed,
            other => {
                return Err(WebhookRejection::UnrecognizedEventKind(other.to_string()));
            }
        };

        // The settled amount is trusted as the provider reports it.
        let net_amount = payload.net_amount.parse::<f64>().map_err(|_| {
            WebhookRejection::MalformedPayload(format!(
                "net_amount is not numeric: {}",
                payload.net_amount
            ))
        })?;

        let extra = payload.extra.map(|extra| CheckoutExtra {
            product_type: extra.type_.as_deref().and_then(ProductType::from_tag),
            product_id: extra.product_id,
            product_title: extra.product_title,
            user_id: extra.user_id,
        });

        Ok(PaymentEvent {
            provider: PaymentProvider::MobileMoney,
            external_payment_id: payload.invoice_id,
            outcome,
            reference: payload.api_ref,
            net_amount,
            currency: payload.currency,
            extra,
            failure_reason: payload.failed_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> IntaSendClient {
        IntaSendClient::new(
            "https://sandbox.intasend.com".to_string(),
            "ISPubKey_test".to_string(),
            "ISSecretKey_test".to_string(),
            "enroll-challenge".to_string(),
            Duration::from_secs(5),
        )
        .expect("client must build")
    }

    fn payload(state: &str, challenge: &str) -> IntaSendWebhookPayload {
        IntaSendWebhookPayload {
            invoice_id: "INV-0042".to_string(),
            state: state.to_string(),
            provider: Some("M-PESA".to_string()),
            net_amount: "2000.00".to_string(),
            currency: "KES".to_string(),
            value: None,
            account: None,
            api_ref: "masterclass-mc42-user_1-1700000000001".to_string(),
            failed_reason: None,
            failed_code: None,
            challenge: challenge.to_string(),
            extra: None,
        }
    }

    #[test]
    fn rejects_challenge_mismatch() {
        let err = client()
            .verify_and_normalize(payload("COMPLETE", "wrong"))
            .unwrap_err();
        assert!(matches!(err, WebhookRejection::ChallengeInvalid));
        assert_eq!(err.status_code().as_u16(), 401);
    }

    #[test]
    fn maps_every_known_state() {
        let cases = [
            ("PENDING", PaymentOutcome::Pending),
            ("PROCESSING", PaymentOutcome::Processing),
            ("COMPLETE", PaymentOutcome::Succeeded),
            ("FAILED", PaymentOutcome::Failed),
        ];

        for (state, expected) in cases {
            let event = client()
                .verify_and_normalize(payload(state, "enroll-challenge"))
                .expect("known state normalizes");
            assert_eq!(event.outcome, expected, "state {state}");
            assert_eq!(event.provider, PaymentProvider::MobileMoney);
        }
    }

    #[test]
    fn rejects_unknown_state() {
        let err = client()
            .verify_and_normalize(payload("REVERSED", "enroll-challenge"))
            .unwrap_err();
        assert!(matches!(err, WebhookRejection::UnrecognizedEventKind(_)));
    }

    #[test]
    fn parses_net_amount_from_provider_string() {
        let event = client()
            .verify_and_normalize(payload("COMPLETE", "enroll-challenge"))
            .unwrap();
        assert_eq!(event.net_amount, 2000.0);
        assert_eq!(event.currency, "KES");
        assert_eq!(event.external_payment_id, "INV-0042");
    }

    #[test]
    fn rejects_non_numeric_net_amount() {
        let mut bad = payload("COMPLETE", "enroll-challenge");
        bad.net_amount = "two thousand".to_string();
        let err = client().verify_and_normalize(bad).unwrap_err();
        assert!(matches!(err, WebhookRejection::MalformedPayload(_)));
    }

    #[test]
    fn carries_extra_side_channel_through() {
        let mut with_extra = payload("COMPLETE", "enroll-challenge");
        with_extra.extra = Some(IntaSendExtra {
            product_id: Some("mc42".to_string()),
            product_title: Some("Advanced Rust".to_string()),
            user_id: Some("user_1".to_string()),
            type_: Some("masterclass".to_string()),
        });

        let event = client().verify_and_normalize(with_extra).unwrap();
        let extra = event.extra.expect("extra should survive normalization");
        assert_eq!(extra.product_type, Some(ProductType::Masterclass));
        assert_eq!(extra.product_id.as_deref(), Some("mc42"));
        assert_eq!(extra.product_title.as_deref(), Some("Advanced Rust"));
        assert_eq!(extra.user_id.as_deref(), Some("user_1"));
    }
}
