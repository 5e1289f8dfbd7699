pub mod intasend_client;
pub mod stripe_client;

use http::StatusCode;
use thiserror::Error;

/// Typed rejection produced at the normalization boundary. None of these
/// reach the reconciliation engine; the webhook routers translate them
/// straight to an HTTP status.
#[derive(Debug, Error)]
pub enum WebhookRejection {
    #[error("webhook signature verification failed")]
    SignatureInvalid,

    #[error("webhook challenge verification failed")]
    ChallengeInvalid,

    #[error("unrecognized event kind: {0}")]
    UnrecognizedEventKind(String),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
}

impl WebhookRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // The card provider's contract answers a bad signature with 400.
            WebhookRejection::SignatureInvalid => StatusCode::BAD_REQUEST,
            WebhookRejection::ChallengeInvalid => StatusCode::UNAUTHORIZED,
            WebhookRejection::UnrecognizedEventKind(_) => StatusCode::BAD_REQUEST,
            WebhookRejection::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}
