use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use crates::{
    domain::repositories::{
        catalog::MasterclassCatalog, enrollments::EnrollmentRepository, invites::InviteSender,
        students::StudentRepository,
    },
    infra::sanity::repositories::{enrollments::EnrollmentSanity, students::StudentSanity},
    payments::{WebhookRejection, stripe_client::StripeClient},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::axum_http::http_serve::AppClients;
use crate::usecases::reconciliation::ReconciliationUseCase;

pub struct StripeWebhookState<S, E, M, I>
where
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    M: MasterclassCatalog + Send + Sync + 'static,
    I: InviteSender + Send + Sync + 'static,
{
    pub client: Arc<StripeClient>,
    pub usecase: Arc<ReconciliationUseCase<S, E, M, I>>,
}

pub fn routes(clients: Arc<AppClients>) -> Router {
    let student_repo = Arc::new(StudentSanity::new(Arc::clone(&clients.sanity)));
    let enrollment_repo = Arc::new(EnrollmentSanity::new(Arc::clone(&clients.sanity)));
    let usecase = ReconciliationUseCase::new(
        student_repo,
        enrollment_repo,
        Arc::clone(&clients.calendar),
        Arc::clone(&clients.email),
    );

    let state = Arc::new(StripeWebhookState {
        client: Arc::clone(&clients.stripe),
        usecase: Arc::new(usecase),
    });

    Router::new()
        .route("/", post(handle_stripe_webhook))
        .with_state(state)
}

pub async fn handle_stripe_webhook<S, E, M, I>(
    State(state): State<Arc<StripeWebhookState<S, E, M, I>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: StudentRepository + Send + Sync,
    E: EnrollmentRepository + Send + Sync,
    M: MasterclassCatalog + Send + Sync,
    I: InviteSender + Send + Sync,
{
    let delivery_id = Uuid::new_v4();

    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        warn!(%delivery_id, "card webhook arrived without a signature header");
        return (StatusCode::BAD_REQUEST, "No signature found").into_response();
    };

    let event = match state.client.verify_webhook_signature(&body, signature) {
        Ok(event) => event,
        Err(rejection) => {
            warn!(
                %delivery_id,
                status = rejection.status_code().as_u16(),
                error = %rejection,
                "card webhook signature rejected"
            );
            return (rejection.status_code(), rejection.to_string()).into_response();
        }
    };

    info!(%delivery_id, event_type = %event.type_, "card webhook verified");

    let payment_event = match StripeClient::normalize_checkout_event(&event) {
        Ok(payment_event) => payment_event,
        // Only the checkout completion event carries payment semantics;
        // every other kind is acknowledged so the provider stops resending.
        Err(WebhookRejection::UnrecognizedEventKind(kind)) => {
            debug!(%delivery_id, event_type = %kind, "card webhook event kind ignored");
            return StatusCode::OK.into_response();
        }
        Err(rejection) => {
            warn!(
                %delivery_id,
                status = rejection.status_code().as_u16(),
                error = %rejection,
                "card webhook payload rejected"
            );
            return (rejection.status_code(), rejection.to_string()).into_response();
        }
    };

    match state.usecase.handle_event(payment_event).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!(%delivery_id, error = %err, "card webhook processing failed");
            } else {
                warn!(%delivery_id, status = status.as_u16(), error = %err, "card webhook not processable");
            }
            (status, err.to_string()).into_response()
        }
    }
}
