use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use crates::{
    domain::{
        repositories::{
            catalog::MasterclassCatalog, enrollments::EnrollmentRepository,
            invites::InviteSender, students::StudentRepository,
        },
        value_objects::enums::payment_outcomes::PaymentOutcome,
    },
    infra::sanity::repositories::{enrollments::EnrollmentSanity, students::StudentSanity},
    payments::intasend_client::{IntaSendClient, IntaSendWebhookPayload},
};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::axum_http::http_serve::AppClients;
use crate::usecases::reconciliation::{ReconciliationOutcome, ReconciliationUseCase};

pub struct IntaSendWebhookState<S, E, M, I>
where
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    M: MasterclassCatalog + Send + Sync + 'static,
    I: InviteSender + Send + Sync + 'static,
{
    pub client: Arc<IntaSendClient>,
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

    let state = Arc::new(IntaSendWebhookState {
        client: Arc::clone(&clients.intasend),
        usecase: Arc::new(usecase),
    });

    Router::new()
        .route("/", post(handle_intasend_webhook))
        .with_state(state)
}

pub async fn handle_intasend_webhook<S, E, M, I>(
    State(state): State<Arc<IntaSendWebhookState<S, E, M, I>>>,
    Json(payload): Json<IntaSendWebhookPayload>,
) -> Response
where
    S: StudentRepository + Send + Sync,
    E: EnrollmentRepository + Send + Sync,
    M: MasterclassCatalog + Send + Sync,
    I: InviteSender + Send + Sync,
{
    let delivery_id = Uuid::new_v4();
    info!(
        %delivery_id,
        invoice_id = %payload.invoice_id,
        state = %payload.state,
        api_ref = %payload.api_ref,
        amount = %payload.net_amount,
        currency = %payload.currency,
        "mobile money webhook received"
    );

    let event = match state.client.verify_and_normalize(payload) {
        Ok(event) => event,
        Err(rejection) => {
            warn!(
                %delivery_id,
                status = rejection.status_code().as_u16(),
                error = %rejection,
                "mobile money webhook rejected at the boundary"
            );
            return (rejection.status_code(), rejection.to_string()).into_response();
        }
    };

    match state.usecase.handle_event(event).await {
        Ok(outcome) => {
            let body = match outcome {
                ReconciliationOutcome::Ignored {
                    outcome: PaymentOutcome::Failed,
                } => json!({ "success": true, "message": "Failed payment logged" }),
                ReconciliationOutcome::Ignored { outcome } => {
                    json!({ "success": true, "message": format!("State {outcome} acknowledged") })
                }
                ReconciliationOutcome::Enrolled { .. }
                | ReconciliationOutcome::AlreadyEnrolled { .. } => json!({ "success": true }),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!(%delivery_id, error = %err, "mobile money webhook processing failed");
            } else {
                warn!(%delivery_id, status = status.as_u16(), error = %err, "mobile money webhook not processable");
            }
            (status, err.to_string()).into_response()
        }
    }
}
