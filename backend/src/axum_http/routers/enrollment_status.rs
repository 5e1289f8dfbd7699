use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use crates::{
    domain::{
        repositories::{enrollments::EnrollmentRepository, students::StudentRepository},
        value_objects::enums::product_types::ProductType,
    },
    infra::sanity::repositories::{enrollments::EnrollmentSanity, students::StudentSanity},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::OptionalAuthUser;
use crate::axum_http::http_serve::AppClients;
use crate::usecases::enrollment_status::EnrollmentStatusUseCase;

pub fn routes(clients: Arc<AppClients>) -> Router {
    let student_repo = Arc::new(StudentSanity::new(Arc::clone(&clients.sanity)));
    let enrollment_repo = Arc::new(EnrollmentSanity::new(Arc::clone(&clients.sanity)));
    let usecase = EnrollmentStatusUseCase::new(student_repo, enrollment_repo);

    Router::new()
        .route("/status", get(check_enrollment_status))
        .with_state(Arc::new(usecase))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub product_type: String,
    pub product_id: String,
}

pub async fn check_enrollment_status<S, E>(
    State(usecase): State<Arc<EnrollmentStatusUseCase<S, E>>>,
    OptionalAuthUser(user): OptionalAuthUser,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: StudentRepository + Send + Sync,
    E: EnrollmentRepository + Send + Sync,
{
    let Some(product_type) = ProductType::from_tag(&query.product_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unknown product type" })),
        )
            .into_response();
    };

    if query.product_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "product id is required" })),
        )
            .into_response();
    }

    let enrolled = usecase
        .check(
            user.as_ref().map(|user| user.external_id.as_str()),
            product_type,
            &query.product_id,
        )
        .await;

    Json(json!({ "isEnrolled": enrolled })).into_response()
}
