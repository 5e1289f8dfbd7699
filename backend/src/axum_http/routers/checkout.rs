use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::{
            catalog::{CourseCatalog, MasterclassCatalog},
            enrollments::EnrollmentRepository,
            students::StudentRepository,
        },
        value_objects::enums::payment_providers::PaymentProvider,
    },
    infra::sanity::repositories::{
        courses::CourseSanity, enrollments::EnrollmentSanity, students::StudentSanity,
    },
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthUser;
use crate::axum_http::error_responses::AppError;
use crate::axum_http::http_serve::AppClients;
use crate::usecases::checkout::{
    CardGateway, CheckoutError, CheckoutUseCase, CheckoutUser, MobileMoneyGateway,
};

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::CourseNotFound | CheckoutError::MasterclassNotFound => {
                AppError::NotFound(err.to_string())
            }
            CheckoutError::PriceNotSet(_) => AppError::BadRequest(err.to_string()),
            CheckoutError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

pub fn routes(clients: Arc<AppClients>) -> Router {
    let course_catalog = Arc::new(CourseSanity::new(Arc::clone(&clients.sanity)));
    let student_repo = Arc::new(StudentSanity::new(Arc::clone(&clients.sanity)));
    let enrollment_repo = Arc::new(EnrollmentSanity::new(Arc::clone(&clients.sanity)));
    let usecase = CheckoutUseCase::new(
        course_catalog,
        Arc::clone(&clients.calendar),
        student_repo,
        enrollment_repo,
        Arc::clone(&clients.intasend),
        Arc::clone(&clients.stripe),
        clients.config.checkout.base_url.clone(),
    );

    Router::new()
        .route("/course", post(create_course_checkout))
        .route("/masterclass", post(create_masterclass_checkout))
        .with_state(Arc::new(usecase))
}

#[derive(Debug, Deserialize)]
pub struct CourseCheckoutRequest {
    pub course_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MasterclassCheckoutRequest {
    pub masterclass_id: String,
    /// `intasend` (default) or `stripe`.
    pub provider: Option<String>,
}

fn checkout_user(auth: AuthUser) -> Result<CheckoutUser, AppError> {
    let email = auth
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| AppError::BadRequest("user email is required for checkout".to_string()))?;

    Ok(CheckoutUser {
        external_id: auth.external_id,
        first_name: auth.first_name.unwrap_or_else(|| email.clone()),
        last_name: auth.last_name.unwrap_or_default(),
        email,
    })
}

fn parse_provider(raw: Option<&str>) -> Result<PaymentProvider, AppError> {
    match raw {
        None | Some("intasend") => Ok(PaymentProvider::MobileMoney),
        Some("stripe") => Ok(PaymentProvider::Card),
        Some(other) => Err(AppError::BadRequest(format!(
            "unknown payment provider: {other}"
        ))),
    }
}

pub async fn create_course_checkout<C, M, S, E, Mob, Card>(
    State(usecase): State<Arc<CheckoutUseCase<C, M, S, E, Mob, Card>>>,
    auth: AuthUser,
    Json(request): Json<CourseCheckoutRequest>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseCatalog + Send + Sync,
    M: MasterclassCatalog + Send + Sync,
    S: StudentRepository + Send + Sync,
    E: EnrollmentRepository + Send + Sync,
    Mob: MobileMoneyGateway + Send + Sync,
    Card: CardGateway + Send + Sync,
{
    let user = checkout_user(auth)?;
    let redirect = usecase
        .create_course_checkout(user, &request.course_id)
        .await?;

    Ok(Json(json!({ "url": redirect.url })))
}

pub async fn create_masterclass_checkout<C, M, S, E, Mob, Card>(
    State(usecase): State<Arc<CheckoutUseCase<C, M, S, E, Mob, Card>>>,
    auth: AuthUser,
    Json(request): Json<MasterclassCheckoutRequest>,
) -> Result<impl IntoResponse, AppError>
where
    C: CourseCatalog + Send + Sync,
    M: MasterclassCatalog + Send + Sync,
    S: StudentRepository + Send + Sync,
    E: EnrollmentRepository + Send + Sync,
    Mob: MobileMoneyGateway + Send + Sync,
    Card: CardGateway + Send + Sync,
{
    let user = checkout_user(auth)?;
    let provider = parse_provider(request.provider.as_deref())?;
    let redirect = usecase
        .create_masterclass_checkout(user, &request.masterclass_id, provider)
        .await?;

    Ok(Json(json!({ "url": redirect.url })))
}
