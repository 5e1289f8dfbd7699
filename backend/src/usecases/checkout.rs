use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use crates::{
    domain::{
        entities::{enrollments::NewEnrollment, students::NewStudent},
        repositories::{
            catalog::{CourseCatalog, MasterclassCatalog},
            enrollments::EnrollmentRepository,
            students::StudentRepository,
        },
        value_objects::{
            checkout_reference::CheckoutReference,
            currency,
            enums::{
                enrollment_statuses::EnrollmentStatus, payment_providers::PaymentProvider,
                product_types::ProductType,
            },
        },
    },
    payments::intasend_client::{ChargeRequest, ChargeResponse, IntaSendClient},
    payments::stripe_client::StripeClient,
};
use thiserror::Error;
use tracing::{error, info, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    async fn create_charge(&self, request: ChargeRequest) -> AnyResult<ChargeResponse>;
}

#[async_trait]
impl MobileMoneyGateway for IntaSendClient {
    async fn create_charge(&self, request: ChargeRequest) -> AnyResult<ChargeResponse> {
        self.create_charge(request).await
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        name: String,
        amount_minor: i64,
        currency: String,
        success_url: String,
        cancel_url: String,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String>;
}

#[async_trait]
impl CardGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        name: String,
        amount_minor: i64,
        currency: String,
        success_url: String,
        cancel_url: String,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String> {
        self.create_checkout_session(
            &name,
            amount_minor,
            &currency,
            &success_url,
            &cancel_url,
            metadata,
        )
        .await
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("course not found")]
    CourseNotFound,
    #[error("masterclass not found")]
    MasterclassNotFound,
    #[error("price is not set on {0}")]
    PriceNotSet(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::CourseNotFound | CheckoutError::MasterclassNotFound => {
                StatusCode::NOT_FOUND
            }
            CheckoutError::PriceNotSet(_) => StatusCode::BAD_REQUEST,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CheckoutError>;

/// The authenticated buyer, as the auth layer hands them over.
#[derive(Debug, Clone)]
pub struct CheckoutUser {
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    pub url: String,
}

/// Produces provider-hosted checkout URLs. This is the producer side of the
/// reconciliation flow: the reference encoded here is what the webhook
/// hands back for correlation.
pub struct CheckoutUseCase<C, M, S, E, Mob, Card>
where
    C: CourseCatalog + Send + Sync + 'static,
    M: MasterclassCatalog + Send + Sync + 'static,
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    Mob: MobileMoneyGateway + Send + Sync + 'static,
    Card: CardGateway + Send + Sync + 'static,
{
    course_catalog: Arc<C>,
    masterclass_catalog: Arc<M>,
    student_repo: Arc<S>,
    enrollment_repo: Arc<E>,
    mobile_money: Arc<Mob>,
    card: Arc<Card>,
    base_url: String,
}

impl<C, M, S, E, Mob, Card> CheckoutUseCase<C, M, S, E, Mob, Card>
where
    C: CourseCatalog + Send + Sync + 'static,
    M: MasterclassCatalog + Send + Sync + 'static,
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    Mob: MobileMoneyGateway + Send + Sync + 'static,
    Card: CardGateway + Send + Sync + 'static,
{
    pub fn new(
        course_catalog: Arc<C>,
        masterclass_catalog: Arc<M>,
        student_repo: Arc<S>,
        enrollment_repo: Arc<E>,
        mobile_money: Arc<Mob>,
        card: Arc<Card>,
        base_url: String,
    ) -> Self {
        Self {
            course_catalog,
            masterclass_catalog,
            student_repo,
            enrollment_repo,
            mobile_money,
            card,
            base_url,
        }
    }

    pub async fn create_course_checkout(
        &self,
        user: CheckoutUser,
        course_id: &str,
    ) -> UseCaseResult<CheckoutRedirect> {
        info!(
            user_id = %user.external_id,
            %course_id,
            "checkout: course checkout requested"
        );

        let course = self
            .course_catalog
            .find_course_by_id(course_id)
            .await
            .map_err(|err| {
                error!(%course_id, error = ?err, "checkout: course lookup failed");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::CourseNotFound)?;

        let student = self.ensure_student(&user).await?;

        let price = course.price.ok_or(CheckoutError::PriceNotSet("course"))?;
        let course_currency = course.currency.clone().unwrap_or_else(|| "KES".to_string());
        let slug = course.slug.clone().unwrap_or_else(|| course.id.clone());

        if price == 0.0 {
            self.enroll_free(
                &student.id,
                ProductType::Course,
                &course.id,
                None,
                PaymentProvider::MobileMoney,
                &course_currency,
            )
            .await?;
            return Ok(CheckoutRedirect {
                url: format!("{}/courses/{}", self.base_url, slug),
            });
        }

        let amount_kes = Self::to_kes(price, &course_currency);
        let reference = CheckoutReference::new(
            ProductType::Course,
            course.id.clone(),
            user.external_id.clone(),
            Utc::now().timestamp_millis(),
        );

        let charge = self
            .mobile_money
            .create_charge(ChargeRequest {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                host: self.base_url.clone(),
                amount: amount_kes,
                currency: "KES".to_string(),
                api_ref: reference.encode(),
                redirect_url: format!("{}/courses/{}", self.base_url, slug),
                comment: format!("Enrollment for {}", course.title),
            })
            .await
            .map_err(|err| {
                error!(
                    %course_id,
                    user_id = %user.external_id,
                    error = ?err,
                    "checkout: mobile money charge creation failed"
                );
                CheckoutError::Internal(err)
            })?;

        info!(
            %course_id,
            user_id = %user.external_id,
            api_ref = %reference,
            "checkout: course checkout session created"
        );

        Ok(CheckoutRedirect { url: charge.url })
    }

    pub async fn create_masterclass_checkout(
        &self,
        user: CheckoutUser,
        masterclass_id: &str,
        provider: PaymentProvider,
    ) -> UseCaseResult<CheckoutRedirect> {
        info!(
            user_id = %user.external_id,
            %masterclass_id,
            %provider,
            "checkout: masterclass checkout requested"
        );

        let masterclass = self
            .masterclass_catalog
            .find_masterclass_by_id(masterclass_id)
            .await
            .map_err(|err| {
                error!(%masterclass_id, error = ?err, "checkout: masterclass lookup failed");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::MasterclassNotFound)?;

        let student = self.ensure_student(&user).await?;
        let page_url = format!("{}/masterclasses/{}", self.base_url, masterclass.id);

        if !masterclass.pricing.requires_payment() {
            self.enroll_free(
                &student.id,
                ProductType::Masterclass,
                &masterclass.id,
                Some(masterclass.title.clone()),
                provider,
                masterclass.pricing.currency.as_deref().unwrap_or("KES"),
            )
            .await?;
            return Ok(CheckoutRedirect { url: page_url });
        }

        let price = masterclass
            .pricing
            .price
            .ok_or(CheckoutError::PriceNotSet("masterclass"))?;
        let pricing_currency = masterclass
            .pricing
            .currency
            .clone()
            .unwrap_or_else(|| "USD".to_string());

        let reference = CheckoutReference::new(
            ProductType::Masterclass,
            masterclass.id.clone(),
            user.external_id.clone(),
            Utc::now().timestamp_millis(),
        );
        let success_url = format!("{page_url}?payment=success");

        let url = match provider {
            PaymentProvider::MobileMoney => {
                let amount_kes = Self::to_kes(price, &pricing_currency);
                self.mobile_money
                    .create_charge(ChargeRequest {
                        first_name: user.first_name.clone(),
                        last_name: user.last_name.clone(),
                        email: user.email.clone(),
                        host: self.base_url.clone(),
                        amount: amount_kes,
                        currency: "KES".to_string(),
                        api_ref: reference.encode(),
                        redirect_url: success_url,
                        comment: format!("Enrollment for {}", masterclass.title),
                    })
                    .await
                    .map_err(|err| {
                        error!(
                            %masterclass_id,
                            user_id = %user.external_id,
                            error = ?err,
                            "checkout: mobile money charge creation failed"
                        );
                        CheckoutError::Internal(err)
                    })?
                    .url
            }
            PaymentProvider::Card => {
                let metadata = HashMap::from([
                    ("type".to_string(), "masterclass".to_string()),
                    ("masterclass_id".to_string(), masterclass.id.clone()),
                    ("masterclass_title".to_string(), masterclass.title.clone()),
                    ("user_id".to_string(), user.external_id.clone()),
                    ("api_ref".to_string(), reference.encode()),
                ]);

                self.card
                    .create_checkout_session(
                        masterclass.title.clone(),
                        (price * 100.0).round() as i64,
                        pricing_currency,
                        success_url,
                        format!("{page_url}?payment=cancelled"),
                        metadata,
                    )
                    .await
                    .map_err(|err| {
                        error!(
                            %masterclass_id,
                            user_id = %user.external_id,
                            error = ?err,
                            "checkout: card checkout session creation failed"
                        );
                        CheckoutError::Internal(err)
                    })?
            }
        };

        info!(
            %masterclass_id,
            user_id = %user.external_id,
            %provider,
            api_ref = %reference,
            "checkout: masterclass checkout session created"
        );

        Ok(CheckoutRedirect { url })
    }

    async fn ensure_student(
        &self,
        user: &CheckoutUser,
    ) -> UseCaseResult<crates::domain::entities::students::Student> {
        self.student_repo
            .create_if_not_exists(NewStudent {
                external_id: user.external_id.clone(),
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                image_url: None,
            })
            .await
            .map_err(|err| {
                error!(
                    user_id = %user.external_id,
                    db_error = ?err,
                    "checkout: student upsert failed"
                );
                CheckoutError::Internal(err)
            })
    }

    /// Free products bypass the providers entirely; the enrollment is
    /// granted on the spot with a synthetic payment id.
    async fn enroll_free(
        &self,
        student_id: &str,
        product_type: ProductType,
        product_id: &str,
        product_title: Option<String>,
        provider: PaymentProvider,
        currency: &str,
    ) -> UseCaseResult<()> {
        let write = self
            .enrollment_repo
            .create_enrollment(NewEnrollment {
                student_id: student_id.to_string(),
                product_type,
                product_id: product_id.to_string(),
                product_title,
                provider,
                // Unique per (student, product) so the conditional create
                // still deduplicates double-submits.
                payment_id: format!("free-{student_id}-{product_id}"),
                amount: 0.0,
                currency: currency.to_string(),
                status: EnrollmentStatus::Active,
            })
            .await
            .map_err(|err| {
                error!(
                    %student_id,
                    %product_id,
                    db_error = ?err,
                    "checkout: free enrollment write failed"
                );
                CheckoutError::Internal(err)
            })?;

        info!(
            %student_id,
            %product_id,
            enrollment_id = %write.id,
            already_existed = write.already_existed,
            "checkout: free product enrolled directly"
        );
        Ok(())
    }

    fn to_kes(price: f64, currency_code: &str) -> f64 {
        match currency::convert_code_to_kes(price, currency_code) {
            Ok(amount) => amount,
            Err(err) => {
                // Unknown catalog currencies are treated as USD so checkout
                // still produces a chargeable amount.
                warn!(%currency_code, error = %err, "checkout: unsupported currency, assuming USD");
                currency::convert(
                    price,
                    currency::SupportedCurrency::Usd,
                    currency::SupportedCurrency::Kes,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::{
        entities::{courses::Course, enrollments::EnrollmentWrite, students::Student},
        repositories::{
            catalog::{MockCourseCatalog, MockMasterclassCatalog},
            enrollments::MockEnrollmentRepository,
            students::MockStudentRepository,
        },
        value_objects::{
            enums::masterclass_statuses::MasterclassStatus,
            masterclasses::{Masterclass, MasterclassPricing},
        },
    };
    use chrono::TimeZone;

    fn user() -> CheckoutUser {
        CheckoutUser {
            external_id: "user_1".to_string(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        }
    }

    fn student() -> Student {
        Student {
            id: "student-1".to_string(),
            external_id: "user_1".to_string(),
            email: Some("jane@example.com".to_string()),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
        }
    }

    fn course(price: Option<f64>, currency: &str) -> Course {
        Course {
            id: "abc123".to_string(),
            title: "Rust from Scratch".to_string(),
            slug: Some("rust-from-scratch".to_string()),
            description: None,
            price,
            currency: Some(currency.to_string()),
            image_url: None,
        }
    }

    fn masterclass(pricing: MasterclassPricing) -> Masterclass {
        Masterclass {
            id: "mc42".to_string(),
            title: "Advanced Rust".to_string(),
            description: None,
            start_time: chrono::Utc.with_ymd_and_hms(2025, 9, 1, 15, 0, 0).unwrap(),
            end_time: chrono::Utc.with_ymd_and_hms(2025, 9, 1, 17, 0, 0).unwrap(),
            location: None,
            meeting_link: None,
            instructor: None,
            status: MasterclassStatus::Upcoming,
            pricing,
        }
    }

    fn student_repo_upserting() -> MockStudentRepository {
        let mut repo = MockStudentRepository::new();
        repo.expect_create_if_not_exists()
            .times(1)
            .returning(|_| Ok(student()));
        repo
    }

    #[allow(clippy::type_complexity)]
    fn usecase(
        course_catalog: MockCourseCatalog,
        masterclass_catalog: MockMasterclassCatalog,
        student_repo: MockStudentRepository,
        enrollment_repo: MockEnrollmentRepository,
        mobile_money: MockMobileMoneyGateway,
        card: MockCardGateway,
    ) -> CheckoutUseCase<
        MockCourseCatalog,
        MockMasterclassCatalog,
        MockStudentRepository,
        MockEnrollmentRepository,
        MockMobileMoneyGateway,
        MockCardGateway,
    > {
        CheckoutUseCase::new(
            Arc::new(course_catalog),
            Arc::new(masterclass_catalog),
            Arc::new(student_repo),
            Arc::new(enrollment_repo),
            Arc::new(mobile_money),
            Arc::new(card),
            "https://academy.example".to_string(),
        )
    }

    #[tokio::test]
    async fn free_course_enrolls_directly_without_any_gateway() {
        let mut courses = MockCourseCatalog::new();
        courses
            .expect_find_course_by_id()
            .times(1)
            .returning(|_| Ok(Some(course(Some(0.0), "KES"))));

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments
            .expect_create_enrollment()
            .withf(|enrollment| {
                enrollment.product_type == ProductType::Course
                    && enrollment.payment_id == "free-student-1-abc123"
                    && enrollment.amount == 0.0
            })
            .times(1)
            .returning(|enrollment| {
                Ok(EnrollmentWrite {
                    id: enrollment.idempotency_key(),
                    already_existed: false,
                })
            });

        let usecase = usecase(
            courses,
            MockMasterclassCatalog::new(),
            student_repo_upserting(),
            enrollments,
            MockMobileMoneyGateway::new(),
            MockCardGateway::new(),
        );

        let redirect = usecase
            .create_course_checkout(user(), "abc123")
            .await
            .unwrap();
        assert_eq!(
            redirect.url,
            "https://academy.example/courses/rust-from-scratch"
        );
    }

    #[tokio::test]
    async fn paid_course_charges_in_kes_with_decodable_reference() {
        let mut courses = MockCourseCatalog::new();
        courses
            .expect_find_course_by_id()
            .times(1)
            .returning(|_| Ok(Some(course(Some(50.0), "USD"))));

        let mut mobile_money = MockMobileMoneyGateway::new();
        mobile_money
            .expect_create_charge()
            .withf(|request| {
                let decoded = CheckoutReference::decode(&request.api_ref)
                    .expect("api_ref must decode");
                request.currency == "KES"
                    && request.amount == 6500.0
                    && decoded.product_type == ProductType::Course
                    && decoded.product_id == "abc123"
                    && decoded.user_id == "user_1"
            })
            .times(1)
            .returning(|request| {
                Ok(ChargeResponse {
                    id: Some("chg_1".to_string()),
                    url: "https://pay.example/checkout/chg_1".to_string(),
                    api_ref: Some(request.api_ref),
                })
            });

        let usecase = usecase(
            courses,
            MockMasterclassCatalog::new(),
            student_repo_upserting(),
            MockEnrollmentRepository::new(),
            mobile_money,
            MockCardGateway::new(),
        );

        let redirect = usecase
            .create_course_checkout(user(), "abc123")
            .await
            .unwrap();
        assert_eq!(redirect.url, "https://pay.example/checkout/chg_1");
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let mut courses = MockCourseCatalog::new();
        courses
            .expect_find_course_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let usecase = usecase(
            courses,
            MockMasterclassCatalog::new(),
            MockStudentRepository::new(),
            MockEnrollmentRepository::new(),
            MockMobileMoneyGateway::new(),
            MockCardGateway::new(),
        );

        let err = usecase
            .create_course_checkout(user(), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::CourseNotFound));
        assert_eq!(err.status_code().as_u16(), 404);
    }

    #[tokio::test]
    async fn course_without_price_is_rejected() {
        let mut courses = MockCourseCatalog::new();
        courses
            .expect_find_course_by_id()
            .times(1)
            .returning(|_| Ok(Some(course(None, "KES"))));

        let usecase = usecase(
            courses,
            MockMasterclassCatalog::new(),
            student_repo_upserting(),
            MockEnrollmentRepository::new(),
            MockMobileMoneyGateway::new(),
            MockCardGateway::new(),
        );

        let err = usecase
            .create_course_checkout(user(), "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PriceNotSet("course")));
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[tokio::test]
    async fn masterclass_card_checkout_round_trips_metadata() {
        let mut catalog = MockMasterclassCatalog::new();
        catalog
            .expect_find_masterclass_by_id()
            .times(1)
            .returning(|_| Ok(Some(masterclass(MasterclassPricing::paid(50.0, "USD")))));

        let mut card = MockCardGateway::new();
        card.expect_create_checkout_session()
            .withf(
                |name, amount_minor, currency, success_url, _cancel_url, metadata| {
                    let api_ref = metadata.get("api_ref").expect("api_ref present");
                    let decoded =
                        CheckoutReference::decode(api_ref).expect("api_ref must decode");
                    name == "Advanced Rust"
                        && *amount_minor == 5000
                        && currency == "USD"
                        && success_url.ends_with("/masterclasses/mc42?payment=success")
                        && metadata.get("type").map(String::as_str) == Some("masterclass")
                        && metadata.get("masterclass_id").map(String::as_str) == Some("mc42")
                        && metadata.get("user_id").map(String::as_str) == Some("user_1")
                        && decoded.product_type == ProductType::Masterclass
                        && decoded.product_id == "mc42"
                },
            )
            .times(1)
            .returning(|_, _, _, _, _, _| Ok("https://card.example/session/cs_1".to_string()));

        let usecase = usecase(
            MockCourseCatalog::new(),
            catalog,
            student_repo_upserting(),
            MockEnrollmentRepository::new(),
            MockMobileMoneyGateway::new(),
            card,
        );

        let redirect = usecase
            .create_masterclass_checkout(user(), "mc42", PaymentProvider::Card)
            .await
            .unwrap();
        assert_eq!(redirect.url, "https://card.example/session/cs_1");
    }

    #[tokio::test]
    async fn unpriced_masterclass_enrolls_directly() {
        let mut catalog = MockMasterclassCatalog::new();
        catalog
            .expect_find_masterclass_by_id()
            .times(1)
            .returning(|_| Ok(Some(masterclass(MasterclassPricing::free()))));

        let mut enrollments = MockEnrollmentRepository::new();
        enrollments
            .expect_create_enrollment()
            .withf(|enrollment| {
                enrollment.product_type == ProductType::Masterclass
                    && enrollment.product_title.as_deref() == Some("Advanced Rust")
                    && enrollment.payment_id.starts_with("free-")
            })
            .times(1)
            .returning(|enrollment| {
                Ok(EnrollmentWrite {
                    id: enrollment.idempotency_key(),
                    already_existed: false,
                })
            });

        let usecase = usecase(
            MockCourseCatalog::new(),
            catalog,
            student_repo_upserting(),
            enrollments,
            MockMobileMoneyGateway::new(),
            MockCardGateway::new(),
        );

        let redirect = usecase
            .create_masterclass_checkout(user(), "mc42", PaymentProvider::MobileMoney)
            .await
            .unwrap();
        assert_eq!(redirect.url, "https://academy.example/masterclasses/mc42");
    }
}
