use std::sync::Arc;

use crates::domain::{
    entities::enrollments::NewEnrollment,
    repositories::{
        catalog::MasterclassCatalog, enrollments::EnrollmentRepository, invites::InviteSender,
        students::StudentRepository,
    },
    value_objects::{
        checkout_reference::CheckoutReference,
        enums::{
            enrollment_statuses::EnrollmentStatus, payment_outcomes::PaymentOutcome,
            product_types::ProductType,
        },
        payment_events::PaymentEvent,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("could not resolve product and user from payment event")]
    MissingIdentifiers,
    #[error("student not found for user id {0}")]
    StudentNotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReconciliationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            // Up through identity resolution the fault is the caller's; the
            // provider's redelivery would fail the same way, so 4xx.
            ReconciliationError::MissingIdentifiers
            | ReconciliationError::StudentNotFound(_) => StatusCode::BAD_REQUEST,
            // From the entitlement write on it is ours; 5xx tells the
            // provider to redeliver later.
            ReconciliationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, ReconciliationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Non-success outcome acknowledged without side effects.
    Ignored { outcome: PaymentOutcome },
    /// First delivery for this payment; the access record was created.
    Enrolled { enrollment_id: String },
    /// Redelivered payment; the record already existed and nothing changed.
    AlreadyEnrolled { enrollment_id: String },
}

/// Decides, per canonical payment event, whether and how to grant
/// entitlement. Stateless between calls: webhook deliveries are handled
/// independently and the store's conditional create is what makes
/// at-least-once delivery safe.
pub struct ReconciliationUseCase<S, E, M, I>
where
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    M: MasterclassCatalog + Send + Sync + 'static,
    I: InviteSender + Send + Sync + 'static,
{
    student_repo: Arc<S>,
    enrollment_repo: Arc<E>,
    masterclass_catalog: Arc<M>,
    invite_sender: Arc<I>,
}

impl<S, E, M, I> ReconciliationUseCase<S, E, M, I>
where
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    M: MasterclassCatalog + Send + Sync + 'static,
    I: InviteSender + Send + Sync + 'static,
{
    pub fn new(
        student_repo: Arc<S>,
        enrollment_repo: Arc<E>,
        masterclass_catalog: Arc<M>,
        invite_sender: Arc<I>,
    ) -> Self {
        Self {
            student_repo,
            enrollment_repo,
            masterclass_catalog,
            invite_sender,
        }
    }

    pub async fn handle_event(&self, event: PaymentEvent) -> UseCaseResult<ReconciliationOutcome> {
        info!(
            provider = %event.provider,
            payment_id = %event.external_payment_id,
            outcome = %event.outcome,
            reference = %event.reference,
            "reconciliation: payment event received"
        );

        if event.outcome != PaymentOutcome::Succeeded {
            match event.outcome {
                PaymentOutcome::Failed => warn!(
                    provider = %event.provider,
                    payment_id = %event.external_payment_id,
                    reference = %event.reference,
                    failure_reason = ?event.failure_reason,
                    "reconciliation: failed payment logged, no action taken"
                ),
                _ => info!(
                    provider = %event.provider,
                    payment_id = %event.external_payment_id,
                    outcome = %event.outcome,
                    "reconciliation: intermediate state acknowledged"
                ),
            }
            return Ok(ReconciliationOutcome::Ignored {
                outcome: event.outcome,
            });
        }

        let (product_type, product_id, user_id, title_hint) =
            Self::resolve_identifiers(&event).ok_or_else(|| {
                let err = ReconciliationError::MissingIdentifiers;
                warn!(
                    provider = %event.provider,
                    payment_id = %event.external_payment_id,
                    reference = %event.reference,
                    status = err.status_code().as_u16(),
                    "reconciliation: no usable identifiers in metadata or reference"
                );
                err
            })?;

        let student = self
            .student_repo
            .find_by_external_id(&user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    payment_id = %event.external_payment_id,
                    db_error = ?err,
                    "reconciliation: student lookup failed"
                );
                ReconciliationError::Internal(err)
            })?
            .ok_or_else(|| {
                // Not retried here: the provider's own redelivery is the
                // recovery path if the student document lands late.
                let err = ReconciliationError::StudentNotFound(user_id.clone());
                warn!(
                    %user_id,
                    payment_id = %event.external_payment_id,
                    status = err.status_code().as_u16(),
                    "reconciliation: no student for user id"
                );
                err
            })?;

        let product_title = match product_type {
            ProductType::Masterclass => Some(
                self.masterclass_catalog
                    .event_title(&product_id, title_hint)
                    .await,
            ),
            ProductType::Course => None,
        };

        let new_enrollment = NewEnrollment {
            student_id: student.id.clone(),
            product_type,
            product_id: product_id.clone(),
            product_title,
            provider: event.provider,
            payment_id: event.external_payment_id.clone(),
            amount: event.net_amount,
            currency: event.currency.clone(),
            status: EnrollmentStatus::Active,
        };

        let write = self
            .enrollment_repo
            .create_enrollment(new_enrollment)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %product_id,
                    payment_id = %event.external_payment_id,
                    db_error = ?err,
                    "reconciliation: enrollment write failed"
                );
                ReconciliationError::Internal(err)
            })?;

        if write.already_existed {
            info!(
                %user_id,
                %product_id,
                payment_id = %event.external_payment_id,
                enrollment_id = %write.id,
                "reconciliation: duplicate delivery, enrollment already present"
            );
            return Ok(ReconciliationOutcome::AlreadyEnrolled {
                enrollment_id: write.id,
            });
        }

        info!(
            %user_id,
            %product_id,
            product_type = %product_type,
            payment_id = %event.external_payment_id,
            enrollment_id = %write.id,
            "reconciliation: enrollment created"
        );

        if product_type == ProductType::Masterclass {
            self.send_invite_best_effort(&student, &product_id).await;
        }

        Ok(ReconciliationOutcome::Enrolled {
            enrollment_id: write.id,
        })
    }

    /// Provider-supplied structured metadata wins when complete; otherwise
    /// the opaque reference is decoded. Both paths exist because either
    /// provider may omit the side channel.
    fn resolve_identifiers(
        event: &PaymentEvent,
    ) -> Option<(ProductType, String, String, Option<String>)> {
        if let Some(extra) = &event.extra {
            if let Some((product_type, product_id, user_id)) = extra.resolved_identifiers() {
                return Some((
                    product_type,
                    product_id.to_string(),
                    user_id.to_string(),
                    extra.product_title.clone(),
                ));
            }
        }

        let decoded = CheckoutReference::decode(&event.reference).ok()?;
        Some((decoded.product_type, decoded.product_id, decoded.user_id, None))
    }

    /// The payment and enrollment are final before this runs; an invite
    /// failure is only worth a log line.
    async fn send_invite_best_effort(
        &self,
        student: &crates::domain::entities::students::Student,
        masterclass_id: &str,
    ) {
        let masterclass = match self
            .masterclass_catalog
            .find_masterclass_by_id(masterclass_id)
            .await
        {
            Ok(Some(masterclass)) => masterclass,
            Ok(None) => {
                warn!(
                    %masterclass_id,
                    student_id = %student.id,
                    "reconciliation: masterclass not found for invite, enrollment stands"
                );
                return;
            }
            Err(err) => {
                warn!(
                    %masterclass_id,
                    student_id = %student.id,
                    error = ?err,
                    "reconciliation: masterclass lookup for invite failed, enrollment stands"
                );
                return;
            }
        };

        if let Err(err) = self
            .invite_sender
            .send_masterclass_invite(student, &masterclass)
            .await
        {
            warn!(
                %masterclass_id,
                student_id = %student.id,
                error = ?err,
                "reconciliation: invite delivery failed, enrollment stands"
            );
        }
    }
}
