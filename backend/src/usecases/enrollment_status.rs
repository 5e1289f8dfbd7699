use std::sync::Arc;

use crates::domain::{
    repositories::{enrollments::EnrollmentRepository, students::StudentRepository},
    value_objects::enums::product_types::ProductType,
};
use tracing::{debug, warn};

/// Read side consumed by the client poller. Every path degrades to
/// "not enrolled" instead of erroring: the polling UI treats any error
/// response as broken, so an unauthenticated caller, an unknown student and
/// a store hiccup all answer `false` with HTTP 200.
pub struct EnrollmentStatusUseCase<S, E>
where
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    student_repo: Arc<S>,
    enrollment_repo: Arc<E>,
}

impl<S, E> EnrollmentStatusUseCase<S, E>
where
    S: StudentRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    pub fn new(student_repo: Arc<S>, enrollment_repo: Arc<E>) -> Self {
        Self {
            student_repo,
            enrollment_repo,
        }
    }

    pub async fn check(
        &self,
        external_user_id: Option<&str>,
        product_type: ProductType,
        product_id: &str,
    ) -> bool {
        let Some(external_user_id) = external_user_id else {
            debug!(%product_id, "enrollment status: anonymous caller, not enrolled");
            return false;
        };

        let student = match self.student_repo.find_by_external_id(external_user_id).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                debug!(
                    user_id = %external_user_id,
                    %product_id,
                    "enrollment status: no student document yet"
                );
                return false;
            }
            Err(err) => {
                warn!(
                    user_id = %external_user_id,
                    %product_id,
                    error = ?err,
                    "enrollment status: student lookup failed, reporting not enrolled"
                );
                return false;
            }
        };

        match self
            .enrollment_repo
            .is_enrolled(&student.id, product_type, product_id)
            .await
        {
            Ok(enrolled) => enrolled,
            Err(err) => {
                warn!(
                    student_id = %student.id,
                    %product_id,
                    error = ?err,
                    "enrollment status: store query failed, reporting not enrolled"
                );
                false
            }
        }
    }
}
