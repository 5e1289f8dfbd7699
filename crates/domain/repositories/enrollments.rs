use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::enrollments::{EnrollmentWrite, NewEnrollment},
    value_objects::enums::product_types::ProductType,
};

#[automock]
#[async_trait]
pub trait EnrollmentRepository {
    /// Conditionally creates the access record.
    ///
    /// Webhook delivery is at-least-once, so this MUST be safe to call twice
    /// for the same payment: the write is keyed on the enrollment's
    /// idempotency key and a duplicate call reports `already_existed = true`
    /// instead of producing a second ACTIVE record for the same
    /// (student, product) pair.
    async fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<EnrollmentWrite>;

    /// Side-effect-free read used by the status endpoint and the poller.
    async fn is_enrolled(
        &self,
        student_id: &str,
        product_type: ProductType,
        product_id: &str,
    ) -> Result<bool>;
}
