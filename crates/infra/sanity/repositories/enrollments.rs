use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::{
    domain::{
        entities::enrollments::{EnrollmentWrite, NewEnrollment},
        repositories::enrollments::EnrollmentRepository,
        value_objects::enums::product_types::ProductType,
    },
    infra::sanity::sanity_client::SanityClient,
};

pub struct EnrollmentSanity {
    client: Arc<SanityClient>,
}

impl EnrollmentSanity {
    pub fn new(client: Arc<SanityClient>) -> Self {
        Self { client }
    }
}

const COURSE_ENROLLMENT_EXISTS: &str = r#"*[_type == "enrollment" && student._ref == $studentId && course._ref == $courseId && status == "active"][0]._id"#;

const MASTERCLASS_ENROLLMENT_EXISTS: &str = r#"*[_type == "masterclassEnrollment" && student._ref == $studentId && masterclassId == $masterclassId && status == "active"][0]._id"#;

#[async_trait]
impl EnrollmentRepository for EnrollmentSanity {
    async fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<EnrollmentWrite> {
        // The deterministic document id is the idempotency guard: the store
        // refuses to create a second document under the same id, so a
        // redelivered webhook for the same payment becomes a no-op.
        let doc_id = enrollment.idempotency_key();
        let enrolled_at = Utc::now().to_rfc3339();

        let document = match enrollment.product_type {
            ProductType::Course => json!({
                "_id": doc_id,
                "_type": "enrollment",
                "student": { "_type": "reference", "_ref": enrollment.student_id },
                "course": { "_type": "reference", "_ref": enrollment.product_id },
                "paymentId": enrollment.payment_id,
                "provider": enrollment.provider.as_str(),
                "amount": enrollment.amount,
                "currency": enrollment.currency,
                "status": enrollment.status.as_str(),
                "enrolledAt": enrolled_at,
            }),
            ProductType::Masterclass => json!({
                "_id": doc_id,
                "_type": "masterclassEnrollment",
                "student": { "_type": "reference", "_ref": enrollment.student_id },
                "masterclassId": enrollment.product_id,
                "masterclassTitle": enrollment.product_title,
                "paymentId": enrollment.payment_id,
                "provider": enrollment.provider.as_str(),
                "amount": enrollment.amount,
                "currency": enrollment.currency,
                "status": enrollment.status.as_str(),
                "accessGranted": true,
                "attendanceStatus": "registered",
                "enrolledAt": enrolled_at,
            }),
        };

        let response = self
            .client
            .mutate(vec![json!({ "createIfNotExists": document })], true)
            .await?;

        Ok(EnrollmentWrite {
            already_existed: !response.created(&doc_id),
            id: doc_id,
        })
    }

    async fn is_enrolled(
        &self,
        student_id: &str,
        product_type: ProductType,
        product_id: &str,
    ) -> Result<bool> {
        let result = match product_type {
            ProductType::Course => {
                self.client
                    .query(
                        COURSE_ENROLLMENT_EXISTS,
                        &[("studentId", student_id), ("courseId", product_id)],
                    )
                    .await?
            }
            ProductType::Masterclass => {
                self.client
                    .query(
                        MASTERCLASS_ENROLLMENT_EXISTS,
                        &[("studentId", student_id), ("masterclassId", product_id)],
                    )
                    .await?
            }
        };

        Ok(!result.is_null())
    }
}
