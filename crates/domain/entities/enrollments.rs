use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::{
    enrollment_statuses::EnrollmentStatus, payment_providers::PaymentProvider,
    product_types::ProductType,
};

/// The access grant the reconciliation flow exists to produce exactly once
/// per successful payment. Owned by the external document store; the core
/// only reads and writes it through the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentRecord {
    pub id: String,
    pub student_id: String,
    pub product_type: ProductType,
    pub product_id: String,
    pub product_title: Option<String>,
    pub payment_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEnrollment {
    pub student_id: String,
    pub product_type: ProductType,
    pub product_id: String,
    pub product_title: Option<String>,
    pub provider: PaymentProvider,
    pub payment_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: EnrollmentStatus,
}

/// Result of the conditional create. `already_existed` distinguishes a
/// fresh grant from a redelivered webhook hitting the same payment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentWrite {
    pub id: String,
    pub already_existed: bool,
}

impl NewEnrollment {
    /// Deterministic document id derived from the payment identity. Feeding
    /// this to the store's create-if-not-exists operation is what keeps a
    /// redelivered webhook from minting a second ACTIVE record.
    pub fn idempotency_key(&self) -> String {
        let tag = match self.product_type {
            ProductType::Course => "enrollment",
            ProductType::Masterclass => "masterclassEnrollment",
        };
        format!("{}-{}-{}", tag, self.provider.as_str(), sanitize_key(&self.payment_id))
    }
}

// Document ids in the store are limited to alphanumerics, dots, dashes and
// underscores; provider payment ids occasionally carry other punctuation.
fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
