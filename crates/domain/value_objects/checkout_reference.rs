use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::product_types::ProductType;

/// Prefix every external user id carries (the auth provider's id scheme).
/// Decoding anchors on it, so the remaining segments stay unambiguous even
/// when the product id contains dashes.
const USER_ID_PREFIX: &str = "user_";

/// The four fields round-tripped through a payment provider's single
/// free-text reference field.
///
/// Wire format: `{course|masterclass}-{productId}-{userId}-{epochMillis}`,
/// ASCII alphanumeric/dash/underscore only. The millisecond timestamp makes
/// each checkout attempt's reference globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutReference {
    pub product_type: ProductType,
    pub product_id: String,
    pub user_id: String,
    pub issued_at_millis: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("malformed checkout reference: {0}")]
    Malformed(&'static str),
}

impl CheckoutReference {
    pub fn new(
        product_type: ProductType,
        product_id: impl Into<String>,
        user_id: impl Into<String>,
        issued_at_millis: i64,
    ) -> Self {
        Self {
            product_type,
            product_id: product_id.into(),
            user_id: user_id.into(),
            issued_at_millis,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.product_type.tag(),
            self.product_id,
            self.user_id,
            self.issued_at_millis
        )
    }

    /// Parses a reference back into its four fields. Pure, no I/O.
    ///
    /// The product id may itself contain dashes, so splitting on `-` is
    /// ambiguous. Parsing instead peels the known pieces off both ends:
    /// the product-type tag from the front, then the trailing
    /// `-{user_…}-{millis}` suffix. The user-id segment contains no dashes
    /// after its prefix, which is what makes the suffix anchor reliable.
    pub fn decode(reference: &str) -> Result<Self, ReferenceError> {
        let (tag, rest) = reference
            .split_once('-')
            .ok_or(ReferenceError::Malformed("missing product type tag"))?;
        let product_type = ProductType::from_tag(tag)
            .ok_or(ReferenceError::Malformed("unrecognized product type tag"))?;

        let (head, millis) = rest
            .rsplit_once('-')
            .ok_or(ReferenceError::Malformed("missing timestamp segment"))?;
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReferenceError::Malformed("timestamp is not numeric"));
        }
        let issued_at_millis = millis
            .parse::<i64>()
            .map_err(|_| ReferenceError::Malformed("timestamp out of range"))?;

        let (product_id, user_id) = head
            .rsplit_once('-')
            .ok_or(ReferenceError::Malformed("missing user id segment"))?;
        if !user_id.starts_with(USER_ID_PREFIX) || user_id.len() == USER_ID_PREFIX.len() {
            return Err(ReferenceError::Malformed("user id segment not recognized"));
        }
        if product_id.is_empty() {
            return Err(ReferenceError::Malformed("product id is empty"));
        }

        Ok(Self {
            product_type,
            product_id: product_id.to_string(),
            user_id: user_id.to_string(),
            issued_at_millis,
        })
    }
}

impl Display for CheckoutReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
