use serde::{Deserialize, Serialize};

use super::enums::{
    payment_outcomes::PaymentOutcome, payment_providers::PaymentProvider,
    product_types::ProductType,
};

/// Canonical, provider-agnostic payment notification. Each provider adapter
/// produces one of these from its own webhook wire shape; nothing downstream
/// of normalization sees provider-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentEvent {
    pub provider: PaymentProvider,
    /// The provider's own unique payment/invoice identifier.
    pub external_payment_id: String,
    pub outcome: PaymentOutcome,
    /// Opaque reference produced at checkout time and echoed back verbatim.
    pub reference: String,
    pub net_amount: f64,
    pub currency: String,
    /// Optional structured side-channel metadata. When present it is richer
    /// than the reference (carries a human-readable title) and takes
    /// precedence over decoding `reference`.
    pub extra: Option<CheckoutExtra>,
    /// Provider-reported failure detail, informational only.
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckoutExtra {
    pub product_type: Option<ProductType>,
    pub product_id: Option<String>,
    pub product_title: Option<String>,
    pub user_id: Option<String>,
}

impl CheckoutExtra {
    /// The (product, user) triple, but only when every part is present and
    /// non-empty. Partial metadata is treated as absent so the engine falls
    /// back to decoding the reference instead of mixing sources.
    pub fn resolved_identifiers(&self) -> Option<(ProductType, &str, &str)> {
        let product_type = self.product_type?;
        let product_id = self.product_id.as_deref().filter(|id| !id.is_empty())?;
        let user_id = self.user_id.as_deref().filter(|id| !id.is_empty())?;
        Some((product_type, product_id, user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_complete_extra() {
        let extra = CheckoutExtra {
            product_type: Some(ProductType::Masterclass),
            product_id: Some("mc42".to_string()),
            product_title: Some("Advanced Rust".to_string()),
            user_id: Some("user_1".to_string()),
        };

        let (product_type, product_id, user_id) =
            extra.resolved_identifiers().expect("complete extra resolves");
        assert_eq!(product_type, ProductType::Masterclass);
        assert_eq!(product_id, "mc42");
        assert_eq!(user_id, "user_1");
    }

    #[test]
    fn partial_extra_does_not_resolve() {
        let extra = CheckoutExtra {
            product_type: Some(ProductType::Course),
            product_id: Some("abc".to_string()),
            product_title: None,
            user_id: None,
        };
        assert!(extra.resolved_identifiers().is_none());
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let extra = CheckoutExtra {
            product_type: Some(ProductType::Course),
            product_id: Some(String::new()),
            product_title: None,
            user_id: Some("user_1".to_string()),
        };
        assert!(extra.resolved_identifiers().is_none());
    }
}
