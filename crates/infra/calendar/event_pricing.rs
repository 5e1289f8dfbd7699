use regex::Regex;
use std::sync::OnceLock;

use crate::domain::value_objects::masterclasses::MasterclassPricing;

// Price markers the calendar authors put in event descriptions.
fn currency_first() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Price: KES 2000" or "Price: USD 50.00"
    RE.get_or_init(|| Regex::new(r"(?i)price[:\s]*([A-Z]{3})\s*(\d+(?:\.\d{2})?)").unwrap())
}

fn dollar_sign() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Price: $50.00"
    RE.get_or_init(|| Regex::new(r"(?i)price[:\s]*\$(\d+(?:\.\d{2})?)").unwrap())
}

fn ksh_shorthand() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Price: Ksh 2000"
    RE.get_or_init(|| Regex::new(r"(?i)price[:\s]*ksh?\s*(\d+(?:\.\d{2})?)").unwrap())
}

fn free_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)\bfree\b|price[:\s]*0(?:\.0{1,2})?\s*$").unwrap())
}

/// Pulls pricing out of an event description. An event with no price marker
/// at all is treated as free: it was never put behind the paywall.
pub fn extract_pricing(description: Option<&str>) -> MasterclassPricing {
    let Some(description) = description else {
        return MasterclassPricing::default();
    };

    if free_marker().is_match(description) {
        return MasterclassPricing::free();
    }

    // The shilling shorthand must be checked before the generic
    // currency-code pattern, which would otherwise read "Ksh" as a code.
    if let Some(captures) = ksh_shorthand().captures(description) {
        if let Ok(price) = captures[1].parse::<f64>() {
            if price > 0.0 {
                return MasterclassPricing::paid(price, "KES");
            }
            return MasterclassPricing::free();
        }
    }

    if let Some(captures) = currency_first().captures(description) {
        let currency = captures[1].to_uppercase();
        if let Ok(price) = captures[2].parse::<f64>() {
            if price > 0.0 {
                return MasterclassPricing::paid(price, currency);
            }
            return MasterclassPricing::free();
        }
    }

    if let Some(captures) = dollar_sign().captures(description) {
        if let Ok(price) = captures[1].parse::<f64>() {
            if price > 0.0 {
                return MasterclassPricing::paid(price, "USD");
            }
            return MasterclassPricing::free();
        }
    }

    MasterclassPricing::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_currency_first_format() {
        let pricing = extract_pricing(Some("Join us!\nPrice: KES 2000\nBring a laptop."));
        assert_eq!(pricing.price, Some(2000.0));
        assert_eq!(pricing.currency.as_deref(), Some("KES"));
        assert!(pricing.requires_payment());
    }

    #[test]
    fn extracts_dollar_format() {
        let pricing = extract_pricing(Some("Price: $50.00"));
        assert_eq!(pricing.price, Some(50.0));
        assert_eq!(pricing.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn extracts_ksh_shorthand() {
        let pricing = extract_pricing(Some("price: Ksh 1500"));
        assert_eq!(pricing.price, Some(1500.0));
        assert_eq!(pricing.currency.as_deref(), Some("KES"));
    }

    #[test]
    fn free_marker_wins() {
        let pricing = extract_pricing(Some("This session is FREE for members"));
        assert!(pricing.is_free);
        assert!(!pricing.requires_payment());
    }

    #[test]
    fn no_marker_means_unpriced() {
        let pricing = extract_pricing(Some("An evening of live coding."));
        assert_eq!(pricing, MasterclassPricing::default());
        assert!(!pricing.requires_payment());
    }

    #[test]
    fn missing_description_means_unpriced() {
        assert!(!extract_pricing(None).requires_payment());
    }
}
