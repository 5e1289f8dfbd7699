use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Fixed table rates. Rates are approximate and only need to hold the
// checkout amount in the right ballpark until the provider settles.
const USD_TO_KES: f64 = 130.0;
const EUR_TO_KES: f64 = 140.0;
const GBP_TO_KES: f64 = 160.0;
const KES_TO_USD: f64 = 0.0077;
const KES_TO_EUR: f64 = 0.0071;
const KES_TO_GBP: f64 = 0.0063;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SupportedCurrency {
    Kes,
    Usd,
    Eur,
    Gbp,
}

impl SupportedCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedCurrency::Kes => "KES",
            SupportedCurrency::Usd => "USD",
            SupportedCurrency::Eur => "EUR",
            SupportedCurrency::Gbp => "GBP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "KES" => Some(SupportedCurrency::Kes),
            "USD" => Some(SupportedCurrency::Usd),
            "EUR" => Some(SupportedCurrency::Eur),
            "GBP" => Some(SupportedCurrency::Gbp),
            _ => None,
        }
    }
}

impl Display for SupportedCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("unsupported currency code: {0}")]
    Unsupported(String),
}

/// Converts between supported currencies by pivoting through KES.
/// KES amounts are rounded to whole units, everything else to cents.
pub fn convert(
    amount: f64,
    from: SupportedCurrency,
    to: SupportedCurrency,
) -> f64 {
    if from == to {
        return amount;
    }

    let amount_in_kes = match from {
        SupportedCurrency::Kes => amount,
        SupportedCurrency::Usd => amount * USD_TO_KES,
        SupportedCurrency::Eur => amount * EUR_TO_KES,
        SupportedCurrency::Gbp => amount * GBP_TO_KES,
    };

    match to {
        SupportedCurrency::Kes => amount_in_kes.round(),
        SupportedCurrency::Usd => (amount_in_kes * KES_TO_USD * 100.0).round() / 100.0,
        SupportedCurrency::Eur => (amount_in_kes * KES_TO_EUR * 100.0).round() / 100.0,
        SupportedCurrency::Gbp => (amount_in_kes * KES_TO_GBP * 100.0).round() / 100.0,
    }
}

/// Mobile-money charges settle in KES; unknown source codes fall back to USD
/// so a stray catalog currency still produces a chargeable amount.
pub fn convert_code_to_kes(amount: f64, from_code: &str) -> Result<f64, CurrencyError> {
    match SupportedCurrency::from_code(from_code) {
        Some(from) => Ok(convert(amount, from, SupportedCurrency::Kes)),
        None => Err(CurrencyError::Unsupported(from_code.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_currency_is_identity() {
        assert_eq!(convert(250.0, SupportedCurrency::Kes, SupportedCurrency::Kes), 250.0);
    }

    #[test]
    fn usd_to_kes_uses_table_rate() {
        assert_eq!(convert(50.0, SupportedCurrency::Usd, SupportedCurrency::Kes), 6500.0);
    }

    #[test]
    fn kes_targets_round_to_whole_units() {
        let converted = convert(10.4, SupportedCurrency::Usd, SupportedCurrency::Kes);
        assert_eq!(converted, 1352.0);
    }

    #[test]
    fn non_kes_targets_round_to_cents() {
        let converted = convert(1000.0, SupportedCurrency::Kes, SupportedCurrency::Usd);
        assert_eq!(converted, 7.7);
    }

    #[test]
    fn code_conversion_rejects_unknown_codes() {
        assert_eq!(
            convert_code_to_kes(10.0, "JPY").unwrap_err(),
            CurrencyError::Unsupported("JPY".to_string())
        );
    }

    #[test]
    fn code_conversion_is_case_insensitive() {
        assert_eq!(convert_code_to_kes(50.0, "usd").unwrap(), 6500.0);
    }
}
