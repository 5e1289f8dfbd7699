use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::masterclass_statuses::MasterclassStatus;

/// A live-session product sourced from the external calendar catalog.
/// The calendar is read-only; everything here is derived from one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Masterclass {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub instructor: Option<String>,
    pub status: MasterclassStatus,
    pub pricing: MasterclassPricing,
}

/// Pricing is text-encoded inside the calendar event description
/// (`Price: KES 2000`, `Price: $50`, `Free`), so it arrives pre-parsed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MasterclassPricing {
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub is_free: bool,
}

impl MasterclassPricing {
    pub fn free() -> Self {
        Self {
            price: Some(0.0),
            currency: None,
            is_free: true,
        }
    }

    pub fn paid(price: f64, currency: impl Into<String>) -> Self {
        Self {
            price: Some(price),
            currency: Some(currency.into()),
            is_free: false,
        }
    }

    /// Treats missing pricing as free: an event with no price marker in its
    /// description was never put behind the paywall.
    pub fn requires_payment(&self) -> bool {
        !self.is_free && self.price.unwrap_or(0.0) > 0.0
    }
}

impl Masterclass {
    pub fn status_at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> MasterclassStatus {
        if now >= start && now <= end {
            MasterclassStatus::Live
        } else if now > end {
            MasterclassStatus::Completed
        } else {
            MasterclassStatus::Upcoming
        }
    }
}
