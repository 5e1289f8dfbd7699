pub mod enrollment_statuses;
pub mod masterclass_statuses;
pub mod payment_outcomes;
pub mod payment_providers;
pub mod product_types;
