pub mod plans;
pub mod subscriptions;
pub mod payments;
pub mod exchange_rates;
pub mod usage;
pub mod admin;
