pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod enrollments;
pub mod progress;
pub mod reconciliation;
