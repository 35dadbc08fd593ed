pub mod catalog;
pub mod dashboard;
pub mod enrollments;
pub mod enums;
pub mod lessons;
pub mod payments;
pub mod progress;
pub mod reconciliation;
pub mod subscriptions;
pub mod users;
