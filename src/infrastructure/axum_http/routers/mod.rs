pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod lessons;
pub mod payments;
