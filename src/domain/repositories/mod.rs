pub mod courses;
pub mod enrollments;
pub mod lesson_progress;
pub mod payments;
pub mod subscriptions;
pub mod users;
