pub mod course_modules;
pub mod courses;
pub mod enrollments;
pub mod lesson_progress;
pub mod lessons;
pub mod payments;
pub mod subscriptions;
pub mod users;
