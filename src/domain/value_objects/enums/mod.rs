pub mod payment_statuses;
pub mod payment_types;
pub mod subscription_plans;
pub mod subscription_statuses;
