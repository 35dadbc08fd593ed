use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::enums::{
        subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionModel {
    /// Active means status `active` and an end date still in the future. Never stored.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.ends_at > now
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        if self.is_active_at(now) {
            (self.ends_at - now).num_days()
        } else {
            0
        }
    }

    pub fn view_at(self, now: DateTime<Utc>) -> SubscriptionView {
        SubscriptionView {
            is_active: self.is_active_at(now),
            days_remaining: self.days_remaining(now),
            subscription: self,
        }
    }
}

impl From<SubscriptionEntity> for SubscriptionModel {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            plan: entity.plan,
            status: SubscriptionStatus::from_str(&entity.status),
            starts_at: entity.starts_at,
            ends_at: entity.ends_at,
            created_at: entity.created_at,
        }
    }
}

/// A subscription with its derived flags evaluated at read time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: SubscriptionModel,
    pub is_active: bool,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionOverviewDto {
    pub current: Option<SubscriptionView>,
    pub history: Vec<SubscriptionView>,
    pub plans: Vec<PlanDto>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanDto {
    pub plan: SubscriptionPlan,
    pub name: &'static str,
    pub price_minor: i32,
    pub duration_months: i64,
}

impl From<SubscriptionPlan> for PlanDto {
    fn from(plan: SubscriptionPlan) -> Self {
        Self {
            plan,
            name: plan.display_name(),
            price_minor: plan.price_minor(),
            duration_months: plan.duration_months(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(status: SubscriptionStatus, ends_at: DateTime<Utc>) -> SubscriptionModel {
        SubscriptionModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan: "basic".to_string(),
            status,
            starts_at: ends_at - Duration::days(30),
            ends_at,
            created_at: ends_at - Duration::days(30),
        }
    }

    #[test]
    fn active_requires_status_and_future_end() {
        let now = Utc::now();

        assert!(subscription(SubscriptionStatus::Active, now + Duration::days(3)).is_active_at(now));
        assert!(!subscription(SubscriptionStatus::Active, now).is_active_at(now));
        assert!(
            !subscription(SubscriptionStatus::Active, now - Duration::seconds(1)).is_active_at(now)
        );
        assert!(
            !subscription(SubscriptionStatus::Cancelled, now + Duration::days(3)).is_active_at(now)
        );
    }

    #[test]
    fn activity_is_recomputed_for_every_instant() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Active, now + Duration::days(10));

        let view = sub.clone().view_at(now);
        assert!(view.is_active);
        assert_eq!(view.days_remaining, 10);

        let view = sub.view_at(now + Duration::days(11));
        assert!(!view.is_active);
        assert_eq!(view.days_remaining, 0);
    }
}
