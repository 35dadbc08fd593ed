use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::enums::{
        payment_statuses::PaymentStatus, payment_types::PaymentType,
        subscription_plans::SubscriptionPlan,
    },
};

/// What a payment buys. Decoded from the `payment_type`, `course_id`, `plan`
/// and `subscription_id` columns; any other combination is a data error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentKind {
    Course {
        course_id: Uuid,
    },
    Subscription {
        plan: SubscriptionPlan,
        subscription_id: Option<Uuid>,
    },
}

impl PaymentKind {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentKind::Course { .. } => PaymentType::Course,
            PaymentKind::Subscription { .. } => PaymentType::Subscription,
        }
    }

    fn decode(entity: &PaymentEntity) -> Result<Self> {
        let payment_type = PaymentType::from_str(&entity.payment_type)
            .ok_or_else(|| anyhow!("unknown payment type `{}`", entity.payment_type))?;

        match payment_type {
            PaymentType::Course => {
                if entity.plan.is_some() || entity.subscription_id.is_some() {
                    bail!("course payment {} carries subscription fields", entity.id);
                }
                let course_id = entity
                    .course_id
                    .ok_or_else(|| anyhow!("course payment {} has no course", entity.id))?;
                Ok(PaymentKind::Course { course_id })
            }
            PaymentType::Subscription => {
                if entity.course_id.is_some() {
                    bail!("subscription payment {} carries a course", entity.id);
                }
                let plan = entity
                    .plan
                    .as_deref()
                    .ok_or_else(|| anyhow!("subscription payment {} has no plan", entity.id))?;
                let plan = SubscriptionPlan::from_str(plan)
                    .ok_or_else(|| anyhow!("unknown subscription plan `{plan}`"))?;
                Ok(PaymentKind::Subscription {
                    plan,
                    subscription_id: entity.subscription_id,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub currency: String,
    pub status: PaymentStatus,
    pub kind: PaymentKind,
    pub provider_payment_id: Option<String>,
    pub provider_session_id: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentEntity> for PaymentModel {
    type Error = anyhow::Error;

    fn try_from(entity: PaymentEntity) -> Result<Self> {
        let kind = PaymentKind::decode(&entity)?;
        let status = PaymentStatus::from_str(&entity.status)
            .ok_or_else(|| anyhow!("unknown payment status `{}`", entity.status))?;

        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            amount_minor: entity.amount_minor,
            currency: entity.currency,
            status,
            kind,
            provider_payment_id: entity.provider_payment_id,
            provider_session_id: entity.provider_session_id,
            created_at: entity.created_at,
            completed_at: entity.completed_at,
        })
    }
}

/// A payment row written when a checkout session is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPaymentModel {
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub currency: String,
    pub kind: PaymentKind,
    pub provider_session_id: String,
}

impl PendingPaymentModel {
    pub fn to_entity(&self) -> InsertPaymentEntity {
        let (course_id, plan) = match self.kind {
            PaymentKind::Course { course_id } => (Some(course_id), None),
            PaymentKind::Subscription { plan, .. } => (None, Some(plan.as_str().to_string())),
        };

        InsertPaymentEntity {
            user_id: self.user_id,
            amount_minor: self.amount_minor,
            currency: self.currency.clone(),
            status: PaymentStatus::Pending.to_string(),
            payment_type: self.kind.payment_type().to_string(),
            course_id,
            plan,
            provider_session_id: self.provider_session_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutResponseDto {
    pub session_id: String,
    pub checkout_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(payment_type: &str) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_minor: 2_999,
            currency: "usd".to_string(),
            status: "pending".to_string(),
            payment_type: payment_type.to_string(),
            course_id: None,
            plan: None,
            subscription_id: None,
            provider_payment_id: None,
            provider_session_id: "cs_test_1".to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn decodes_course_payment() {
        let course_id = Uuid::new_v4();
        let mut row = entity("course");
        row.course_id = Some(course_id);

        let model = PaymentModel::try_from(row).unwrap();
        assert_eq!(model.kind, PaymentKind::Course { course_id });
        assert_eq!(model.status, PaymentStatus::Pending);
    }

    #[test]
    fn decodes_subscription_payment() {
        let mut row = entity("subscription");
        row.plan = Some("premium".to_string());

        let model = PaymentModel::try_from(row).unwrap();
        assert_eq!(
            model.kind,
            PaymentKind::Subscription {
                plan: SubscriptionPlan::Premium,
                subscription_id: None
            }
        );
    }

    #[test]
    fn rejects_rows_that_do_not_match_their_type() {
        assert!(PaymentModel::try_from(entity("course")).is_err());
        assert!(PaymentModel::try_from(entity("subscription")).is_err());
        assert!(PaymentModel::try_from(entity("donation")).is_err());

        let mut mixed = entity("course");
        mixed.course_id = Some(Uuid::new_v4());
        mixed.plan = Some("basic".to_string());
        assert!(PaymentModel::try_from(mixed).is_err());

        let mut unknown_plan = entity("subscription");
        unknown_plan.plan = Some("gold".to_string());
        assert!(PaymentModel::try_from(unknown_plan).is_err());
    }

    #[test]
    fn pending_payment_maps_kind_onto_columns() {
        let pending = PendingPaymentModel {
            user_id: Uuid::new_v4(),
            amount_minor: 49_999,
            currency: "usd".to_string(),
            kind: PaymentKind::Subscription {
                plan: SubscriptionPlan::Enterprise,
                subscription_id: None,
            },
            provider_session_id: "cs_test_2".to_string(),
        };

        let row = pending.to_entity();
        assert_eq!(row.status, "pending");
        assert_eq!(row.payment_type, "subscription");
        assert_eq!(row.plan.as_deref(), Some("enterprise"));
        assert_eq!(row.course_id, None);
    }
}
