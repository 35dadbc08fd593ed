use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{
    enrollments::EnrollmentChange,
    enums::{payment_statuses::PaymentStatus, subscription_plans::SubscriptionPlan},
    payments::{PaymentKind, PaymentModel},
};

/// Input of the settlement transaction: the processor already confirmed the session as paid.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlePaidSession {
    pub session_id: String,
    pub provider_payment_id: Option<String>,
    pub now: DateTime<Utc>,
}

/// What settling a locked payment row has to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    AlreadySettled(PaymentStatus),
    GrantEnrollment {
        user_id: Uuid,
        course_id: Uuid,
    },
    GrantSubscription {
        user_id: Uuid,
        plan: SubscriptionPlan,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
}

/// Only a pending payment grants anything; every other status is a no-op.
pub fn decide_settlement(payment: &PaymentModel, now: DateTime<Utc>) -> Settlement {
    if payment.status != PaymentStatus::Pending {
        return Settlement::AlreadySettled(payment.status);
    }

    match payment.kind {
        PaymentKind::Course { course_id } => Settlement::GrantEnrollment {
            user_id: payment.user_id,
            course_id,
        },
        PaymentKind::Subscription { plan, .. } => {
            let (starts_at, ends_at) = plan.period_from(now);
            Settlement::GrantSubscription {
                user_id: payment.user_id,
                plan,
                starts_at,
                ends_at,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entitlement {
    Enrollment {
        enrollment_id: Uuid,
        course_id: Uuid,
        change: EnrollmentChange,
    },
    Subscription {
        subscription_id: Uuid,
        plan: SubscriptionPlan,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Granted {
        payment_id: Uuid,
        entitlement: Entitlement,
    },
    AlreadySettled {
        payment_id: Uuid,
        status: PaymentStatus,
    },
    NotPaid {
        session_id: String,
    },
    PaymentNotFound {
        session_id: String,
    },
}

impl ReconcileOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, ReconcileOutcome::Granted { .. })
    }

    pub fn message(&self) -> &'static str {
        match self {
            ReconcileOutcome::Granted {
                entitlement: Entitlement::Enrollment { .. },
                ..
            } => "Payment successful. You are now enrolled in the course.",
            ReconcileOutcome::Granted {
                entitlement: Entitlement::Subscription { .. },
                ..
            } => "Payment successful. Your subscription is now active.",
            ReconcileOutcome::AlreadySettled { .. } => "Payment has already been processed.",
            ReconcileOutcome::NotPaid { .. } => "Payment has not been completed.",
            ReconcileOutcome::PaymentNotFound { .. } => "Payment record not found.",
        }
    }
}

/// Body returned to the success redirect and the webhook.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconcileResponseDto {
    pub granted: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}

impl From<ReconcileOutcome> for ReconcileResponseDto {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self {
            granted: outcome.is_granted(),
            message: outcome.message(),
            outcome,
        }
    }
}

/// Acknowledgement sent back to the webhook sender.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookAckDto {
    pub received: bool,
    pub event_type: String,
    pub outcome: Option<ReconcileOutcome>,
}
