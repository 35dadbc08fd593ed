use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::enrollments::grant_enrollment,
        schema::{payments, subscriptions},
    },
};
use domain::{
    entities::{
        payments::{InsertPaymentEntity, PaymentEntity},
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::{payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus},
        payments::PaymentModel,
        reconciliation::{
            Entitlement, ReconcileOutcome, SettlePaidSession, Settlement, decide_settlement,
        },
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn complete_payment(
    conn: &mut PgConnection,
    payment_id: Uuid,
    provider_payment_id: Option<String>,
    subscription_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> QueryResult<usize> {
    update(payments::table.find(payment_id))
        .set((
            payments::status.eq(PaymentStatus::Completed.to_string()),
            payments::completed_at.eq(Some(now)),
            payments::provider_payment_id.eq(provider_payment_id),
            payments::subscription_id.eq(subscription_id),
        ))
        .execute(conn)
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create_pending(
        &self,
        insert_payment_entity: InsertPaymentEntity,
    ) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(payments::table)
            .values(&insert_payment_entity)
            .returning(PaymentEntity::as_select())
            .get_result::<PaymentEntity>(&mut conn)?;

        Ok(result)
    }

    async fn settle_paid_session(&self, settle: SettlePaidSession) -> Result<ReconcileOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<ReconcileOutcome, anyhow::Error, _>(|tx| {
            // The row lock makes a concurrent webhook and success redirect settle exactly once.
            let locked = payments::table
                .filter(payments::provider_session_id.eq(&settle.session_id))
                .select(PaymentEntity::as_select())
                .for_update()
                .first::<PaymentEntity>(tx)
                .optional()?;

            let Some(locked) = locked else {
                return Ok(ReconcileOutcome::PaymentNotFound {
                    session_id: settle.session_id.clone(),
                });
            };
            let payment = PaymentModel::try_from(locked)?;

            match decide_settlement(&payment, settle.now) {
                Settlement::AlreadySettled(status) => Ok(ReconcileOutcome::AlreadySettled {
                    payment_id: payment.id,
                    status,
                }),
                Settlement::GrantEnrollment { user_id, course_id } => {
                    let (enrollment, change) = grant_enrollment(tx, user_id, course_id)?;
                    complete_payment(
                        tx,
                        payment.id,
                        settle.provider_payment_id.clone(),
                        None,
                        settle.now,
                    )?;

                    Ok(ReconcileOutcome::Granted {
                        payment_id: payment.id,
                        entitlement: Entitlement::Enrollment {
                            enrollment_id: enrollment.id,
                            course_id,
                            change,
                        },
                    })
                }
                Settlement::GrantSubscription {
                    user_id,
                    plan,
                    starts_at,
                    ends_at,
                } => {
                    let subscription = insert_into(subscriptions::table)
                        .values(&InsertSubscriptionEntity {
                            user_id,
                            plan: plan.to_string(),
                            status: SubscriptionStatus::Active.to_string(),
                            starts_at,
                            ends_at,
                            provider_subscription_id: None,
                        })
                        .returning(SubscriptionEntity::as_select())
                        .get_result::<SubscriptionEntity>(tx)?;
                    complete_payment(
                        tx,
                        payment.id,
                        settle.provider_payment_id.clone(),
                        Some(subscription.id),
                        settle.now,
                    )?;

                    Ok(ReconcileOutcome::Granted {
                        payment_id: payment.id,
                        entitlement: Entitlement::Subscription {
                            subscription_id: subscription.id,
                            plan,
                            starts_at,
                            ends_at,
                        },
                    })
                }
            }
        })?;

        Ok(outcome)
    }
}
