use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::reconciliation::{ReconcileOutcome, SettlePaidSession},
};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn create_pending(&self, insert_payment_entity: InsertPaymentEntity)
    -> Result<PaymentEntity>;
    /// Locks the payment for the session and, if still pending, grants its entitlement
    /// and completes it. All writes share one transaction.
    async fn settle_paid_session(&self, settle: SettlePaidSession) -> Result<ReconcileOutcome>;
}
