use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub payment_type: String,
    pub course_id: Option<Uuid>,
    pub plan: Option<String>,
    pub subscription_id: Option<Uuid>,
    pub provider_payment_id: Option<String>,
    pub provider_session_id: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub currency: String,
    pub status: String,
    pub payment_type: String,
    pub course_id: Option<Uuid>,
    pub plan: Option<String>,
    pub provider_session_id: String,
}
