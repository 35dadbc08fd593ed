use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::enrollments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = enrollments)]
pub struct EnrollmentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percentage: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = enrollments)]
pub struct InsertEnrollmentEntity {
    pub user_id: Uuid,
    pub course_id: Uuid,
}
