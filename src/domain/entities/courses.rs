use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::courses;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = courses)]
pub struct CourseEntity {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub price_minor: i32,
    pub currency: String,
    pub duration_hours: i32,
    pub thumbnail_url: Option<String>,
    pub trailer_url: Option<String>,
    pub prerequisites: Option<String>,
    pub learning_outcomes: Option<String>,
    pub instructor_name: Option<String>,
    pub is_active: bool,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseEntity {
    pub fn is_free(&self) -> bool {
        self.price_minor == 0
    }
}
