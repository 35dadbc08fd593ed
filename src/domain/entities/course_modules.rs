use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::course_modules;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = course_modules)]
pub struct CourseModuleEntity {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub is_active: bool,
}
