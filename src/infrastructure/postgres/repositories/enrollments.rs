use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    PgConnection, RunQueryDsl,
    helper_types::{Find, ForNoKeyUpdate, Select},
    insert_into,
    prelude::*,
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{courses, enrollments, users},
    },
};
use domain::{
    entities::{
        courses::CourseEntity,
        enrollments::{EnrollmentEntity, InsertEnrollmentEntity},
    },
    repositories::enrollments::EnrollmentRepository,
    value_objects::enrollments::{EnrollmentAction, EnrollmentChange, enrollment_action},
};

pub struct EnrollmentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EnrollmentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Row lock on the user taken before any enrollment lookup. It also covers the case where
/// no enrollment row exists yet, which `FOR UPDATE` on enrollments cannot lock.
fn user_grant_lock(user_id: Uuid) -> ForNoKeyUpdate<Select<Find<users::table, Uuid>, users::id>> {
    users::table
        .find(user_id)
        .select(users::id)
        .for_no_key_update()
}

/// Creates or reactivates the (user, course) enrollment. Must run inside a transaction:
/// grants for the same user serialize on the user row.
pub(crate) fn grant_enrollment(
    conn: &mut PgConnection,
    user_id: Uuid,
    course_id: Uuid,
) -> QueryResult<(EnrollmentEntity, EnrollmentChange)> {
    user_grant_lock(user_id).first::<Uuid>(conn)?;

    let latest = enrollments::table
        .filter(enrollments::user_id.eq(user_id))
        .filter(enrollments::course_id.eq(course_id))
        .order((enrollments::is_active.desc(), enrollments::enrolled_at.desc()))
        .select(EnrollmentEntity::as_select())
        .for_update()
        .first::<EnrollmentEntity>(conn)
        .optional()?;

    match (enrollment_action(latest.as_ref()), latest) {
        (EnrollmentAction::KeepActive(_), Some(existing)) => {
            Ok((existing, EnrollmentChange::AlreadyActive))
        }
        (EnrollmentAction::Reactivate(enrollment_id), _) => {
            let reactivated = update(enrollments::table.find(enrollment_id))
                .set(enrollments::is_active.eq(true))
                .returning(EnrollmentEntity::as_select())
                .get_result::<EnrollmentEntity>(conn)?;

            Ok((reactivated, EnrollmentChange::Reactivated))
        }
        _ => {
            let created = insert_into(enrollments::table)
                .values(&InsertEnrollmentEntity { user_id, course_id })
                .returning(EnrollmentEntity::as_select())
                .get_result::<EnrollmentEntity>(conn)?;

            Ok((created, EnrollmentChange::Created))
        }
    }
}

#[async_trait]
impl EnrollmentRepository for EnrollmentPostgres {
    async fn find_active(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<EnrollmentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = enrollments::table
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::course_id.eq(course_id))
            .filter(enrollments::is_active.eq(true))
            .select(EnrollmentEntity::as_select())
            .first::<EnrollmentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_latest(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<EnrollmentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = enrollments::table
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::course_id.eq(course_id))
            .order((enrollments::is_active.desc(), enrollments::enrolled_at.desc()))
            .select(EnrollmentEntity::as_select())
            .first::<EnrollmentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn grant(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<(EnrollmentEntity, EnrollmentChange)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            grant_enrollment(tx, user_id, course_id)
        })?;

        Ok(result)
    }

    async fn list_active_course_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = enrollments::table
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::is_active.eq(true))
            .select(enrollments::course_id)
            .load::<Uuid>(&mut conn)?;

        Ok(results)
    }

    async fn list_active_with_courses(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(EnrollmentEntity, CourseEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = enrollments::table
            .inner_join(courses::table.on(courses::id.eq(enrollments::course_id)))
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::is_active.eq(true))
            .order(enrollments::enrolled_at.desc())
            .select((EnrollmentEntity::as_select(), CourseEntity::as_select()))
            .load::<(EnrollmentEntity, CourseEntity)>(&mut conn)?;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::{debug_query, pg::Pg};

    #[test]
    fn grant_lock_targets_the_user_row() {
        let user_id = Uuid::new_v4();
        let sql = debug_query::<Pg, _>(&user_grant_lock(user_id)).to_string();

        assert!(sql.contains(r#"FROM "users""#), "{sql}");
        assert!(sql.contains(r#""users"."id" = $1"#), "{sql}");
        assert!(sql.contains("FOR NO KEY UPDATE"), "{sql}");
    }
}
