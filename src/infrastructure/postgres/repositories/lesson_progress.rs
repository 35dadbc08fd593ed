use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::courses::count_active_lessons,
        schema::{course_modules, courses, enrollments, lesson_progress, lessons},
    },
};
use domain::{
    entities::{enrollments::EnrollmentEntity, lesson_progress::LessonProgressEntity},
    repositories::lesson_progress::LessonProgressRepository,
    value_objects::progress::{
        LessonProgressState, ProgressSnapshot, RecentLessonActivity, RecordLessonProgressCommand,
        course_completed_at, course_progress_percentage,
    },
};

pub struct LessonProgressPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl LessonProgressPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn count_completed_lessons(
    conn: &mut PgConnection,
    enrollment_id: Uuid,
    course_id: Uuid,
) -> QueryResult<i64> {
    lesson_progress::table
        .inner_join(lessons::table.on(lessons::id.eq(lesson_progress::lesson_id)))
        .inner_join(course_modules::table.on(course_modules::id.eq(lessons::module_id)))
        .filter(lesson_progress::enrollment_id.eq(enrollment_id))
        .filter(lesson_progress::is_completed.eq(true))
        .filter(course_modules::course_id.eq(course_id))
        .filter(course_modules::is_active.eq(true))
        .filter(lessons::is_active.eq(true))
        .select(count_star())
        .first::<i64>(conn)
}

#[async_trait]
impl LessonProgressRepository for LessonProgressPostgres {
    async fn record(&self, command: RecordLessonProgressCommand) -> Result<ProgressSnapshot> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let snapshot = conn.transaction::<ProgressSnapshot, diesel::result::Error, _>(|tx| {
            // Serializes concurrent reports for the same enrollment.
            let enrollment = enrollments::table
                .find(command.enrollment_id)
                .select(EnrollmentEntity::as_select())
                .for_update()
                .first::<EnrollmentEntity>(tx)?;

            let existing = lesson_progress::table
                .filter(lesson_progress::enrollment_id.eq(command.enrollment_id))
                .filter(lesson_progress::lesson_id.eq(command.lesson_id))
                .select(LessonProgressEntity::as_select())
                .first::<LessonProgressEntity>(tx)
                .optional()?;

            let state = existing
                .as_ref()
                .map(LessonProgressState::from)
                .unwrap_or_else(LessonProgressState::fresh)
                .advance(command.watch_time_sec, command.completed, command.now);

            match existing {
                Some(row) => {
                    update(lesson_progress::table.find(row.id))
                        .set(&state.to_update_entity(command.now))
                        .execute(tx)?;
                }
                None => {
                    insert_into(lesson_progress::table)
                        .values(&state.to_insert_entity(
                            command.enrollment_id,
                            command.lesson_id,
                            command.now,
                        ))
                        .execute(tx)?;
                }
            }

            let total = count_active_lessons(tx, command.course_id)?;
            let completed = count_completed_lessons(tx, command.enrollment_id, command.course_id)?;
            let progress_percentage = course_progress_percentage(completed, total);
            let completed_at =
                course_completed_at(progress_percentage, enrollment.completed_at, command.now);

            update(enrollments::table.find(enrollment.id))
                .set((
                    enrollments::progress_percentage.eq(progress_percentage),
                    enrollments::completed_at.eq(completed_at),
                ))
                .execute(tx)?;

            Ok(ProgressSnapshot {
                enrollment_id: enrollment.id,
                lesson_id: command.lesson_id,
                watch_time_sec: state.watch_time_sec,
                lesson_completed: state.is_completed,
                progress_percentage,
                course_completed_at: completed_at,
            })
        })?;

        Ok(snapshot)
    }

    async fn ensure_started(
        &self,
        enrollment_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<LessonProgressEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let fresh = LessonProgressState::fresh().to_insert_entity(enrollment_id, lesson_id, Utc::now());
        insert_into(lesson_progress::table)
            .values(&fresh)
            .on_conflict((lesson_progress::enrollment_id, lesson_progress::lesson_id))
            .do_nothing()
            .execute(&mut conn)?;

        let result = lesson_progress::table
            .filter(lesson_progress::enrollment_id.eq(enrollment_id))
            .filter(lesson_progress::lesson_id.eq(lesson_id))
            .select(LessonProgressEntity::as_select())
            .first::<LessonProgressEntity>(&mut conn)?;

        Ok(result)
    }

    async fn list_by_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<LessonProgressEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = lesson_progress::table
            .filter(lesson_progress::enrollment_id.eq(enrollment_id))
            .select(LessonProgressEntity::as_select())
            .order(lesson_progress::last_watched_at.desc())
            .load::<LessonProgressEntity>(&mut conn)?;

        Ok(results)
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentLessonActivity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = lesson_progress::table
            .inner_join(enrollments::table.on(enrollments::id.eq(lesson_progress::enrollment_id)))
            .inner_join(lessons::table.on(lessons::id.eq(lesson_progress::lesson_id)))
            .inner_join(courses::table.on(courses::id.eq(enrollments::course_id)))
            .filter(enrollments::user_id.eq(user_id))
            .filter(enrollments::is_active.eq(true))
            .order(lesson_progress::last_watched_at.desc())
            .limit(limit)
            .select((
                lessons::id,
                lessons::title,
                courses::id,
                courses::title,
                lesson_progress::watch_time_sec,
                lesson_progress::is_completed,
                lesson_progress::last_watched_at,
            ))
            .load::<(Uuid, String, Uuid, String, i32, bool, DateTime<Utc>)>(&mut conn)?;

        let results = rows
            .into_iter()
            .map(
                |(
                    lesson_id,
                    lesson_title,
                    course_id,
                    course_title,
                    watch_time_sec,
                    is_completed,
                    last_watched_at,
                )| RecentLessonActivity {
                    lesson_id,
                    lesson_title,
                    course_id,
                    course_title,
                    watch_time_sec,
                    is_completed,
                    last_watched_at,
                },
            )
            .collect();

        Ok(results)
    }

    async fn count_completed(&self, enrollment_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let course_id = enrollments::table
            .find(enrollment_id)
            .select(enrollments::course_id)
            .first::<Uuid>(&mut conn)?;
        let completed = count_completed_lessons(&mut conn, enrollment_id, course_id)?;

        Ok(completed)
    }
}
